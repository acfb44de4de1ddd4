//! Shared fixtures for group router tests.
//!
//! `FakeGroups` builds one `FakeManager` per shard. Every manager records
//! the calls it receives in a shared journal, so tests can check which shard
//! served an operation and how often.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use helix_core::{GroupId, Ntp, PartitionId, ShardId, TermId};
use helix_groups::protocol::{
    AbortGroupTxReply, AbortGroupTxRequest, BeginGroupTxReply, BeginGroupTxRequest,
    CommitGroupTxReply, CommitGroupTxRequest, DeletableGroupResult, DescribedGroup,
    HeartbeatRequest, HeartbeatResponse, JoinGroupRequest, JoinGroupResponse,
    LeaveGroupRequest, LeaveGroupResponse, ListGroupsResult, ListedGroup, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, PrepareGroupTxReply,
    PrepareGroupTxRequest, SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest,
    TxnOffsetCommitResponse,
};
use helix_groups::{
    CommitStages, ErrorCode, GroupError, GroupManager, GroupResult, GroupRouter,
    GroupRouterConfig, ShardSet, TxErrc,
};
use helix_routing::{CoordinatorLocator, CoordinatorResolver, ShardTable};
use tokio::sync::Notify;

/// Maximum time to wait for a routed operation.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Namespace of the test coordinator topic.
pub const NAMESPACE: &str = "ns";

/// Name of the test coordinator topic.
pub const TOPIC: &str = "grp-topic";

/// Installs a test log subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Coordinator partition `partition` of the test topic.
pub fn ntp(partition: u64) -> Ntp {
    Ntp::new(NAMESPACE, TOPIC, PartitionId::new(partition))
}

// -----------------------------------------------------------------------------
// Fake group managers
// -----------------------------------------------------------------------------

/// One call received by a fake manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Shard of the manager that received the call.
    pub shard: ShardId,
    /// Operation name.
    pub op: &'static str,
    /// Groups named by the call.
    pub groups: Vec<GroupId>,
    /// Coordinator partition the request was bound to.
    pub ntp: Option<Ntp>,
}

/// Behaviour shared by every fake manager of a test.
#[derive(Clone, Default)]
pub struct FakeGroups {
    /// Calls received by every manager, in arrival order.
    pub journal: Arc<Mutex<Vec<Call>>>,
    /// Committed stages wait for a notification on this gate.
    pub commit_gate: Option<Arc<Notify>>,
    /// Dispatched stages fail with this error.
    pub dispatch_error: Option<GroupError>,
    /// Listing error reported per shard.
    pub list_errors: HashMap<ShardId, ErrorCode>,
    /// Groups listed per shard.
    pub listed: HashMap<ShardId, Vec<GroupId>>,
    /// Heartbeats from this member panic.
    pub panic_member: Option<String>,
    /// Offset commits from this member panic before returning their stages.
    pub panic_commit_member: Option<String>,
    /// Heartbeats from this member wait on the gate before answering.
    pub slow_member: Option<(String, Arc<Notify>)>,
    /// Describe calls fail with this error.
    pub describe_error: Option<GroupError>,
}

impl FakeGroups {
    /// Creates a fake with default behaviour.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the manager of one shard.
    pub fn manager(&self, shard: ShardId) -> FakeManager {
        FakeManager {
            shard,
            groups: self.clone(),
        }
    }

    /// Returns every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the calls of one operation.
    pub fn calls_of(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    fn record(&self, call: Call) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Group manager that answers deterministically from its shard number.
pub struct FakeManager {
    shard: ShardId,
    groups: FakeGroups,
}

impl FakeManager {
    fn record(&self, op: &'static str, group_id: &GroupId, ntp: Option<&Ntp>) {
        self.groups.record(Call {
            shard: self.shard,
            op,
            groups: vec![group_id.clone()],
            ntp: ntp.cloned(),
        });
    }

    fn generation(&self) -> i32 {
        i32::try_from(self.shard.get()).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl GroupManager for FakeManager {
    async fn join_group(&self, request: JoinGroupRequest) -> GroupResult<JoinGroupResponse> {
        self.record("join_group", &request.group_id, request.ntp.as_ref());
        Ok(JoinGroupResponse {
            error_code: ErrorCode::None,
            generation_id: self.generation(),
            protocol_name: request.protocols.first().map(|p| p.name.clone()),
            leader: format!("{}-leader", self.shard),
            member_id: format!("{}-{}", request.group_id, self.shard),
            members: Vec::new(),
        })
    }

    async fn sync_group(&self, request: SyncGroupRequest) -> GroupResult<SyncGroupResponse> {
        self.record("sync_group", &request.group_id, request.ntp.as_ref());
        Ok(SyncGroupResponse {
            error_code: ErrorCode::None,
            assignment: Bytes::from(self.shard.to_string()),
        })
    }

    async fn heartbeat(&self, request: HeartbeatRequest) -> GroupResult<HeartbeatResponse> {
        self.record("heartbeat", &request.group_id, request.ntp.as_ref());
        if self.groups.panic_member.as_deref() == Some(request.member_id.as_str()) {
            panic!("heartbeat from {}", request.member_id);
        }
        if let Some((member, gate)) = &self.groups.slow_member {
            if *member == request.member_id {
                gate.notified().await;
            }
        }
        let error_code = if request.generation_id == self.generation() {
            ErrorCode::None
        } else {
            ErrorCode::IllegalGeneration
        };
        Ok(HeartbeatResponse { error_code })
    }

    async fn leave_group(&self, request: LeaveGroupRequest) -> GroupResult<LeaveGroupResponse> {
        self.record("leave_group", &request.group_id, request.ntp.as_ref());
        Ok(LeaveGroupResponse::default())
    }

    fn offset_commit(&self, request: OffsetCommitRequest) -> CommitStages {
        self.record("offset_commit", &request.group_id, request.ntp.as_ref());
        if self.groups.panic_commit_member.as_deref() == Some(request.member_id.as_str()) {
            panic!("offset commit from {}", request.member_id);
        }

        let dispatch_error = self.groups.dispatch_error.clone();
        let gate = self.groups.commit_gate.clone();
        let response = OffsetCommitResponse::from_error(&request, ErrorCode::None);

        CommitStages {
            dispatched: async move { dispatch_error.map_or(Ok(()), Err) }.boxed(),
            committed: async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                Ok(response)
            }
            .boxed(),
        }
    }

    async fn offset_fetch(&self, request: OffsetFetchRequest) -> GroupResult<OffsetFetchResponse> {
        self.record("offset_fetch", &request.group_id, request.ntp.as_ref());
        Ok(OffsetFetchResponse::default())
    }

    async fn txn_offset_commit(
        &self,
        request: TxnOffsetCommitRequest,
    ) -> GroupResult<TxnOffsetCommitResponse> {
        self.record("txn_offset_commit", &request.group_id, request.ntp.as_ref());
        Ok(TxnOffsetCommitResponse::from_error(&request, ErrorCode::None))
    }

    async fn begin_tx(&self, request: BeginGroupTxRequest) -> GroupResult<BeginGroupTxReply> {
        self.record("begin_tx", &request.group_id, request.ntp.as_ref());
        Ok(BeginGroupTxReply {
            etag: TermId::new(self.shard.get() + 100),
            ec: TxErrc::None,
        })
    }

    async fn prepare_tx(&self, request: PrepareGroupTxRequest) -> GroupResult<PrepareGroupTxReply> {
        self.record("prepare_tx", &request.group_id, request.ntp.as_ref());
        let ec = if request.etag == TermId::new(self.shard.get() + 100) {
            TxErrc::None
        } else {
            TxErrc::Fenced
        };
        Ok(PrepareGroupTxReply { ec })
    }

    async fn commit_tx(&self, request: CommitGroupTxRequest) -> GroupResult<CommitGroupTxReply> {
        self.record("commit_tx", &request.group_id, request.ntp.as_ref());
        Ok(CommitGroupTxReply { ec: TxErrc::None })
    }

    async fn abort_tx(&self, request: AbortGroupTxRequest) -> GroupResult<AbortGroupTxReply> {
        self.record("abort_tx", &request.group_id, request.ntp.as_ref());
        Ok(AbortGroupTxReply { ec: TxErrc::None })
    }

    async fn list_groups(&self) -> GroupResult<ListGroupsResult> {
        self.groups.record(Call {
            shard: self.shard,
            op: "list_groups",
            groups: Vec::new(),
            ntp: None,
        });
        let groups = self
            .groups
            .listed
            .get(&self.shard)
            .into_iter()
            .flatten()
            .map(|group_id| ListedGroup {
                group_id: group_id.clone(),
                protocol_type: "consumer".to_string(),
            })
            .collect();
        Ok(ListGroupsResult {
            error_code: self
                .groups
                .list_errors
                .get(&self.shard)
                .copied()
                .unwrap_or_default(),
            groups,
        })
    }

    async fn describe_group(&self, ntp: &Ntp, group_id: &GroupId) -> GroupResult<DescribedGroup> {
        self.record("describe_group", group_id, Some(ntp));
        if let Some(error) = &self.groups.describe_error {
            return Err(error.clone());
        }
        Ok(DescribedGroup {
            error_code: ErrorCode::None,
            group_id: group_id.clone(),
            group_state: "Stable".to_string(),
            protocol_type: "consumer".to_string(),
            protocol_data: "range".to_string(),
            members: Vec::new(),
        })
    }

    async fn delete_groups(
        &self,
        groups: Vec<(Ntp, GroupId)>,
    ) -> GroupResult<Vec<DeletableGroupResult>> {
        self.groups.record(Call {
            shard: self.shard,
            op: "delete_groups",
            groups: groups.iter().map(|(_, g)| g.clone()).collect(),
            ntp: None,
        });
        Ok(groups
            .into_iter()
            .map(|(_, group_id)| DeletableGroupResult {
                group_id,
                error_code: ErrorCode::None,
            })
            .collect())
    }
}

// -----------------------------------------------------------------------------
// Lookup tables
// -----------------------------------------------------------------------------

/// Coordinator locator backed by a fixed map.
#[derive(Debug, Default)]
pub struct StaticLocator {
    groups: HashMap<GroupId, Ntp>,
}

impl CoordinatorLocator for StaticLocator {
    fn ntp_for(&self, group_id: &GroupId) -> Option<Ntp> {
        self.groups.get(group_id).cloned()
    }
}

// -----------------------------------------------------------------------------
// Harness
// -----------------------------------------------------------------------------

/// A router over fake shards.
pub struct Harness {
    /// The fake managers' shared state.
    pub groups: FakeGroups,
    /// The shard table, editable by the test.
    pub table: Arc<ShardTable>,
    /// The router under test.
    pub router: GroupRouter,
}

/// Builds a router with `shard_count` fake shards.
///
/// `placement` lists `(group, partition, shard)`: the group is coordinated
/// by `partition` of the test topic, which is served by `shard`. Groups not
/// listed have no coordinator.
pub fn harness(shard_count: usize, groups: FakeGroups, placement: &[(&str, u64, u64)]) -> Harness {
    harness_with_config(GroupRouterConfig::for_testing(), shard_count, groups, placement)
}

/// Builds a router with an explicit configuration.
pub fn harness_with_config(
    config: GroupRouterConfig,
    shard_count: usize,
    groups: FakeGroups,
    placement: &[(&str, u64, u64)],
) -> Harness {
    init_tracing();

    let mut locator = StaticLocator::default();
    let table = Arc::new(ShardTable::new());
    for &(group, partition, shard) in placement {
        locator.groups.insert(GroupId::from(group), ntp(partition));
        table.update(ntp(partition), ShardId::new(shard)).unwrap();
    }

    let resolver = CoordinatorResolver::new(Arc::new(locator), table.clone());
    let shards = ShardSet::spawn(shard_count, config.shard, |shard| groups.manager(shard));
    let router = GroupRouter::new(resolver, shards, &config).unwrap();

    Harness {
        groups,
        table,
        router,
    }
}

// -----------------------------------------------------------------------------
// Requests
// -----------------------------------------------------------------------------

/// Heartbeat for `group` in `generation`.
pub fn heartbeat(group: &str, member: &str, generation_id: i32) -> HeartbeatRequest {
    HeartbeatRequest {
        group_id: GroupId::from(group),
        generation_id,
        member_id: member.to_string(),
        group_instance_id: None,
        ntp: None,
    }
}

/// Offset commit of partitions `0..partitions` of one topic.
pub fn offset_commit(group: &str, partitions: i32) -> OffsetCommitRequest {
    use helix_groups::protocol::{OffsetCommitPartition, OffsetCommitTopic};

    OffsetCommitRequest {
        group_id: GroupId::from(group),
        generation_id: 1,
        member_id: "m-1".to_string(),
        topics: vec![OffsetCommitTopic {
            name: "orders".to_string(),
            partitions: (0..partitions)
                .map(|partition_index| OffsetCommitPartition {
                    partition_index,
                    committed_offset: 42,
                    metadata: None,
                })
                .collect(),
        }],
        ntp: None,
    }
}
