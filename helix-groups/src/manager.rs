//! Group manager seam.
//!
//! A group manager owns the durable group state of the partitions served by
//! one shard: membership and rebalance, committed offsets, and group
//! transactions. Exactly one instance exists per shard and it is only ever
//! called from that shard's executor.

use async_trait::async_trait;
use futures::future::BoxFuture;
use helix_core::{GroupId, Ntp};

use crate::error::GroupResult;
use crate::protocol::{
    AbortGroupTxReply, AbortGroupTxRequest, BeginGroupTxReply, BeginGroupTxRequest,
    CommitGroupTxReply, CommitGroupTxRequest, DeletableGroupResult, DescribedGroup,
    HeartbeatRequest, HeartbeatResponse, JoinGroupRequest, JoinGroupResponse,
    LeaveGroupRequest, LeaveGroupResponse, ListGroupsResult, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, PrepareGroupTxReply,
    PrepareGroupTxRequest, SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest,
    TxnOffsetCommitResponse,
};

/// The two completion points of an offset commit on the owning shard.
///
/// `dispatched` resolves once the commit is sequenced, `committed` once its
/// result is durable. `committed` must not resolve before `dispatched`.
pub struct CommitStages {
    /// Resolves when the commit has been sequenced.
    pub dispatched: BoxFuture<'static, GroupResult<()>>,
    /// Resolves with the final commit result.
    pub committed: BoxFuture<'static, GroupResult<OffsetCommitResponse>>,
}

impl std::fmt::Debug for CommitStages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitStages").finish_non_exhaustive()
    }
}

/// Per-shard group state machine.
///
/// Requests arrive with their `ntp` already bound to the coordinator
/// partition. Errors returned here are faults; protocol-level outcomes are
/// reported through the response error codes.
#[async_trait]
pub trait GroupManager: Send + Sync + 'static {
    /// Handles a join.
    async fn join_group(&self, request: JoinGroupRequest) -> GroupResult<JoinGroupResponse>;

    /// Handles a sync.
    async fn sync_group(&self, request: SyncGroupRequest) -> GroupResult<SyncGroupResponse>;

    /// Handles a heartbeat.
    async fn heartbeat(&self, request: HeartbeatRequest) -> GroupResult<HeartbeatResponse>;

    /// Handles a leave.
    async fn leave_group(&self, request: LeaveGroupRequest) -> GroupResult<LeaveGroupResponse>;

    /// Starts an offset commit and returns its two stages.
    ///
    /// Work should start when this is called; the stages only observe it.
    fn offset_commit(&self, request: OffsetCommitRequest) -> CommitStages;

    /// Reads committed offsets.
    async fn offset_fetch(&self, request: OffsetFetchRequest) -> GroupResult<OffsetFetchResponse>;

    /// Commits offsets inside a transaction.
    async fn txn_offset_commit(
        &self,
        request: TxnOffsetCommitRequest,
    ) -> GroupResult<TxnOffsetCommitResponse>;

    /// Begins a group transaction.
    async fn begin_tx(&self, request: BeginGroupTxRequest) -> GroupResult<BeginGroupTxReply>;

    /// Prepares a group transaction.
    async fn prepare_tx(&self, request: PrepareGroupTxRequest) -> GroupResult<PrepareGroupTxReply>;

    /// Commits a group transaction.
    async fn commit_tx(&self, request: CommitGroupTxRequest) -> GroupResult<CommitGroupTxReply>;

    /// Aborts a group transaction.
    async fn abort_tx(&self, request: AbortGroupTxRequest) -> GroupResult<AbortGroupTxReply>;

    /// Lists the groups coordinated by this shard.
    async fn list_groups(&self) -> GroupResult<ListGroupsResult>;

    /// Describes one group.
    async fn describe_group(&self, ntp: &Ntp, group_id: &GroupId) -> GroupResult<DescribedGroup>;

    /// Deletes groups coordinated by this shard, one result per group.
    async fn delete_groups(
        &self,
        groups: Vec<(Ntp, GroupId)>,
    ) -> GroupResult<Vec<DeletableGroupResult>>;
}
