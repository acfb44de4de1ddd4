//! Group coordination requests and responses.
//!
//! These are the decoded forms handed over by the Kafka transport (client
//! facing) and by the transaction coordinator (cluster internal). Client
//! requests carry an `ntp` slot that the router fills in exactly once, when
//! the request is bound to its coordinator partition.

use std::time::Duration;

use bytes::Bytes;
use helix_core::{GroupId, Ntp, ProducerId, TermId, TxSequence};

use crate::errc::{ErrorCode, TxErrc};

// -----------------------------------------------------------------------------
// Join / sync / heartbeat / leave
// -----------------------------------------------------------------------------

/// A protocol a joining member supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupProtocol {
    /// Protocol name (e.g. `range`).
    pub name: String,
    /// Opaque protocol metadata.
    pub metadata: Bytes,
}

/// Request to join a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupRequest {
    /// The group to join.
    pub group_id: GroupId,
    /// Member ID, empty on first join.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
    /// Protocol type (e.g. `consumer`).
    pub protocol_type: String,
    /// Session timeout.
    pub session_timeout_ms: i32,
    /// Rebalance timeout.
    pub rebalance_timeout_ms: i32,
    /// Supported protocols in preference order.
    pub protocols: Vec<JoinGroupProtocol>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// A member as reported to the group leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupMember {
    /// Member ID.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
    /// Protocol metadata of the member.
    pub metadata: Bytes,
}

/// Response to a join request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinGroupResponse {
    /// Error code.
    pub error_code: ErrorCode,
    /// Generation of the group.
    pub generation_id: i32,
    /// Selected protocol.
    pub protocol_name: Option<String>,
    /// Leader member ID.
    pub leader: String,
    /// Member ID assigned to the caller.
    pub member_id: String,
    /// Members, populated for the leader only.
    pub members: Vec<JoinGroupMember>,
}

impl JoinGroupResponse {
    /// Creates an error response for a request.
    #[must_use]
    pub fn from_error(request: &JoinGroupRequest, error_code: ErrorCode) -> Self {
        Self {
            error_code,
            generation_id: -1,
            member_id: request.member_id.clone(),
            ..Self::default()
        }
    }
}

/// Assignment the leader hands to one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupAssignment {
    /// Member receiving the assignment.
    pub member_id: String,
    /// Opaque assignment.
    pub assignment: Bytes,
}

/// Request to synchronize group state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupRequest {
    /// The group.
    pub group_id: GroupId,
    /// Generation of the group.
    pub generation_id: i32,
    /// Member ID.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
    /// Assignments, sent by the leader only.
    pub assignments: Vec<SyncGroupAssignment>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Response to a sync request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncGroupResponse {
    /// Error code.
    pub error_code: ErrorCode,
    /// The caller's assignment.
    pub assignment: Bytes,
}

impl SyncGroupResponse {
    /// Creates an error response for a request.
    #[must_use]
    pub fn from_error(_request: &SyncGroupRequest, error_code: ErrorCode) -> Self {
        Self {
            error_code,
            assignment: Bytes::new(),
        }
    }
}

/// Member liveness heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    /// The group.
    pub group_id: GroupId,
    /// Generation of the group.
    pub generation_id: i32,
    /// Member ID.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Response to a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartbeatResponse {
    /// Error code.
    pub error_code: ErrorCode,
}

impl HeartbeatResponse {
    /// Creates an error response for a request.
    #[must_use]
    pub const fn from_error(_request: &HeartbeatRequest, error_code: ErrorCode) -> Self {
        Self { error_code }
    }
}

/// Identity of a member leaving a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity {
    /// Member ID.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
}

/// Request to leave a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveGroupRequest {
    /// The group.
    pub group_id: GroupId,
    /// Leaving members (batched leave).
    pub members: Vec<MemberIdentity>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Per-member result of a leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveMemberResponse {
    /// Member ID.
    pub member_id: String,
    /// Error code for this member.
    pub error_code: ErrorCode,
}

/// Response to a leave request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaveGroupResponse {
    /// Top-level error code.
    pub error_code: ErrorCode,
    /// Per-member results.
    pub members: Vec<LeaveMemberResponse>,
}

impl LeaveGroupResponse {
    /// Creates an error response for a request.
    #[must_use]
    pub const fn from_error(_request: &LeaveGroupRequest, error_code: ErrorCode) -> Self {
        Self {
            error_code,
            members: Vec::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// Offsets
// -----------------------------------------------------------------------------

/// Offset to commit for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitPartition {
    /// Partition index.
    pub partition_index: i32,
    /// Offset to commit.
    pub committed_offset: i64,
    /// Optional client metadata.
    pub metadata: Option<String>,
}

/// Offsets to commit for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitTopic {
    /// Topic name.
    pub name: String,
    /// Partitions.
    pub partitions: Vec<OffsetCommitPartition>,
}

/// Request to commit consumed offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    /// The group.
    pub group_id: GroupId,
    /// Generation of the group, -1 for simple consumers.
    pub generation_id: i32,
    /// Member ID.
    pub member_id: String,
    /// Topics and partitions to commit.
    pub topics: Vec<OffsetCommitTopic>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Per-partition commit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionResult {
    /// Partition index.
    pub partition_index: i32,
    /// Error code.
    pub error_code: ErrorCode,
}

/// Per-topic commit result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicResult {
    /// Topic name.
    pub name: String,
    /// Partition results.
    pub partitions: Vec<PartitionResult>,
}

/// Response to an offset commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitResponse {
    /// Per-topic results.
    pub topics: Vec<TopicResult>,
}

impl OffsetCommitResponse {
    /// Creates a response that fails every requested partition with `error_code`.
    #[must_use]
    pub fn from_error(request: &OffsetCommitRequest, error_code: ErrorCode) -> Self {
        let topics = request
            .topics
            .iter()
            .map(|topic| TopicResult {
                name: topic.name.clone(),
                partitions: topic
                    .partitions
                    .iter()
                    .map(|p| PartitionResult {
                        partition_index: p.partition_index,
                        error_code,
                    })
                    .collect(),
            })
            .collect();
        Self { topics }
    }

    /// Returns every partition error code in the response.
    pub fn error_codes(&self) -> impl Iterator<Item = ErrorCode> + '_ {
        self.topics
            .iter()
            .flat_map(|t| t.partitions.iter().map(|p| p.error_code))
    }
}

/// Partitions to fetch offsets for, per topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchTopic {
    /// Topic name.
    pub name: String,
    /// Partition indexes.
    pub partition_indexes: Vec<i32>,
}

/// Request for committed offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchRequest {
    /// The group.
    pub group_id: GroupId,
    /// Topics to fetch, `None` for all committed topics.
    pub topics: Option<Vec<OffsetFetchTopic>>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Committed offset of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchPartition {
    /// Partition index.
    pub partition_index: i32,
    /// Committed offset, -1 if none.
    pub committed_offset: i64,
    /// Client metadata.
    pub metadata: Option<String>,
    /// Error code.
    pub error_code: ErrorCode,
}

/// Committed offsets of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchTopicResponse {
    /// Topic name.
    pub name: String,
    /// Partitions.
    pub partitions: Vec<OffsetFetchPartition>,
}

/// Response to an offset fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchResponse {
    /// Top-level error code.
    pub error_code: ErrorCode,
    /// Per-topic offsets.
    pub topics: Vec<OffsetFetchTopicResponse>,
}

impl OffsetFetchResponse {
    /// Creates an error response; requested partitions report offset -1.
    #[must_use]
    pub fn from_error(request: &OffsetFetchRequest, error_code: ErrorCode) -> Self {
        let topics = request
            .topics
            .iter()
            .flatten()
            .map(|topic| OffsetFetchTopicResponse {
                name: topic.name.clone(),
                partitions: topic
                    .partition_indexes
                    .iter()
                    .map(|&partition_index| OffsetFetchPartition {
                        partition_index,
                        committed_offset: -1,
                        metadata: None,
                        error_code,
                    })
                    .collect(),
            })
            .collect();
        Self { error_code, topics }
    }
}

/// Transactional offsets for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnOffsetCommitTopic {
    /// Topic name.
    pub name: String,
    /// Partitions.
    pub partitions: Vec<OffsetCommitPartition>,
}

/// Request to commit offsets as part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnOffsetCommitRequest {
    /// Transactional ID of the producer.
    pub transactional_id: String,
    /// The group.
    pub group_id: GroupId,
    /// Producer ID.
    pub producer_id: ProducerId,
    /// Producer epoch.
    pub producer_epoch: i16,
    /// Generation of the group.
    pub generation_id: i32,
    /// Member ID.
    pub member_id: String,
    /// Topics and partitions to commit.
    pub topics: Vec<TxnOffsetCommitTopic>,
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
}

/// Response to a transactional offset commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxnOffsetCommitResponse {
    /// Per-topic results.
    pub topics: Vec<TopicResult>,
}

impl TxnOffsetCommitResponse {
    /// Creates a response that fails every requested partition with `error_code`.
    #[must_use]
    pub fn from_error(request: &TxnOffsetCommitRequest, error_code: ErrorCode) -> Self {
        let topics = request
            .topics
            .iter()
            .map(|topic| TopicResult {
                name: topic.name.clone(),
                partitions: topic
                    .partitions
                    .iter()
                    .map(|p| PartitionResult {
                        partition_index: p.partition_index,
                        error_code,
                    })
                    .collect(),
            })
            .collect();
        Self { topics }
    }
}

// -----------------------------------------------------------------------------
// Group transactions (cluster internal)
// -----------------------------------------------------------------------------

/// Starts a transaction on a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginGroupTxRequest {
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
    /// The group.
    pub group_id: GroupId,
    /// Producer ID.
    pub pid: ProducerId,
    /// Transaction sequence.
    pub tx_seq: TxSequence,
    /// Transaction timeout.
    pub timeout: Duration,
}

/// Reply to a begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BeginGroupTxReply {
    /// Epoch tag of the coordinator that accepted the transaction.
    pub etag: TermId,
    /// Error code.
    pub ec: TxErrc,
}

/// Prepares a group transaction for commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareGroupTxRequest {
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
    /// The group.
    pub group_id: GroupId,
    /// Epoch tag returned by begin.
    pub etag: TermId,
    /// Producer ID.
    pub pid: ProducerId,
    /// Transaction sequence.
    pub tx_seq: TxSequence,
    /// Operation timeout.
    pub timeout: Duration,
}

/// Reply to a prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrepareGroupTxReply {
    /// Error code.
    pub ec: TxErrc,
}

/// Commits a group transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGroupTxRequest {
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
    /// Producer ID.
    pub pid: ProducerId,
    /// Transaction sequence.
    pub tx_seq: TxSequence,
    /// The group.
    pub group_id: GroupId,
    /// Operation timeout.
    pub timeout: Duration,
}

/// Reply to a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitGroupTxReply {
    /// Error code.
    pub ec: TxErrc,
}

/// Aborts a group transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortGroupTxRequest {
    /// Coordinator partition, set by the router.
    pub ntp: Option<Ntp>,
    /// The group.
    pub group_id: GroupId,
    /// Producer ID.
    pub pid: ProducerId,
    /// Transaction sequence.
    pub tx_seq: TxSequence,
    /// Operation timeout.
    pub timeout: Duration,
}

/// Reply to an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbortGroupTxReply {
    /// Error code.
    pub ec: TxErrc,
}

// -----------------------------------------------------------------------------
// Admin: list / describe / delete
// -----------------------------------------------------------------------------

/// A group as reported by list-groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedGroup {
    /// The group.
    pub group_id: GroupId,
    /// Protocol type of the group.
    pub protocol_type: String,
}

/// Groups listed by one or more shards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListGroupsResult {
    /// First error reported, or `None`.
    pub error_code: ErrorCode,
    /// Listed groups.
    pub groups: Vec<ListedGroup>,
}

impl ListGroupsResult {
    /// Folds another shard's listing into this one.
    ///
    /// The first error wins; later errors are dropped. Groups are appended
    /// without deduplication.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if self.error_code.is_none() {
            self.error_code = other.error_code;
        }
        self.groups.extend(other.groups);
        self
    }
}

/// A member as reported by describe-group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedGroupMember {
    /// Member ID.
    pub member_id: String,
    /// Static membership instance ID.
    pub group_instance_id: Option<String>,
    /// Client ID.
    pub client_id: String,
    /// Client host.
    pub client_host: String,
    /// Member metadata.
    pub member_metadata: Bytes,
    /// Current assignment.
    pub member_assignment: Bytes,
}

/// Description of a single group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribedGroup {
    /// Error code.
    pub error_code: ErrorCode,
    /// The described group.
    pub group_id: GroupId,
    /// Group state (e.g. `Stable`).
    pub group_state: String,
    /// Protocol type.
    pub protocol_type: String,
    /// Selected protocol.
    pub protocol_data: String,
    /// Members.
    pub members: Vec<DescribedGroupMember>,
}

impl DescribedGroup {
    /// Creates an empty description that only carries the group and an error.
    #[must_use]
    pub fn empty(group_id: GroupId, error_code: ErrorCode) -> Self {
        Self {
            error_code,
            group_id,
            ..Self::default()
        }
    }
}

/// Outcome of deleting one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletableGroupResult {
    /// The group.
    pub group_id: GroupId,
    /// Error code.
    pub error_code: ErrorCode,
}
