//! Routing traits of group requests.
//!
//! A routable request names its group, accepts the coordinator partition
//! the router resolved for it, and knows which shard command carries it.
//! Client-facing requests answer resolution failures with a Kafka error
//! code; transaction requests answer them with a [`TxErrc`].

use helix_core::{GroupId, Ntp};
use tracing::trace;

use crate::errc::{ErrorCode, TxErrc};
use crate::protocol::{
    AbortGroupTxReply, AbortGroupTxRequest, BeginGroupTxReply, BeginGroupTxRequest,
    CommitGroupTxReply, CommitGroupTxRequest, HeartbeatRequest, HeartbeatResponse,
    JoinGroupRequest, JoinGroupResponse, LeaveGroupRequest, LeaveGroupResponse,
    OffsetFetchRequest, OffsetFetchResponse, PrepareGroupTxReply, PrepareGroupTxRequest,
    SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest, TxnOffsetCommitResponse,
};
use crate::shard::{Reply, ShardCommand};

/// A request that is routed to the shard coordinating its group.
pub trait GroupRequest: Send + 'static {
    /// Response produced by the group manager.
    type Response: Send + 'static;

    /// Returns the group the request targets.
    fn group_id(&self) -> &GroupId;

    /// Binds the request to its coordinator partition.
    ///
    /// Called once, by the router, before the request leaves the caller.
    fn bind(&mut self, ntp: Ntp);

    /// Wraps the request in the command for its shard.
    fn into_command(self, reply: Reply<Self::Response>) -> ShardCommand;
}

/// A client-facing request.
pub trait ClientRequest: GroupRequest {
    /// Builds the response sent when the request cannot be served.
    fn error_response(&self, error_code: ErrorCode) -> Self::Response;
}

/// A cluster-internal group transaction request.
pub trait TxRequest: GroupRequest {
    /// Builds the reply sent when the request cannot be served.
    fn error_reply(ec: TxErrc) -> Self::Response;

    /// Records the identifying fields of a routed request.
    fn trace_routed(&self);
}

macro_rules! group_request {
    ($request:ty => $response:ty, $variant:ident) => {
        impl GroupRequest for $request {
            type Response = $response;

            fn group_id(&self) -> &GroupId {
                &self.group_id
            }

            fn bind(&mut self, ntp: Ntp) {
                debug_assert!(self.ntp.is_none(), "request bound twice");
                self.ntp = Some(ntp);
            }

            fn into_command(self, reply: Reply<Self::Response>) -> ShardCommand {
                ShardCommand::$variant {
                    request: self,
                    reply,
                }
            }
        }
    };
}

macro_rules! client_request {
    ($request:ty => $response:ty, $variant:ident) => {
        group_request!($request => $response, $variant);

        impl ClientRequest for $request {
            fn error_response(&self, error_code: ErrorCode) -> Self::Response {
                <$response>::from_error(self, error_code)
            }
        }
    };
}

client_request!(JoinGroupRequest => JoinGroupResponse, JoinGroup);
client_request!(SyncGroupRequest => SyncGroupResponse, SyncGroup);
client_request!(HeartbeatRequest => HeartbeatResponse, Heartbeat);
client_request!(LeaveGroupRequest => LeaveGroupResponse, LeaveGroup);
client_request!(OffsetFetchRequest => OffsetFetchResponse, OffsetFetch);
client_request!(TxnOffsetCommitRequest => TxnOffsetCommitResponse, TxnOffsetCommit);

group_request!(BeginGroupTxRequest => BeginGroupTxReply, BeginTx);
group_request!(PrepareGroupTxRequest => PrepareGroupTxReply, PrepareTx);
group_request!(CommitGroupTxRequest => CommitGroupTxReply, CommitTx);
group_request!(AbortGroupTxRequest => AbortGroupTxReply, AbortTx);

impl TxRequest for BeginGroupTxRequest {
    fn error_reply(ec: TxErrc) -> Self::Response {
        BeginGroupTxReply {
            ec,
            ..BeginGroupTxReply::default()
        }
    }

    fn trace_routed(&self) {
        trace!(
            ntp = ?self.ntp,
            pid = %self.pid,
            tx_seq = %self.tx_seq,
            group_id = %self.group_id,
            "routing begin_tx"
        );
    }
}

impl TxRequest for PrepareGroupTxRequest {
    fn error_reply(ec: TxErrc) -> Self::Response {
        PrepareGroupTxReply { ec }
    }

    fn trace_routed(&self) {
        trace!(
            ntp = ?self.ntp,
            pid = %self.pid,
            tx_seq = %self.tx_seq,
            group_id = %self.group_id,
            etag = %self.etag,
            "routing prepare_tx"
        );
    }
}

impl TxRequest for CommitGroupTxRequest {
    fn error_reply(ec: TxErrc) -> Self::Response {
        CommitGroupTxReply { ec }
    }

    fn trace_routed(&self) {
        trace!(
            ntp = ?self.ntp,
            pid = %self.pid,
            tx_seq = %self.tx_seq,
            group_id = %self.group_id,
            "routing commit_tx"
        );
    }
}

impl TxRequest for AbortGroupTxRequest {
    fn error_reply(ec: TxErrc) -> Self::Response {
        AbortGroupTxReply { ec }
    }

    fn trace_routed(&self) {
        trace!(
            ntp = ?self.ntp,
            pid = %self.pid,
            tx_seq = %self.tx_seq,
            group_id = %self.group_id,
            "routing abort_tx"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use helix_core::{PartitionId, ProducerId, TxSequence};
    use tokio::sync::oneshot;

    use super::*;

    fn heartbeat() -> HeartbeatRequest {
        HeartbeatRequest {
            group_id: GroupId::from("g1"),
            generation_id: 3,
            member_id: "m-1".to_string(),
            group_instance_id: None,
            ntp: None,
        }
    }

    #[test]
    fn test_bind_sets_ntp() {
        let ntp = Ntp::new("kafka", "__consumer_offsets", PartitionId::new(3));
        let mut request = heartbeat();
        request.bind(ntp.clone());
        assert_eq!(request.ntp, Some(ntp));
    }

    #[test]
    fn test_into_command_keeps_request() {
        let (reply, _rx) = oneshot::channel();
        match heartbeat().into_command(reply) {
            ShardCommand::Heartbeat { request, .. } => assert_eq!(request, heartbeat()),
            other => panic!("unexpected command {}", other.name()),
        }
    }

    #[test]
    fn test_client_error_response() {
        let response = heartbeat().error_response(ErrorCode::NotCoordinator);
        assert_eq!(response.error_code, ErrorCode::NotCoordinator);
    }

    #[test]
    fn test_tx_error_reply_is_internal() {
        let reply = BeginGroupTxRequest::error_reply(TxErrc::NotCoordinator);
        assert_eq!(reply.ec, TxErrc::NotCoordinator);
        assert_eq!(reply.etag, BeginGroupTxReply::default().etag);

        let request = BeginGroupTxRequest {
            ntp: None,
            group_id: GroupId::from("g1"),
            pid: ProducerId::new(7),
            tx_seq: TxSequence::new(1),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(request.group_id(), &GroupId::from("g1"));
    }
}
