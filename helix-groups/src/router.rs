//! Group router.
//!
//! Resolves each group operation to the shard coordinating the group and
//! forwards it there. Resolution reads the coordinator mapping and the shard
//! table on every call and is the only source of `NotCoordinator` answers:
//! client-facing requests get the Kafka code, group transactions the
//! internal [`TxErrc`]. Every other outcome is passed through as produced by
//! the owning shard's group manager.
//!
//! # Operations
//!
//! ```text
//! join/sync/heartbeat/leave/     resolve ─► one shard ─► response
//! offset_fetch/txn_offset_commit
//! begin/prepare/commit/abort     resolve ─► one shard ─► reply (TxErrc)
//! offset_commit                  resolve ─► one shard ─► dispatched, committed
//! list_groups                    every shard ─► merge in shard order
//! describe_group                 resolve ─► one shard ─► description
//! delete_groups                  resolve each ─► one call per shard ─► merge
//! ```

use std::collections::BTreeMap;

use futures::future::join_all;
use helix_core::{GroupId, Ntp, ShardId};
use helix_flow::ConcurrencyLimiter;
use helix_routing::{Coordinator, CoordinatorResolver};
use tokio::sync::oneshot;

use crate::config::GroupRouterConfig;
use crate::dispatch::Dispatcher;
use crate::errc::{ErrorCode, TxErrc};
use crate::error::RouteResult;
use crate::protocol::{
    AbortGroupTxReply, AbortGroupTxRequest, BeginGroupTxReply, BeginGroupTxRequest,
    CommitGroupTxReply, CommitGroupTxRequest, DeletableGroupResult, DescribedGroup,
    HeartbeatRequest, HeartbeatResponse, JoinGroupRequest, JoinGroupResponse,
    LeaveGroupRequest, LeaveGroupResponse, ListGroupsResult, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, PrepareGroupTxReply,
    PrepareGroupTxRequest, SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest,
    TxnOffsetCommitResponse,
};
use crate::request::{ClientRequest, TxRequest};
use crate::shard::{ShardCommand, ShardSet};
use crate::stages::OffsetCommitStages;

/// Routes group operations to the shards coordinating the groups.
///
/// Cloning is cheap; clones share the shard set and the admission limit.
#[derive(Debug, Clone)]
pub struct GroupRouter {
    resolver: CoordinatorResolver,
    dispatcher: Dispatcher,
}

impl GroupRouter {
    /// Creates a router over the node's shards.
    ///
    /// # Errors
    ///
    /// Returns an error if the admission configuration is invalid.
    pub fn new(
        resolver: CoordinatorResolver,
        shards: ShardSet,
        config: &GroupRouterConfig,
    ) -> RouteResult<Self> {
        let limiter = ConcurrencyLimiter::new(config.admission)?;
        Ok(Self {
            resolver,
            dispatcher: Dispatcher::new(shards, limiter),
        })
    }

    /// Returns the shard set.
    #[must_use]
    pub const fn shards(&self) -> &ShardSet {
        self.dispatcher.shards()
    }

    /// Returns the group admission limiter.
    #[must_use]
    pub const fn limiter(&self) -> &ConcurrencyLimiter {
        self.dispatcher.limiter()
    }

    /// Resolves the current coordinator of a group.
    #[must_use]
    pub fn coordinator(&self, group_id: &GroupId) -> Option<Coordinator> {
        self.resolver.shard_for(group_id)
    }

    /// Stops accepting group traffic and shuts down every shard.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }

    // -------------------------------------------------------------------------
    // Client-facing operations
    // -------------------------------------------------------------------------

    /// Routes a join.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn join_group(&self, request: JoinGroupRequest) -> RouteResult<JoinGroupResponse> {
        self.route(request).await
    }

    /// Routes a sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn sync_group(&self, request: SyncGroupRequest) -> RouteResult<SyncGroupResponse> {
        self.route(request).await
    }

    /// Routes a heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn heartbeat(&self, request: HeartbeatRequest) -> RouteResult<HeartbeatResponse> {
        self.route(request).await
    }

    /// Routes a leave.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn leave_group(&self, request: LeaveGroupRequest) -> RouteResult<LeaveGroupResponse> {
        self.route(request).await
    }

    /// Routes an offset fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn offset_fetch(
        &self,
        request: OffsetFetchRequest,
    ) -> RouteResult<OffsetFetchResponse> {
        self.route(request).await
    }

    /// Routes a transactional offset commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn txn_offset_commit(
        &self,
        request: TxnOffsetCommitRequest,
    ) -> RouteResult<TxnOffsetCommitResponse> {
        self.route(request).await
    }

    /// Routes an offset commit.
    ///
    /// The commit starts on the owning shard before this returns. If the
    /// group has no coordinator here, both stages are already complete and
    /// every partition carries `NotCoordinator`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn offset_commit(&self, mut request: OffsetCommitRequest) -> OffsetCommitStages {
        let Some(Coordinator { ntp, shard }) = self.resolver.shard_for(&request.group_id) else {
            let response = OffsetCommitResponse::from_error(&request, ErrorCode::NotCoordinator);
            return OffsetCommitStages::ready(response);
        };
        request.ntp = Some(ntp);

        // Created here so the shard can signal the caller before replying.
        let (dispatched_tx, dispatched_rx) = oneshot::channel();
        let dispatcher = self.dispatcher.clone();
        let call = tokio::spawn(async move {
            dispatcher
                .invoke(shard, |reply| ShardCommand::OffsetCommit {
                    request,
                    dispatched: dispatched_tx,
                    reply,
                })
                .await
        });

        OffsetCommitStages::remote(shard, dispatched_rx, call)
    }

    /// Lists the groups of every shard.
    ///
    /// Shards are merged in ascending order: the first shard reporting an
    /// error sets the error code and every listing is kept.
    ///
    /// # Errors
    ///
    /// Returns the first cross-shard failure or manager fault, in shard
    /// order.
    pub async fn list_groups(&self) -> RouteResult<ListGroupsResult> {
        let calls = self.shards().iter().map(|handle| {
            self.dispatcher
                .invoke(handle.shard(), |reply| ShardCommand::ListGroups { reply })
        });

        join_all(calls)
            .await
            .into_iter()
            .try_fold(
                ListGroupsResult::default(),
                |merged, listing| -> RouteResult<ListGroupsResult> { Ok(merged.merge(listing?)) },
            )
    }

    /// Describes a group.
    ///
    /// A group with no coordinator here is described as empty, with
    /// `NotCoordinator` and the requested id.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn describe_group(&self, group_id: GroupId) -> RouteResult<DescribedGroup> {
        let Some(Coordinator { ntp, shard }) = self.resolver.shard_for(&group_id) else {
            return Ok(DescribedGroup::empty(group_id, ErrorCode::NotCoordinator));
        };

        self.dispatcher
            .invoke(shard, |reply| ShardCommand::DescribeGroup {
                ntp,
                group_id,
                reply,
            })
            .await
    }

    /// Deletes groups, returning one result per requested group.
    ///
    /// Groups are batched into one call per owning shard. Results are in no
    /// particular order.
    ///
    /// # Errors
    ///
    /// Returns the first cross-shard failure or manager fault, in shard
    /// order.
    pub async fn delete_groups(
        &self,
        group_ids: Vec<GroupId>,
    ) -> RouteResult<Vec<DeletableGroupResult>> {
        let mut results = Vec::with_capacity(group_ids.len());
        let mut by_shard: BTreeMap<ShardId, Vec<(Ntp, GroupId)>> = BTreeMap::new();

        for group_id in group_ids {
            match self.resolver.shard_for(&group_id) {
                Some(Coordinator { ntp, shard }) => {
                    by_shard.entry(shard).or_default().push((ntp, group_id));
                }
                None => results.push(DeletableGroupResult {
                    group_id,
                    error_code: ErrorCode::NotCoordinator,
                }),
            }
        }

        let calls = by_shard.into_iter().map(|(shard, groups)| {
            self.dispatcher
                .invoke(shard, |reply| ShardCommand::DeleteGroups { groups, reply })
        });

        for deleted in join_all(calls).await {
            results.extend(deleted?);
        }
        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Group transactions
    // -------------------------------------------------------------------------

    /// Routes a group transaction begin.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn begin_tx(&self, request: BeginGroupTxRequest) -> RouteResult<BeginGroupTxReply> {
        self.route_tx(request).await
    }

    /// Routes a group transaction prepare.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn prepare_tx(
        &self,
        request: PrepareGroupTxRequest,
    ) -> RouteResult<PrepareGroupTxReply> {
        self.route_tx(request).await
    }

    /// Routes a group transaction commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn commit_tx(
        &self,
        request: CommitGroupTxRequest,
    ) -> RouteResult<CommitGroupTxReply> {
        self.route_tx(request).await
    }

    /// Routes a group transaction abort.
    ///
    /// # Errors
    ///
    /// Returns an error if the cross-shard call fails or the manager faults.
    pub async fn abort_tx(&self, request: AbortGroupTxRequest) -> RouteResult<AbortGroupTxReply> {
        self.route_tx(request).await
    }

    // -------------------------------------------------------------------------
    // Forwarding
    // -------------------------------------------------------------------------

    async fn route<R: ClientRequest>(&self, mut request: R) -> RouteResult<R::Response> {
        let Some(Coordinator { ntp, shard }) = self.resolver.shard_for(request.group_id()) else {
            return Ok(request.error_response(ErrorCode::NotCoordinator));
        };
        request.bind(ntp);

        self.dispatcher
            .invoke(shard, |reply| request.into_command(reply))
            .await
    }

    async fn route_tx<R: TxRequest>(&self, mut request: R) -> RouteResult<R::Response> {
        let Some(Coordinator { ntp, shard }) = self.resolver.shard_for(request.group_id()) else {
            return Ok(R::error_reply(TxErrc::NotCoordinator));
        };
        request.bind(ntp);
        request.trace_routed();

        self.dispatcher
            .invoke(shard, |reply| request.into_command(reply))
            .await
    }
}
