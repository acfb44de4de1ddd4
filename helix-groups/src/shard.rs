//! Per-shard group executors.
//!
//! Every shard runs one executor task that owns the shard's group manager.
//! Other shards never touch the manager; they send it a [`ShardCommand`] and
//! wait on the reply channel carried inside the command.
//!
//! # Design
//!
//! ```text
//! GroupRouter ──► ShardHandle(0) ──► ShardExecutor(0) ──► GroupManager(0)
//!             ├─► ShardHandle(1) ──► ShardExecutor(1) ──► GroupManager(1)
//!             └─► ShardHandle(N) ──► ShardExecutor(N) ──► GroupManager(N)
//! ```
//!
//! Operations are polled inside the executor task itself, so a join that is
//! waiting for a rebalance does not hold up heartbeats for other groups on
//! the same shard. An operation that panics loses its reply; the executor
//! and the other operations keep running.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use helix_core::{GroupId, Ntp, ShardId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument};

use crate::error::{GroupResult, RouteResult, RouterError};
use crate::manager::GroupManager;
use crate::protocol::{
    AbortGroupTxReply, AbortGroupTxRequest, BeginGroupTxReply, BeginGroupTxRequest,
    CommitGroupTxReply, CommitGroupTxRequest, DeletableGroupResult, DescribedGroup,
    HeartbeatRequest, HeartbeatResponse, JoinGroupRequest, JoinGroupResponse,
    LeaveGroupRequest, LeaveGroupResponse, ListGroupsResult, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, PrepareGroupTxReply,
    PrepareGroupTxRequest, SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest,
    TxnOffsetCommitResponse,
};

/// Reply channel of a shard command.
pub type Reply<T> = oneshot::Sender<GroupResult<T>>;

/// Commands sent to a shard executor.
#[derive(Debug)]
pub enum ShardCommand {
    /// Join a group.
    JoinGroup {
        /// The bound request.
        request: JoinGroupRequest,
        /// Channel to send the result.
        reply: Reply<JoinGroupResponse>,
    },
    /// Sync a group.
    SyncGroup {
        /// The bound request.
        request: SyncGroupRequest,
        /// Channel to send the result.
        reply: Reply<SyncGroupResponse>,
    },
    /// Member heartbeat.
    Heartbeat {
        /// The bound request.
        request: HeartbeatRequest,
        /// Channel to send the result.
        reply: Reply<HeartbeatResponse>,
    },
    /// Leave a group.
    LeaveGroup {
        /// The bound request.
        request: LeaveGroupRequest,
        /// Channel to send the result.
        reply: Reply<LeaveGroupResponse>,
    },
    /// Commit offsets.
    ///
    /// `dispatched` is completed as soon as the manager has sequenced the
    /// commit, before `reply`.
    OffsetCommit {
        /// The bound request.
        request: OffsetCommitRequest,
        /// Channel signalled when the commit is sequenced.
        dispatched: Reply<()>,
        /// Channel to send the final result.
        reply: Reply<OffsetCommitResponse>,
    },
    /// Fetch committed offsets.
    OffsetFetch {
        /// The bound request.
        request: OffsetFetchRequest,
        /// Channel to send the result.
        reply: Reply<OffsetFetchResponse>,
    },
    /// Commit offsets inside a transaction.
    TxnOffsetCommit {
        /// The bound request.
        request: TxnOffsetCommitRequest,
        /// Channel to send the result.
        reply: Reply<TxnOffsetCommitResponse>,
    },
    /// Begin a group transaction.
    BeginTx {
        /// The bound request.
        request: BeginGroupTxRequest,
        /// Channel to send the result.
        reply: Reply<BeginGroupTxReply>,
    },
    /// Prepare a group transaction.
    PrepareTx {
        /// The bound request.
        request: PrepareGroupTxRequest,
        /// Channel to send the result.
        reply: Reply<PrepareGroupTxReply>,
    },
    /// Commit a group transaction.
    CommitTx {
        /// The bound request.
        request: CommitGroupTxRequest,
        /// Channel to send the result.
        reply: Reply<CommitGroupTxReply>,
    },
    /// Abort a group transaction.
    AbortTx {
        /// The bound request.
        request: AbortGroupTxRequest,
        /// Channel to send the result.
        reply: Reply<AbortGroupTxReply>,
    },
    /// List the groups of this shard.
    ListGroups {
        /// Channel to send the result.
        reply: Reply<ListGroupsResult>,
    },
    /// Describe one group.
    DescribeGroup {
        /// Coordinator partition of the group.
        ntp: Ntp,
        /// The group.
        group_id: GroupId,
        /// Channel to send the result.
        reply: Reply<DescribedGroup>,
    },
    /// Delete groups owned by this shard.
    DeleteGroups {
        /// Groups with their coordinator partitions.
        groups: Vec<(Ntp, GroupId)>,
        /// Channel to send the result.
        reply: Reply<Vec<DeletableGroupResult>>,
    },
    /// Stop accepting commands, finish in-flight operations and exit.
    Shutdown,
}

impl ShardCommand {
    /// Returns the operation name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinGroup { .. } => "join_group",
            Self::SyncGroup { .. } => "sync_group",
            Self::Heartbeat { .. } => "heartbeat",
            Self::LeaveGroup { .. } => "leave_group",
            Self::OffsetCommit { .. } => "offset_commit",
            Self::OffsetFetch { .. } => "offset_fetch",
            Self::TxnOffsetCommit { .. } => "txn_offset_commit",
            Self::BeginTx { .. } => "begin_tx",
            Self::PrepareTx { .. } => "prepare_tx",
            Self::CommitTx { .. } => "commit_tx",
            Self::AbortTx { .. } => "abort_tx",
            Self::ListGroups { .. } => "list_groups",
            Self::DescribeGroup { .. } => "describe_group",
            Self::DeleteGroups { .. } => "delete_groups",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Configuration for a shard executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardConfig {
    /// Command channel capacity. A value of zero is treated as one.
    pub channel_capacity: usize,
}

impl ShardConfig {
    /// Sets the command channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Handle for sending commands to a shard executor.
#[derive(Debug, Clone)]
pub struct ShardHandle {
    shard: ShardId,
    tx: mpsc::Sender<ShardCommand>,
    stopped: watch::Receiver<bool>,
}

impl ShardHandle {
    /// Returns the shard this handle targets.
    #[must_use]
    pub const fn shard(&self) -> ShardId {
        self.shard
    }

    /// Queues a command on the shard.
    ///
    /// Waits while the shard queue is full.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::ShardUnavailable` if the executor no longer
    /// accepts commands. The command, and any reply channel in it, is dropped.
    pub async fn send(&self, command: ShardCommand) -> RouteResult<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RouterError::ShardUnavailable { shard: self.shard })
    }

    /// Returns true once the executor stopped accepting commands.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Asks the executor to stop and waits until in-flight operations have
    /// finished.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ShardCommand::Shutdown).await;
        let mut stopped = self.stopped.clone();
        // An executor that vanished without reporting is stopped as well.
        let _ = stopped.wait_for(|done| *done).await;
    }
}

/// Executor owning one shard's group manager.
struct ShardExecutor<M: GroupManager> {
    /// The shard served by this executor.
    shard: ShardId,
    /// The shard's group manager.
    manager: Arc<M>,
    /// Command receiver.
    cmd_rx: mpsc::Receiver<ShardCommand>,
    /// Operations started but not yet replied to.
    in_flight: FuturesUnordered<BoxFuture<'static, ()>>,
    /// Set once the executor has drained and exited.
    stopped: watch::Sender<bool>,
}

impl<M: GroupManager> ShardExecutor<M> {
    fn new(
        shard: ShardId,
        manager: Arc<M>,
        cmd_rx: mpsc::Receiver<ShardCommand>,
        stopped: watch::Sender<bool>,
    ) -> Self {
        Self {
            shard,
            manager,
            cmd_rx,
            in_flight: FuturesUnordered::new(),
            stopped,
        }
    }

    /// Runs the executor loop.
    #[instrument(skip(self), fields(shard = %self.shard))]
    async fn run(mut self) {
        info!("shard executor started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("all shard handles dropped");
                        break;
                    };
                    let name = cmd.name();
                    let Some(operation) = self.start(cmd) else {
                        debug!("shutdown requested");
                        break;
                    };
                    self.in_flight.push(guard(name, operation));
                }
                Some(()) = self.in_flight.next(), if !self.in_flight.is_empty() => {}
            }
        }

        // Refuse new work, then let started operations finish. Commands still
        // queued are dropped and their callers see the reply channel close.
        self.cmd_rx.close();
        let draining = self.in_flight.len();
        while self.in_flight.next().await.is_some() {}

        let _ = self.stopped.send(true);
        info!(drained = draining, "shard executor stopped");
    }

    /// Starts the operation carried by a command.
    ///
    /// Returns `None` for `Shutdown`.
    fn start(&self, cmd: ShardCommand) -> Option<BoxFuture<'static, ()>> {
        let manager = Arc::clone(&self.manager);
        let operation = match cmd {
            ShardCommand::JoinGroup { request, reply } => async move {
                let _ = reply.send(manager.join_group(request).await);
            }
            .boxed(),
            ShardCommand::SyncGroup { request, reply } => async move {
                let _ = reply.send(manager.sync_group(request).await);
            }
            .boxed(),
            ShardCommand::Heartbeat { request, reply } => async move {
                let _ = reply.send(manager.heartbeat(request).await);
            }
            .boxed(),
            ShardCommand::LeaveGroup { request, reply } => async move {
                let _ = reply.send(manager.leave_group(request).await);
            }
            .boxed(),
            ShardCommand::OffsetCommit {
                request,
                dispatched,
                reply,
            } => async move {
                let stages = manager.offset_commit(request);
                let sequenced = stages.dispatched.await;
                let failure = sequenced.as_ref().err().cloned();
                let _ = dispatched.send(sequenced);

                // The commit is driven to completion either way, but a
                // commit that was never sequenced is not reported as done.
                let committed = stages.committed.await;
                let _ = reply.send(failure.map_or(committed, Err));
            }
            .boxed(),
            ShardCommand::OffsetFetch { request, reply } => async move {
                let _ = reply.send(manager.offset_fetch(request).await);
            }
            .boxed(),
            ShardCommand::TxnOffsetCommit { request, reply } => async move {
                let _ = reply.send(manager.txn_offset_commit(request).await);
            }
            .boxed(),
            ShardCommand::BeginTx { request, reply } => async move {
                let _ = reply.send(manager.begin_tx(request).await);
            }
            .boxed(),
            ShardCommand::PrepareTx { request, reply } => async move {
                let _ = reply.send(manager.prepare_tx(request).await);
            }
            .boxed(),
            ShardCommand::CommitTx { request, reply } => async move {
                let _ = reply.send(manager.commit_tx(request).await);
            }
            .boxed(),
            ShardCommand::AbortTx { request, reply } => async move {
                let _ = reply.send(manager.abort_tx(request).await);
            }
            .boxed(),
            ShardCommand::ListGroups { reply } => async move {
                let _ = reply.send(manager.list_groups().await);
            }
            .boxed(),
            ShardCommand::DescribeGroup {
                ntp,
                group_id,
                reply,
            } => async move {
                let _ = reply.send(manager.describe_group(&ntp, &group_id).await);
            }
            .boxed(),
            ShardCommand::DeleteGroups { groups, reply } => async move {
                let _ = reply.send(manager.delete_groups(groups).await);
            }
            .boxed(),
            ShardCommand::Shutdown => return None,
        };
        Some(operation)
    }
}

/// Contains a panic to the operation that raised it.
fn guard(name: &'static str, operation: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
    AssertUnwindSafe(operation)
        .catch_unwind()
        .map(move |outcome| {
            if outcome.is_err() {
                error!(operation = name, "group operation panicked, reply dropped");
            }
        })
        .boxed()
}

/// Spawns an executor for one shard and returns a handle to it.
///
/// # Arguments
///
/// * `shard` - The shard served by the executor.
/// * `manager` - The shard's group manager.
/// * `config` - Executor configuration.
#[must_use]
pub fn spawn_shard<M: GroupManager>(
    shard: ShardId,
    manager: Arc<M>,
    config: ShardConfig,
) -> ShardHandle {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (stopped_tx, stopped_rx) = watch::channel(false);

    let executor = ShardExecutor::new(shard, manager, rx, stopped_tx);
    tokio::spawn(executor.run());

    ShardHandle {
        shard,
        tx,
        stopped: stopped_rx,
    }
}

/// The ordered set of shards on this node.
///
/// Shard `i` is at position `i`. Cloning is cheap; clones share the handles.
#[derive(Debug, Clone)]
pub struct ShardSet {
    shards: Arc<[ShardHandle]>,
}

impl ShardSet {
    /// Spawns `count` shard executors, building each manager with `factory`.
    #[must_use]
    pub fn spawn<M, F>(count: usize, config: ShardConfig, mut factory: F) -> Self
    where
        M: GroupManager,
        F: FnMut(ShardId) -> M,
    {
        let shards: Vec<ShardHandle> = (0..count as u64)
            .map(ShardId::new)
            .map(|shard| spawn_shard(shard, Arc::new(factory(shard)), config))
            .collect();
        Self {
            shards: shards.into(),
        }
    }

    /// Returns the handle of a shard.
    #[must_use]
    pub fn get(&self, shard: ShardId) -> Option<&ShardHandle> {
        usize::try_from(shard.get())
            .ok()
            .and_then(|index| self.shards.get(index))
    }

    /// Iterates the shards in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &ShardHandle> {
        self.shards.iter()
    }

    /// Returns the number of shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Stops every shard, waiting for each to drain.
    pub async fn shutdown(&self) {
        for handle in self.shards.iter() {
            handle.shutdown().await;
        }
    }
}
