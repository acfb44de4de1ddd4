//! Caller side of a two-stage offset commit.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use helix_core::ShardId;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{GroupResult, RouteResult, RouterError};
use crate::protocol::OffsetCommitResponse;

/// Completion points of an offset commit, as seen by the caller.
///
/// `dispatched` resolves once the owning shard has sequenced the commit and
/// `committed` once the commit result is final. `dispatched` never resolves
/// after `committed`, and a failed `dispatched` is never followed by a
/// successful `committed`.
///
/// Both stages observe work that has already started. Dropping them does
/// not cancel the commit on the owning shard.
pub struct OffsetCommitStages {
    /// Resolves when the commit has been sequenced.
    pub dispatched: BoxFuture<'static, RouteResult<()>>,
    /// Resolves with the final commit result.
    pub committed: BoxFuture<'static, RouteResult<OffsetCommitResponse>>,
}

impl OffsetCommitStages {
    /// Creates stages that are already complete: dispatched succeeded and
    /// committed carries `response`.
    #[must_use]
    pub fn ready(response: OffsetCommitResponse) -> Self {
        Self {
            dispatched: future::ready(Ok(())).boxed(),
            committed: future::ready(Ok(response)).boxed(),
        }
    }

    /// Creates stages observing a commit running on `shard`.
    ///
    /// `dispatched` is the early signal sent back by the shard; `call` is the
    /// task awaiting the shard's final reply. If the signal is dropped unsent,
    /// the dispatched stage reports the call's failure, so both stages agree
    /// when the commit never reached the shard.
    pub(crate) fn remote(
        shard: ShardId,
        dispatched: oneshot::Receiver<GroupResult<()>>,
        call: JoinHandle<RouteResult<OffsetCommitResponse>>,
    ) -> Self {
        let call = call
            .map(move |joined| joined.unwrap_or(Err(RouterError::RemoteAborted { shard })))
            .boxed()
            .shared();

        let outcome = call.clone();
        let dispatched = async move {
            match dispatched.await {
                Ok(sequenced) => sequenced.map_err(RouterError::from),
                Err(_) => Err(outcome
                    .await
                    .err()
                    .unwrap_or(RouterError::RemoteAborted { shard })),
            }
        }
        .boxed();

        Self {
            dispatched,
            committed: call.boxed(),
        }
    }

    /// Waits for both stages, dispatched first.
    ///
    /// # Errors
    ///
    /// Returns the dispatched error if sequencing failed, otherwise the
    /// committed result.
    pub async fn wait(self) -> RouteResult<OffsetCommitResponse> {
        self.dispatched.await?;
        self.committed.await
    }
}

impl std::fmt::Debug for OffsetCommitStages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetCommitStages").finish_non_exhaustive()
    }
}
