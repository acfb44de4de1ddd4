//! Cross-shard invocation.
//!
//! The dispatcher is the only way group traffic reaches a shard. Each call
//! holds a group admission permit from before the command is queued until
//! the reply arrives, so a burst of group traffic waits for permits instead
//! of flooding the shard queues.

use helix_core::ShardId;
use helix_flow::ConcurrencyLimiter;
use tokio::sync::oneshot;

use crate::error::{RouteResult, RouterError};
use crate::shard::{Reply, ShardCommand, ShardSet};

/// Sends commands to shards under the group admission limit.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    shards: ShardSet,
    limiter: ConcurrencyLimiter,
}

impl Dispatcher {
    /// Creates a dispatcher over a shard set.
    #[must_use]
    pub const fn new(shards: ShardSet, limiter: ConcurrencyLimiter) -> Self {
        Self { shards, limiter }
    }

    /// Returns the shard set.
    #[must_use]
    pub const fn shards(&self) -> &ShardSet {
        &self.shards
    }

    /// Returns the admission limiter.
    #[must_use]
    pub const fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Runs one operation on `shard` and waits for its result.
    ///
    /// `build` wraps the reply channel into the command to send. It is only
    /// called once admission has been granted. Manager faults are passed
    /// through as `RouterError::Manager`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shard is unknown, admission is closed, the
    /// executor is gone, the operation ended without a reply, or the manager
    /// failed it.
    pub async fn invoke<T, F>(&self, shard: ShardId, build: F) -> RouteResult<T>
    where
        F: FnOnce(Reply<T>) -> ShardCommand,
    {
        let handle = self.shards.get(shard).ok_or_else(|| RouterError::UnknownShard {
            shard,
            shard_count: self.shards.shard_count(),
        })?;

        let _permit = self.limiter.acquire().await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        handle.send(build(reply_tx)).await?;

        let result = reply_rx
            .await
            .map_err(|_| RouterError::RemoteAborted { shard })?;
        Ok(result?)
    }

    /// Closes admission and stops every shard.
    ///
    /// Callers waiting for a permit fail with `RouterError::Admission`;
    /// operations already on a shard finish first.
    pub async fn shutdown(&self) {
        self.limiter.close();
        self.shards.shutdown().await;
    }
}
