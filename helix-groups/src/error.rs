//! Group routing error types.
//!
//! Resolution failures are not errors here: they are answered in-band with
//! `NotCoordinator` codes. These types cover faults raised by a group
//! manager and failures of the cross-shard call itself.

use helix_core::ShardId;
use helix_flow::FlowError;

/// Fault raised by a group manager while executing an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// The manager failed the operation.
    #[error("group manager fault: {message}")]
    Fault {
        /// Error message.
        message: String,
    },

    /// Reading or writing group state failed.
    #[error("group storage error: {message}")]
    Storage {
        /// Error message.
        message: String,
    },

    /// The manager is shutting down.
    #[error("group manager shutting down")]
    ShuttingDown,
}

impl GroupError {
    /// Creates a fault error.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}

/// Result type for group manager operations.
pub type GroupResult<T> = Result<T, GroupError>;

/// Failure of a routed operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// The resolved shard is not part of this node's shard set.
    #[error("{shard} is not one of the {shard_count} local shards")]
    UnknownShard {
        /// The resolved shard.
        shard: ShardId,
        /// Number of local shards.
        shard_count: usize,
    },

    /// The shard executor no longer accepts commands.
    #[error("{shard} is not accepting commands")]
    ShardUnavailable {
        /// The target shard.
        shard: ShardId,
    },

    /// The shard dropped the operation without replying.
    #[error("operation on {shard} ended without a reply")]
    RemoteAborted {
        /// The target shard.
        shard: ShardId,
    },

    /// Group traffic admission failed.
    #[error("admission failed: {0}")]
    Admission(#[from] FlowError),

    /// The group manager failed the operation.
    #[error(transparent)]
    Manager(#[from] GroupError),
}

/// Result type for routed operations.
pub type RouteResult<T> = Result<T, RouterError>;
