//! Coordinator resolver - routes group IDs to the owning shard.
//!
//! The resolver combines the coordinator locator (group → partition) with
//! the shard locator (partition → shard). Both lookups are local and
//! synchronous. Nothing is cached: every call observes the current tables,
//! so ownership moves take effect on the next request.

use std::sync::Arc;

use helix_core::{GroupId, Ntp, ShardId};
use tracing::debug;

use crate::coordinator::CoordinatorLocator;
use crate::shard_table::ShardLocator;

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinator {
    /// The coordinator partition of the group.
    pub ntp: Ntp,
    /// The shard currently serving that partition.
    pub shard: ShardId,
}

/// Resolves group IDs to their coordinator partition and owning shard.
#[derive(Clone)]
pub struct CoordinatorResolver {
    coordinators: Arc<dyn CoordinatorLocator>,
    shards: Arc<dyn ShardLocator>,
}

impl CoordinatorResolver {
    /// Creates a resolver over the given lookup tables.
    #[must_use]
    pub fn new(coordinators: Arc<dyn CoordinatorLocator>, shards: Arc<dyn ShardLocator>) -> Self {
        Self {
            coordinators,
            shards,
        }
    }

    /// Resolves a group to its coordinator.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::NoCoordinator` if the group has no coordinator
    /// partition, or `RoutingError::NoShardOwner` if that partition is not
    /// served by any local shard.
    pub fn resolve(&self, group_id: &GroupId) -> Result<Coordinator, RoutingError> {
        let ntp = self
            .coordinators
            .ntp_for(group_id)
            .ok_or_else(|| RoutingError::NoCoordinator {
                group_id: group_id.clone(),
            })?;

        let Some(shard) = self.shards.shard_for(&ntp) else {
            return Err(RoutingError::NoShardOwner { ntp });
        };

        Ok(Coordinator { ntp, shard })
    }

    /// Resolves a group, logging and discarding the failure reason.
    #[must_use]
    pub fn shard_for(&self, group_id: &GroupId) -> Option<Coordinator> {
        match self.resolve(group_id) {
            Ok(coordinator) => Some(coordinator),
            Err(e) => {
                debug!(group_id = %group_id, reason = %e, "group is not coordinated here");
                None
            }
        }
    }
}

impl std::fmt::Debug for CoordinatorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorResolver").finish_non_exhaustive()
    }
}

/// Errors from routing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No coordinator partition for the group.
    NoCoordinator {
        /// The group that couldn't be mapped.
        group_id: GroupId,
    },
    /// The coordinator partition has no local owner.
    NoShardOwner {
        /// The unowned partition.
        ntp: Ntp,
    },
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCoordinator { group_id } => {
                write!(f, "no coordinator partition for group {group_id}")
            }
            Self::NoShardOwner { ntp } => {
                write!(f, "no local shard owns {ntp}")
            }
        }
    }
}

impl std::error::Error for RoutingError {}
