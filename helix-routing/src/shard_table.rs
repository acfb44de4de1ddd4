//! Shard table - mapping of coordinator partitions to local shards.
//!
//! The shard table records which shard on this node currently serves a
//! partition. Partitions hosted elsewhere, or in the middle of moving between
//! shards, have no entry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use helix_core::{Ntp, ShardId};

/// Maximum number of partitions tracked by a shard table.
pub const SHARD_TABLE_ENTRIES_MAX: usize = 1 << 20;

/// Looks up the shard that owns a partition.
///
/// Implementations read node-local state and must not block.
pub trait ShardLocator: Send + Sync {
    /// Returns the owning shard of `ntp`, if it is served on this node.
    fn shard_for(&self, ntp: &Ntp) -> Option<ShardId>;
}

#[derive(Debug, Default)]
struct Inner {
    /// Owner of each partition.
    entries: HashMap<Ntp, ShardId>,
    /// Version number for tracking updates.
    version: u64,
}

/// Versioned map of partition ownership.
#[derive(Debug, Default)]
pub struct ShardTable {
    inner: RwLock<Inner>,
}

impl ShardTable {
    /// Creates an empty shard table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a partition to a shard.
    ///
    /// This overwrites any existing assignment for the partition.
    ///
    /// # Errors
    ///
    /// Returns an error if a new entry would exceed `SHARD_TABLE_ENTRIES_MAX`.
    pub fn update(&self, ntp: Ntp, shard: ShardId) -> Result<(), ShardTableError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.len() >= SHARD_TABLE_ENTRIES_MAX && !inner.entries.contains_key(&ntp) {
            return Err(ShardTableError::TooManyEntries {
                count: inner.entries.len(),
                max: SHARD_TABLE_ENTRIES_MAX,
            });
        }

        inner.entries.insert(ntp, shard);
        inner.version += 1;
        Ok(())
    }

    /// Removes a partition's assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition has no assignment.
    pub fn erase(&self, ntp: &Ntp) -> Result<ShardId, ShardTableError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let Some(shard) = inner.entries.remove(ntp) else {
            return Err(ShardTableError::NotFound { ntp: ntp.clone() });
        };
        inner.version += 1;
        Ok(shard)
    }

    /// Returns the number of assigned partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    /// Returns true if no partition is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the version number of the table.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).version
    }
}

impl ShardLocator for ShardTable {
    fn shard_for(&self, ntp: &Ntp) -> Option<ShardId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(ntp)
            .copied()
    }
}

/// Errors from shard table operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardTableError {
    /// Too many entries.
    TooManyEntries {
        /// Current count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
    /// Partition not found.
    NotFound {
        /// The partition that wasn't found.
        ntp: Ntp,
    },
}

impl std::fmt::Display for ShardTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyEntries { count, max } => {
                write!(f, "too many shard table entries: {count} (max {max})")
            }
            Self::NotFound { ntp } => {
                write!(f, "no shard assignment for {ntp}")
            }
        }
    }
}

impl std::error::Error for ShardTableError {}
