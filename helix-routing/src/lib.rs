//! Helix Routing - Consumer group coordinator resolution.
//!
//! This crate maps consumer group IDs to the internal partition that
//! coordinates them, and that partition to the local shard serving it.
//!
//! # Design (`TigerStyle`)
//!
//! - **Deterministic hashing**: Group IDs map deterministically to partitions
//! - **No caching**: Every resolution reads the current ownership tables
//! - **Explicit limits**: All resources are bounded

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod coordinator;
mod resolver;
mod shard_table;

pub use coordinator::{
    CoordinatorLocator, CoordinatorMapper, CoordinatorTopic, COORDINATOR_NAMESPACE_DEFAULT,
    COORDINATOR_TOPIC_DEFAULT,
};
pub use resolver::{Coordinator, CoordinatorResolver, RoutingError};
pub use shard_table::{ShardLocator, ShardTable, ShardTableError, SHARD_TABLE_ENTRIES_MAX};
