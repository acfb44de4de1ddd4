//! Helix Core - Strongly-typed identifiers for Helix group coordination.
//!
//! This crate provides the identifiers shared by the routing, flow control
//! and group crates. It has no dependencies and no runtime behavior.
//!
//! # Design Principles (TigerStyle)
//!
//! - **Strongly-typed IDs**: Prevent mixing up `ShardId` with `PartitionId`
//! - **Explicit types**: Use u64, not usize
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod types;

pub use types::{GroupId, Ntp, PartitionId, ProducerId, ShardId, TermId, TxSequence};
