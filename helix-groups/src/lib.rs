//! Helix Groups - Shard-aware consumer group routing.
//!
//! Consumer group state lives in the partitions of an internal coordinator
//! topic, and each of those partitions is served by exactly one shard of a
//! node. This crate turns a group operation from a Kafka client (or from the
//! transaction coordinator) into a call on the group manager of the shard
//! that owns the group.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//!  request ─────────►│       GroupRouter        │
//!                    │  CoordinatorResolver     │── group ─► ntp ─► shard
//!                    │  Dispatcher (admission)  │
//!                    └────────────┬─────────────┘
//!                                 │ ShardCommand
//!            ┌────────────────────┼────────────────────┐
//!            ▼                    ▼                    ▼
//!     ShardExecutor(0)     ShardExecutor(1)     ShardExecutor(N)
//!     GroupManager(0)      GroupManager(1)      GroupManager(N)
//! ```
//!
//! # Error domains
//!
//! Kafka clients see [`ErrorCode`]. Group transaction callers see
//! [`TxErrc`]. Faults of the cross-shard call or the manager surface as
//! [`RouterError`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod dispatch;
mod errc;
mod error;
mod manager;
pub mod protocol;
mod request;
mod router;
mod shard;
mod stages;

pub use config::GroupRouterConfig;
pub use dispatch::Dispatcher;
pub use errc::{ErrorCode, TxErrc};
pub use error::{GroupError, GroupResult, RouteResult, RouterError};
pub use manager::{CommitStages, GroupManager};
pub use request::{ClientRequest, GroupRequest, TxRequest};
pub use router::GroupRouter;
pub use shard::{spawn_shard, Reply, ShardCommand, ShardConfig, ShardHandle, ShardSet};
pub use stages::OffsetCommitStages;
