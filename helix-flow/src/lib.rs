//! Flow control for Helix group coordination traffic.
//!
//! Group coordination requests are dispatched across shards under a
//! dedicated admission limit so that they can neither starve nor be starved
//! by unrelated work on the node.
//!
//! # Admission
//!
//! ```text
//! caller ──► ConcurrencyLimiter::acquire() ──► AdmissionPermit ──► shard queue
//!                  │                                 │
//!                  └── suspends while full           └── released on drop
//! ```
//!
//! A caller that finds the limiter exhausted waits for a permit; it is never
//! rejected. Only `close()` turns waiting into a [`FlowError::Shutdown`].
//!
//! # Example
//!
//! ```rust
//! use helix_flow::{ConcurrencyLimiter, ConcurrencyLimiterConfig};
//!
//! # async fn run() -> helix_flow::FlowResult<()> {
//! let limiter = ConcurrencyLimiter::new(ConcurrencyLimiterConfig::for_testing())?;
//! let permit = limiter.acquire().await?;
//! // Forward the operation while holding the permit...
//! drop(permit);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod limiter;

// Re-export main types for convenience.
pub use error::{FlowError, FlowResult};
pub use limiter::{
    AdmissionPermit, ConcurrencyLimiter, ConcurrencyLimiterConfig, LimiterStats,
    IN_FLIGHT_MAX,
};
