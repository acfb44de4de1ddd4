//! Bounded concurrency limiter.
//!
//! The limiter hands out a fixed number of permits. Each in-flight operation
//! holds one permit for its whole lifetime, including the wait for a reply
//! from a remote shard. Once all permits are taken, new callers suspend
//! until a permit is released.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

use crate::error::{FlowError, FlowResult};

/// Maximum number of permits a limiter may be configured with.
pub const IN_FLIGHT_MAX: usize = 1 << 20;

/// Configuration for a concurrency limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimiterConfig {
    /// Name of the traffic class, used in logs and errors.
    pub name: &'static str,

    /// Maximum number of operations admitted at once.
    pub max_in_flight: usize,
}

impl ConcurrencyLimiterConfig {
    /// Creates a new limiter configuration.
    #[must_use]
    pub const fn new(name: &'static str, max_in_flight: usize) -> Self {
        Self {
            name,
            max_in_flight,
        }
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            name: "test",
            max_in_flight: 16,
        }
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidConfig` if the limit is zero or exceeds
    /// [`IN_FLIGHT_MAX`].
    pub fn validate(&self) -> FlowResult<()> {
        if self.max_in_flight == 0 {
            return Err(FlowError::InvalidConfig {
                message: format!("{}: max_in_flight must be positive", self.name),
            });
        }
        if self.max_in_flight > IN_FLIGHT_MAX {
            return Err(FlowError::InvalidConfig {
                message: format!(
                    "{}: max_in_flight {} exceeds {IN_FLIGHT_MAX}",
                    self.name, self.max_in_flight
                ),
            });
        }
        Ok(())
    }
}

impl Default for ConcurrencyLimiterConfig {
    fn default() -> Self {
        Self {
            name: "group",
            max_in_flight: 5_000,
        }
    }
}

/// Snapshot of limiter usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStats {
    /// Operations currently holding a permit.
    pub in_flight: usize,
    /// Configured concurrency limit.
    pub max_in_flight: usize,
    /// True once the limiter has been closed.
    pub closed: bool,
}

/// A permit for one admitted operation. Released on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Admission limiter shared by every dispatcher of one traffic class.
///
/// Cloning is cheap; clones share the same permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    config: ConcurrencyLimiterConfig,
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// Creates a new limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ConcurrencyLimiterConfig) -> FlowResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            semaphore: Arc::new(Semaphore::new(config.max_in_flight)),
        })
    }

    /// Returns the limiter name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.config.name
    }

    /// Waits for a permit.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Shutdown` if the limiter is closed before a permit
    /// becomes available.
    pub async fn acquire(&self) -> FlowResult<AdmissionPermit> {
        if self.semaphore.available_permits() == 0 {
            debug!(limiter = self.config.name, "admission limit reached, waiting");
        }
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FlowError::Shutdown)?;
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Takes a permit without waiting.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::WouldBlock` if no permit is free, or
    /// `FlowError::Shutdown` if the limiter is closed.
    pub fn try_acquire(&self) -> FlowResult<AdmissionPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(AdmissionPermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) => Err(FlowError::WouldBlock {
                name: self.config.name,
                max_in_flight: self.config.max_in_flight,
            }),
            Err(TryAcquireError::Closed) => Err(FlowError::Shutdown),
        }
    }

    /// Closes the limiter. Pending and future `acquire` calls fail.
    ///
    /// Permits already handed out stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Returns current usage.
    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        let closed = self.semaphore.is_closed();
        let available = self.semaphore.available_permits();
        LimiterStats {
            in_flight: self.config.max_in_flight.saturating_sub(available),
            max_in_flight: self.config.max_in_flight,
            closed,
        }
    }
}
