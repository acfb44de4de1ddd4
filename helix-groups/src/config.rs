//! Group router configuration.

use helix_flow::{ConcurrencyLimiterConfig, FlowResult};

use crate::shard::ShardConfig;

/// Configuration for the group router and its shard executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupRouterConfig {
    /// Admission limit applied to all group traffic.
    pub admission: ConcurrencyLimiterConfig,
    /// Per-shard executor configuration.
    pub shard: ShardConfig,
}

impl GroupRouterConfig {
    /// Creates a configuration for testing.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            admission: ConcurrencyLimiterConfig::for_testing(),
            shard: ShardConfig::for_testing(),
        }
    }

    /// Sets the maximum number of group operations in flight.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.admission = self.admission.with_max_in_flight(max_in_flight);
        self
    }

    /// Sets the shard command channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.shard = self.shard.with_channel_capacity(channel_capacity);
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the admission limit is invalid.
    pub fn validate(&self) -> FlowResult<()> {
        self.admission.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = GroupRouterConfig::for_testing()
            .with_max_in_flight(4)
            .with_channel_capacity(2);
        assert_eq!(config.admission.max_in_flight, 4);
        assert_eq!(config.shard.channel_capacity, 2);
        assert!(config.validate().is_ok());
        assert!(GroupRouterConfig::default().validate().is_ok());
        assert!(GroupRouterConfig::default().with_max_in_flight(0).validate().is_err());
    }
}
