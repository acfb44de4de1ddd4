//! Flow control error types.

/// Flow control error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// No admission permit is free right now.
    #[error("operation would block: {name} has {max_in_flight} operations in flight")]
    WouldBlock {
        /// The limiter name.
        name: &'static str,
        /// Configured concurrency limit.
        max_in_flight: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Shutdown in progress.
    #[error("shutdown in progress")]
    Shutdown,
}

/// Result type for flow control operations.
pub type FlowResult<T> = Result<T, FlowError>;
