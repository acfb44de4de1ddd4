//! Error codes for the two error domains of group routing.
//!
//! [`ErrorCode`] is the Kafka error vocabulary returned to clients. It is a
//! fixed, externally versioned contract and is never extended for internal
//! signalling. [`TxErrc`] is the cluster-internal vocabulary of the group
//! transaction path. The two meet only in [`ErrorCode::from_tx_errc`].

use std::fmt;

use kafka_protocol::ResponseError;

/// Client-facing Kafka error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// Success.
    #[default]
    None,
    /// This node is not the coordinator of the group.
    NotCoordinator,
    /// The coordinator is still loading group state.
    CoordinatorLoadInProgress,
    /// The coordinator is not available.
    CoordinatorNotAvailable,
    /// The group does not exist.
    GroupIdNotFound,
    /// The group still has members.
    NonEmptyGroup,
    /// The member is not part of the group.
    UnknownMemberId,
    /// The generation is stale.
    IllegalGeneration,
    /// The group is rebalancing.
    RebalanceInProgress,
    /// The request timed out.
    RequestTimedOut,
    /// The producer has been fenced by a newer instance.
    ProducerFenced,
    /// Another transaction is in progress.
    ConcurrentTransactions,
    /// Unexpected server error.
    UnknownServerError,
}

impl ErrorCode {
    /// Returns the Kafka protocol error, or `None` for success.
    #[must_use]
    pub const fn response_error(self) -> Option<ResponseError> {
        match self {
            Self::None => None,
            Self::NotCoordinator => Some(ResponseError::NotCoordinator),
            Self::CoordinatorLoadInProgress => Some(ResponseError::CoordinatorLoadInProgress),
            Self::CoordinatorNotAvailable => Some(ResponseError::CoordinatorNotAvailable),
            Self::GroupIdNotFound => Some(ResponseError::GroupIdNotFound),
            Self::NonEmptyGroup => Some(ResponseError::NonEmptyGroup),
            Self::UnknownMemberId => Some(ResponseError::UnknownMemberId),
            Self::IllegalGeneration => Some(ResponseError::IllegalGeneration),
            Self::RebalanceInProgress => Some(ResponseError::RebalanceInProgress),
            Self::RequestTimedOut => Some(ResponseError::RequestTimedOut),
            Self::ProducerFenced => Some(ResponseError::ProducerFenced),
            Self::ConcurrentTransactions => Some(ResponseError::ConcurrentTransactions),
            Self::UnknownServerError => Some(ResponseError::UnknownServerError),
        }
    }

    /// Returns the numeric wire code.
    #[must_use]
    pub fn code(self) -> i16 {
        self.response_error().map_or(0, |e| e.code())
    }

    /// Parses a wire code. Codes outside this vocabulary yield `None`.
    #[must_use]
    pub fn from_code(code: i16) -> Option<Self> {
        if code == 0 {
            return Some(Self::None);
        }
        let parsed = match ResponseError::try_from_code(code)? {
            ResponseError::NotCoordinator => Self::NotCoordinator,
            ResponseError::CoordinatorLoadInProgress => Self::CoordinatorLoadInProgress,
            ResponseError::CoordinatorNotAvailable => Self::CoordinatorNotAvailable,
            ResponseError::GroupIdNotFound => Self::GroupIdNotFound,
            ResponseError::NonEmptyGroup => Self::NonEmptyGroup,
            ResponseError::UnknownMemberId => Self::UnknownMemberId,
            ResponseError::IllegalGeneration => Self::IllegalGeneration,
            ResponseError::RebalanceInProgress => Self::RebalanceInProgress,
            ResponseError::RequestTimedOut => Self::RequestTimedOut,
            ResponseError::ProducerFenced => Self::ProducerFenced,
            ResponseError::ConcurrentTransactions => Self::ConcurrentTransactions,
            ResponseError::UnknownServerError => Self::UnknownServerError,
            _ => return None,
        };
        Some(parsed)
    }

    /// Returns true for success.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Maps a cluster-internal transaction outcome to the code a Kafka
    /// client sees.
    #[must_use]
    pub const fn from_tx_errc(errc: TxErrc) -> Self {
        match errc {
            TxErrc::None => Self::None,
            TxErrc::NotCoordinator => Self::NotCoordinator,
            TxErrc::CoordinatorNotAvailable => Self::CoordinatorNotAvailable,
            TxErrc::CoordinatorLoadInProgress => Self::CoordinatorLoadInProgress,
            TxErrc::Timeout => Self::RequestTimedOut,
            TxErrc::Fenced | TxErrc::Stale => Self::ProducerFenced,
            TxErrc::Conflict => Self::ConcurrentTransactions,
            TxErrc::RequestRejected | TxErrc::UnknownServerError => Self::UnknownServerError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response_error() {
            None => f.write_str("none"),
            Some(e) => write!(f, "{e:?} ({})", self.code()),
        }
    }
}

/// Cluster-internal error code of group transaction replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxErrc {
    /// Success.
    #[default]
    None,
    /// The group is not coordinated by this node.
    NotCoordinator,
    /// The coordinator is not available.
    CoordinatorNotAvailable,
    /// The coordinator is still loading group state.
    CoordinatorLoadInProgress,
    /// The operation timed out.
    Timeout,
    /// The producer was fenced.
    Fenced,
    /// The request refers to a stale epoch or sequence.
    Stale,
    /// A conflicting transaction is in progress.
    Conflict,
    /// The request was rejected.
    RequestRejected,
    /// Unexpected failure.
    UnknownServerError,
}

impl TxErrc {
    /// Returns true for success.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for TxErrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::NotCoordinator => "not_coordinator",
            Self::CoordinatorNotAvailable => "coordinator_not_available",
            Self::CoordinatorLoadInProgress => "coordinator_load_in_progress",
            Self::Timeout => "timeout",
            Self::Fenced => "fenced",
            Self::Stale => "stale",
            Self::Conflict => "conflict",
            Self::RequestRejected => "request_rejected",
            Self::UnknownServerError => "unknown_server_error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(ErrorCode::None.code(), 0);
        assert_eq!(ErrorCode::NotCoordinator.code(), 16);
        assert_eq!(ErrorCode::CoordinatorLoadInProgress.code(), 14);
        assert_eq!(ErrorCode::GroupIdNotFound.code(), 69);
        assert_eq!(ErrorCode::UnknownServerError.code(), -1);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(ErrorCode::from_code(0), Some(ErrorCode::None));
        assert_eq!(ErrorCode::from_code(16), Some(ErrorCode::NotCoordinator));
        assert_eq!(ErrorCode::from_code(68), Some(ErrorCode::NonEmptyGroup));
        // OFFSET_OUT_OF_RANGE is a valid Kafka code but not a group routing one.
        assert_eq!(ErrorCode::from_code(1), None);
    }

    #[test]
    fn test_tx_errc_mapping() {
        assert_eq!(ErrorCode::from_tx_errc(TxErrc::None), ErrorCode::None);
        assert_eq!(
            ErrorCode::from_tx_errc(TxErrc::NotCoordinator),
            ErrorCode::NotCoordinator
        );
        assert_eq!(ErrorCode::from_tx_errc(TxErrc::Timeout), ErrorCode::RequestTimedOut);
        assert_eq!(ErrorCode::from_tx_errc(TxErrc::Stale), ErrorCode::ProducerFenced);
        assert_eq!(
            ErrorCode::from_tx_errc(TxErrc::RequestRejected),
            ErrorCode::UnknownServerError
        );
    }

    #[test]
    fn test_defaults_are_success() {
        assert!(ErrorCode::default().is_none());
        assert!(TxErrc::default().is_none());
        assert!(!TxErrc::NotCoordinator.is_none());
        assert_eq!(TxErrc::NotCoordinator.to_string(), "not_coordinator");
        assert_eq!(ErrorCode::None.to_string(), "none");
    }
}
