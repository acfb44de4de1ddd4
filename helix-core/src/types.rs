//! Strongly-typed identifiers for Helix group coordination.
//!
//! Following `TigerStyle`: explicit types prevent bugs from mixing up IDs.
//! Numeric IDs are 64-bit; group identifiers and partition locators are
//! string-based because they come straight off the Kafka wire.

use std::fmt;

/// Macro to generate strongly-typed ID wrappers.
///
/// Each ID type wraps a u64 and provides:
/// - Type safety (can't mix `ShardId` with `PartitionId`)
/// - Debug/Display formatting
/// - Zero-cost abstraction (same as raw u64)
macro_rules! define_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new ID from a raw u64 value.
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw u64 value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the next ID in sequence.
            ///
            /// # Panics
            /// Panics if the ID would overflow.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                assert!(self.0 < u64::MAX, "ID overflow");
                Self(self.0 + 1)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.get()
            }
        }
    };
}

// Execution units.
define_id!(ShardId, "shard", "Index of a single-threaded execution unit within a node.");

// Partition identification.
define_id!(PartitionId, "partition", "Index of a partition within a topic.");

// Transactions.
define_id!(ProducerId, "pid", "Identifier of a transactional producer.");
define_id!(TxSequence, "txseq", "Sequence number of a transaction for a producer.");
define_id!(TermId, "term", "Leadership term, used as the epoch tag of a prepared transaction.");

/// Identifier of a Kafka consumer group.
///
/// Opaque to the router: it is only ever hashed and compared. Stable for the
/// lifetime of the group.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a group ID from any string-like value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the group ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw bytes of the group ID.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns true if the group ID is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Namespace/topic/partition locator.
///
/// Identifies the internal partition that acts as a group's coordinator
/// record. Ordered and hashable so it can key ownership tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ntp {
    /// Topic namespace (e.g. `kafka`).
    pub namespace: String,
    /// Topic name.
    pub topic: String,
    /// Partition within the topic.
    pub partition: PartitionId,
}

impl Ntp {
    /// Creates a new locator.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        topic: impl Into<String>,
        partition: PartitionId,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for Ntp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.topic, self.partition.get())
    }
}
