//! Coordinator mapping - group ID to coordinator partition.
//!
//! Every consumer group is coordinated through one partition of an internal
//! topic. The mapper hashes the group ID onto that topic's partitions. Until
//! the topic exists there is no mapping at all.

use std::num::NonZeroU32;
use std::sync::{PoisonError, RwLock};

use helix_core::{GroupId, Ntp, PartitionId};
use xxhash_rust::xxh3::xxh3_64;

/// Default namespace of the coordinator topic.
pub const COORDINATOR_NAMESPACE_DEFAULT: &str = "kafka";

/// Default name of the coordinator topic.
pub const COORDINATOR_TOPIC_DEFAULT: &str = "__consumer_offsets";

/// Looks up the coordinator partition of a group.
///
/// Implementations read node-local state and must not block.
pub trait CoordinatorLocator: Send + Sync {
    /// Returns the coordinator partition for `group_id`, if one is established.
    fn ntp_for(&self, group_id: &GroupId) -> Option<Ntp>;
}

/// Descriptor of the internal topic that stores group state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorTopic {
    /// Topic namespace.
    pub namespace: String,
    /// Topic name.
    pub topic: String,
    /// Number of partitions in the topic.
    pub partition_count: NonZeroU32,
}

impl CoordinatorTopic {
    /// Creates a descriptor for the default coordinator topic.
    #[must_use]
    pub fn with_partitions(partition_count: NonZeroU32) -> Self {
        Self {
            namespace: COORDINATOR_NAMESPACE_DEFAULT.to_string(),
            topic: COORDINATOR_TOPIC_DEFAULT.to_string(),
            partition_count,
        }
    }

    /// Returns the partition a group hashes to.
    #[must_use]
    pub fn partition_for(&self, group_id: &GroupId) -> PartitionId {
        let hash = xxh3_64(group_id.as_bytes());
        PartitionId::new(hash % u64::from(self.partition_count.get()))
    }
}

/// Hash-based [`CoordinatorLocator`].
///
/// The topic descriptor is installed by whoever observes the coordinator
/// topic's creation; lookups only take a read lock.
#[derive(Debug, Default)]
pub struct CoordinatorMapper {
    topic: RwLock<Option<CoordinatorTopic>>,
}

impl CoordinatorMapper {
    /// Creates a mapper with no coordinator topic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper for an existing coordinator topic.
    #[must_use]
    pub fn with_topic(topic: CoordinatorTopic) -> Self {
        Self {
            topic: RwLock::new(Some(topic)),
        }
    }

    /// Installs (or replaces) the coordinator topic.
    pub fn install(&self, topic: CoordinatorTopic) {
        *self.topic.write().unwrap_or_else(PoisonError::into_inner) = Some(topic);
    }

    /// Removes the coordinator topic. Every lookup fails afterwards.
    pub fn clear(&self) {
        *self.topic.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the installed coordinator topic.
    #[must_use]
    pub fn topic(&self) -> Option<CoordinatorTopic> {
        self.topic.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CoordinatorLocator for CoordinatorMapper {
    fn ntp_for(&self, group_id: &GroupId) -> Option<Ntp> {
        let guard = self.topic.read().unwrap_or_else(PoisonError::into_inner);
        let topic = guard.as_ref()?;
        Some(Ntp::new(
            topic.namespace.clone(),
            topic.topic.clone(),
            topic.partition_for(group_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(partitions: u32) -> CoordinatorTopic {
        CoordinatorTopic::with_partitions(NonZeroU32::new(partitions).unwrap())
    }

    #[test]
    fn test_no_topic_means_no_mapping() {
        let mapper = CoordinatorMapper::new();
        assert!(mapper.ntp_for(&GroupId::from("g1")).is_none());
        assert!(mapper.topic().is_none());
    }

    #[test]
    fn test_mapping_is_stable_and_in_range() {
        let mapper = CoordinatorMapper::with_topic(topic(16));

        for name in ["g1", "g2", "orders", "payments", ""] {
            let group = GroupId::from(name);
            let first = mapper.ntp_for(&group).unwrap();
            let second = mapper.ntp_for(&group).unwrap();

            assert_eq!(first, second);
            assert!(first.partition.get() < 16);
            assert_eq!(first.namespace, COORDINATOR_NAMESPACE_DEFAULT);
            assert_eq!(first.topic, COORDINATOR_TOPIC_DEFAULT);
        }
    }

    #[test]
    fn test_single_partition_topic() {
        let mapper = CoordinatorMapper::with_topic(topic(1));
        let ntp = mapper.ntp_for(&GroupId::from("anything")).unwrap();
        assert_eq!(ntp.partition, PartitionId::new(0));
    }

    #[test]
    fn test_install_and_clear() {
        let mapper = CoordinatorMapper::new();
        let group = GroupId::from("g1");

        mapper.install(topic(8));
        assert!(mapper.ntp_for(&group).is_some());

        mapper.clear();
        assert!(mapper.ntp_for(&group).is_none());
    }

    #[test]
    fn test_groups_spread_over_partitions() {
        let topic = topic(8);
        let mut seen = std::collections::HashSet::new();
        for i in 0..256 {
            seen.insert(topic.partition_for(&GroupId::new(format!("group-{i}"))));
        }
        // 256 groups over 8 partitions should touch more than one partition.
        assert!(seen.len() > 1);
    }
}
