use std::collections::HashMap;

/// (Topic, Partition)
type Key = (String, u32);

/// Detects partitions whose Consumer is not advancing across polling cycles.
///
/// Retains, for each Topic Partition, the Consumer offset observed at the previous cycle.
/// A missing entry means "never observed": that is never conflated with offset `0`.
///
/// There is no reset: the state lives as long as the owning scaler.
#[derive(Debug, Clone, Default)]
pub struct PersistentLagTracker {
    previous: HashMap<Key, i64>,
}

impl PersistentLagTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the `current` Consumer offset for `topic` and `partition`.
    ///
    /// Returns `true` if lag on this partition is "persistent", meaning the Consumer is still at the
    /// same offset it was at during the previous observation. Otherwise the observation becomes
    /// the new baseline, and `false` is returned.
    pub fn observe(&mut self, topic: &str, partition: u32, current: i64) -> bool {
        let k: Key = (topic.to_string(), partition);

        match self.previous.get(&k) {
            Some(previous) if *previous == current => {
                debug!("Consumer offset of '{topic}:{partition}' still at {current}: lag is persistent");
                true
            },
            _ => {
                self.previous.insert(k, current);
                false
            },
        }
    }

    /// Consumer offset observed during the previous cycle, if any.
    #[cfg(test)]
    pub fn previous_offset(&self, topic: &str, partition: u32) -> Option<i64> {
        self.previous.get(&(topic.to_string(), partition)).copied()
    }

    /// Number of Topic Partitions with a baseline.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
