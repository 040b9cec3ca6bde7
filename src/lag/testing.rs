use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use crate::broker::{BrokerClient, BrokerError, BrokerResult};
use crate::kafka_types::{
    GroupMembers, Member, Offset, OffsetBounds, OffsetMap, TopicPartition, TopicPartitionSet,
};

/// In-memory [`BrokerClient`], serving whatever it was configured with.
///
/// Committed and latest offsets can be changed between calls, to simulate polling cycles.
#[derive(Default)]
pub(crate) struct StaticBrokerClient {
    topics: TopicPartitionSet,
    group: Mutex<GroupMembers>,
    committed: Mutex<OffsetMap>,
    latest: Mutex<OffsetMap>,
    fail_committed: Mutex<Option<BrokerError>>,
    fail_bounds: Mutex<Option<BrokerError>>,
    committed_delay: Option<Duration>,
    bounds_delay: Option<Duration>,
    pub(crate) committed_calls: AtomicUsize,
    pub(crate) bounds_calls: AtomicUsize,
}

impl StaticBrokerClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_topic(mut self, topic: &str, partitions: u32) -> Self {
        self.topics.insert(topic.to_string(), (0..partitions).collect());
        self
    }

    /// Adds one active member to the group, assigned all the partitions of `topic`.
    pub(crate) fn with_member(self, member_id: &str, topic: &str) -> Self {
        let assignment = self
            .topics
            .get(topic)
            .map(|ps| ps.iter().map(|p| TopicPartition::new(topic.to_string(), *p)).collect())
            .unwrap_or_default();

        {
            let mut group = self.group.lock().unwrap();
            group.state = "Stable".to_string();
            group.members.push(Member {
                id: member_id.to_string(),
                client_id: "client".to_string(),
                client_host: "/127.0.0.1".to_string(),
                assignment,
            });
        }
        self
    }

    pub(crate) fn with_group_state(self, state: &str) -> Self {
        self.group.lock().unwrap().state = state.to_string();
        self
    }

    pub(crate) fn with_committed(self, topic: &str, offsets: &[Option<i64>]) -> Self {
        self.set_committed(topic, offsets);
        self
    }

    pub(crate) fn with_latest(self, topic: &str, offsets: &[i64]) -> Self {
        self.set_latest(topic, offsets);
        self
    }

    pub(crate) fn with_committed_delay(mut self, delay: Duration) -> Self {
        self.committed_delay = Some(delay);
        self
    }

    pub(crate) fn with_bounds_delay(mut self, delay: Duration) -> Self {
        self.bounds_delay = Some(delay);
        self
    }

    /// `None` entries are partitions without a committed offset: they are left out of the map.
    pub(crate) fn set_committed(&self, topic: &str, offsets: &[Option<i64>]) {
        let partitions = offsets
            .iter()
            .enumerate()
            .filter_map(|(p, o)| o.map(|o| (p as u32, Offset::Known(o))))
            .collect::<BTreeMap<u32, Offset>>();
        self.committed.lock().unwrap().insert(topic.to_string(), partitions);
    }

    pub(crate) fn set_latest(&self, topic: &str, offsets: &[i64]) {
        let partitions = offsets
            .iter()
            .enumerate()
            .map(|(p, o)| (p as u32, Offset::Known(*o)))
            .collect::<BTreeMap<u32, Offset>>();
        self.latest.lock().unwrap().insert(topic.to_string(), partitions);
    }

    pub(crate) fn fail_committed_with(&self, err: BrokerError) {
        *self.fail_committed.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_bounds_with(&self, err: BrokerError) {
        *self.fail_bounds.lock().unwrap() = Some(err);
    }
}

fn restrict(offsets: &OffsetMap, tps: &TopicPartitionSet, fill_unknown: bool) -> OffsetMap {
    let mut res = OffsetMap::new();
    for (t, partitions) in tps.iter() {
        let known = offsets.get(t);
        let mut by_partition = BTreeMap::new();
        for p in partitions {
            match known.and_then(|k| k.get(p)) {
                Some(o) => {
                    by_partition.insert(*p, *o);
                },
                None if fill_unknown => {
                    by_partition.insert(*p, Offset::Unknown);
                },
                None => {},
            }
        }
        res.insert(t.clone(), by_partition);
    }
    res
}

#[async_trait]
impl BrokerClient for StaticBrokerClient {
    async fn list_topics_and_partitions(&self) -> BrokerResult<TopicPartitionSet> {
        Ok(self.topics.clone())
    }

    async fn describe_consumer_group(&self, group: &str) -> BrokerResult<GroupMembers> {
        let mut gm = self.group.lock().unwrap().clone();
        gm.name = group.to_string();
        if gm.state.is_empty() {
            gm.state = "Empty".to_string();
        }
        Ok(gm)
    }

    async fn fetch_committed_offsets(
        &self,
        _group: &str,
        tps: &TopicPartitionSet,
    ) -> BrokerResult<OffsetMap> {
        self.committed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.committed_delay {
            sleep(delay).await;
        }
        if let Some(err) = self.fail_committed.lock().unwrap().clone() {
            return Err(err);
        }

        // Like the real cluster: partitions without commits are reported, but as unknown
        Ok(restrict(&self.committed.lock().unwrap(), tps, true))
    }

    async fn fetch_offset_bounds(&self, tps: &TopicPartitionSet) -> BrokerResult<OffsetBounds> {
        self.bounds_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.bounds_delay {
            sleep(delay).await;
        }
        if let Some(err) = self.fail_bounds.lock().unwrap().clone() {
            return Err(err);
        }

        let latest = restrict(&self.latest.lock().unwrap(), tps, false);
        let earliest = latest
            .iter()
            .map(|(t, ps)| (t.clone(), ps.keys().map(|p| (*p, Offset::Known(0))).collect()))
            .collect();

        Ok(OffsetBounds {
            earliest,
            latest,
        })
    }
}

/// Shorthand to build a [`TopicPartitionSet`] in tests.
pub(crate) fn tps(entries: &[(&str, &[u32])]) -> TopicPartitionSet {
    entries
        .iter()
        .map(|(t, ps)| (t.to_string(), ps.iter().copied().collect::<BTreeSet<u32>>()))
        .collect()
}
