use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use konsumer_offsets::ConsumerProtocolAssignment;
use rdkafka::{
    admin::AdminClient,
    client::DefaultClientContext,
    consumer::{BaseConsumer, Consumer},
    groups::GroupInfo,
    ClientConfig, Offset as KafkaOffset, TopicPartitionList,
};
use tokio::time::Duration;

use super::errors::{BrokerError, BrokerResult};
use super::BrokerClient;
use crate::constants::{KONSUMER_OFFSETS_DATA_TOPIC, UNKNOWN_GROUP_STATE};
use crate::kafka_types::{
    GroupMembers, Member, Offset, OffsetBounds, OffsetMap, TopicPartition, TopicPartitionSet,
};

/// [`BrokerClient`] backed by `librdkafka`.
///
/// Cluster metadata, group descriptions and watermarks go through an Admin Client.
/// Committed offsets are read through a (never subscribing) Consumer per Consumer Group,
/// because the Kafka protocol ties committed offsets to the `group.id` of the requester.
///
/// Every call to `librdkafka` is blocking: each is moved to [`tokio::task::spawn_blocking`].
pub struct RdKafkaBrokerClient {
    client_config: ClientConfig,
    admin_client: Arc<AdminClient<DefaultClientContext>>,
    group_consumers: Mutex<HashMap<String, Arc<BaseConsumer>>>,
    fetch_timeout: Duration,
}

impl RdKafkaBrokerClient {
    /// Create a new [`RdKafkaBrokerClient`]
    ///
    /// # Arguments
    ///
    /// * `client_config` - Kafka client configuration, shared by the Admin Client and the per-group Consumers
    /// * `fetch_timeout` - Timeout applied to every single request to the cluster
    pub fn new(client_config: ClientConfig, fetch_timeout: Duration) -> BrokerResult<Self> {
        let admin_client: AdminClient<DefaultClientContext> =
            client_config.create().map_err(|e| BrokerError::ClientCreation(e.to_string()))?;

        Ok(Self {
            client_config,
            admin_client: Arc::new(admin_client),
            group_consumers: Mutex::new(HashMap::new()),
            fetch_timeout,
        })
    }

    fn group_consumer(&self, group: &str) -> BrokerResult<Arc<BaseConsumer>> {
        let mut guard = self.group_consumers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(consumer) = guard.get(group) {
            return Ok(consumer.clone());
        }

        let consumer: BaseConsumer = self
            .client_config
            .clone()
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| BrokerError::ClientCreation(e.to_string()))?;
        let consumer = Arc::new(consumer);

        debug!("Created Consumer to read committed offsets of Group '{group}'");
        guard.insert(group.to_string(), consumer.clone());
        Ok(consumer)
    }
}

async fn run_blocking<T, F>(f: F) -> BrokerResult<T>
where
    F: FnOnce() -> BrokerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| BrokerError::TaskJoin(e.to_string()))?
}

fn group_members_from(group: &str, gi: &GroupInfo) -> GroupMembers {
    let members = gi
        .members()
        .iter()
        .map(|m| Member {
            id: m.id().to_string(),
            client_id: m.client_id().to_string(),
            client_host: m.client_host().to_string(),
            assignment: match m.assignment() {
                Some(assignment_bytes) => {
                    match ConsumerProtocolAssignment::try_from(assignment_bytes) {
                        Ok(cpa) => cpa
                            .assigned_topic_partitions
                            .into_iter()
                            .flat_map(|tps| {
                                let topic = tps.topic;
                                tps.partitions
                                    .into_iter()
                                    .map(move |p| TopicPartition::new(topic.clone(), p as u32))
                            })
                            .collect(),
                        Err(e) => {
                            warn!("Unable to parse 'assignment' bytes of Group '{group}': {e}");
                            Default::default()
                        },
                    }
                },
                None => Default::default(),
            },
        })
        .collect();

    GroupMembers {
        name: group.to_string(),
        state: gi.state().to_string(),
        members,
    }
}

#[async_trait]
impl BrokerClient for RdKafkaBrokerClient {
    async fn list_topics_and_partitions(&self) -> BrokerResult<TopicPartitionSet> {
        let admin_client = self.admin_client.clone();
        let timeout = self.fetch_timeout;

        run_blocking(move || {
            let metadata = admin_client
                .inner()
                .fetch_metadata(None, timeout)
                .map_err(|e| BrokerError::Metadata(e.to_string()))?;

            let mut res = TopicPartitionSet::new();
            for mt in metadata.topics() {
                // Ignore `__consumer_offsets` topic
                if mt.name() == KONSUMER_OFFSETS_DATA_TOPIC {
                    continue;
                }
                if let Some(err) = mt.error() {
                    return Err(BrokerError::Metadata(format!("topic '{}': {err:?}", mt.name())));
                }

                res.insert(
                    mt.name().to_string(),
                    mt.partitions().iter().map(|p| p.id() as u32).collect(),
                );
            }

            trace!("Fetched metadata of {} topics", res.len());
            Ok(res)
        })
        .await
    }

    async fn describe_consumer_group(&self, group: &str) -> BrokerResult<GroupMembers> {
        let admin_client = self.admin_client.clone();
        let timeout = self.fetch_timeout;
        let group = group.to_string();

        run_blocking(move || {
            let group_list = admin_client
                .inner()
                .fetch_group_list(Some(group.as_str()), timeout)
                .map_err(|e| BrokerError::DescribeGroup(group.clone(), e.to_string()))?;

            Ok(match group_list.groups().iter().find(|g| g.name() == group) {
                Some(gi) => group_members_from(&group, gi),
                None => GroupMembers {
                    name: group.clone(),
                    state: UNKNOWN_GROUP_STATE.to_string(),
                    members: Vec::new(),
                },
            })
        })
        .await
    }

    async fn fetch_committed_offsets(
        &self,
        group: &str,
        tps: &TopicPartitionSet,
    ) -> BrokerResult<OffsetMap> {
        let consumer = self.group_consumer(group)?;
        let timeout = self.fetch_timeout;
        let group = group.to_string();
        let tps = tps.clone();

        run_blocking(move || {
            let mut tpl = TopicPartitionList::new();
            for (t, partitions) in tps.iter() {
                for p in partitions {
                    tpl.add_partition(t, *p as i32);
                }
            }

            let committed = consumer
                .committed_offsets(tpl, timeout)
                .map_err(|e| BrokerError::CommittedOffsets(group.clone(), e.to_string()))?;

            let mut res = OffsetMap::new();
            for elem in committed.elements() {
                if let Err(e) = elem.error() {
                    return Err(BrokerError::CommittedOffsets(
                        group.clone(),
                        format!("partition '{}:{}': {e}", elem.topic(), elem.partition()),
                    ));
                }

                let offset = match elem.offset() {
                    KafkaOffset::Offset(o) => Offset::from_raw(o),
                    _ => Offset::Unknown,
                };
                res.entry(elem.topic().to_string())
                    .or_insert_with(BTreeMap::new)
                    .insert(elem.partition() as u32, offset);
            }

            Ok(res)
        })
        .await
    }

    async fn fetch_offset_bounds(&self, tps: &TopicPartitionSet) -> BrokerResult<OffsetBounds> {
        let admin_client = self.admin_client.clone();
        let timeout = self.fetch_timeout;
        let tps = tps.clone();

        run_blocking(move || {
            let mut res = OffsetBounds::default();

            for (t, partitions) in tps.iter() {
                trace!("Fetching earliest/latest offset for Partitions of Topic '{t}'");

                for p in partitions {
                    let (earliest, latest) = admin_client
                        .inner()
                        .fetch_watermarks(t, *p as i32, timeout)
                        .map_err(|e| BrokerError::OffsetBounds(t.clone(), *p, e.to_string()))?;

                    res.earliest.entry(t.clone()).or_default().insert(*p, Offset::from_raw(earliest));
                    res.latest.entry(t.clone()).or_default().insert(*p, Offset::from_raw(latest));
                }
            }

            Ok(res)
        })
        .await
    }
}
