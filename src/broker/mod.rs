// Inner modules
mod errors;
#[cfg(unix)]
mod rdkafka_client;

use async_trait::async_trait;

use crate::kafka_types::{GroupMembers, OffsetBounds, OffsetMap, TopicPartitionSet};

// Exports
pub use errors::{BrokerError, BrokerResult};
#[cfg(unix)]
pub use rdkafka_client::RdKafkaBrokerClient;

/// Metadata and offsets source for a Kafka cluster.
///
/// All the data used to compute Consumer Group lag comes through here:
/// implementations are expected to be plain request/response wrappers,
/// returning errors from the underlying client verbatim.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// All the (non internal) Topics in the cluster, with their Partitions.
    async fn list_topics_and_partitions(&self) -> BrokerResult<TopicPartitionSet>;

    /// State and active Members of the given Consumer Group.
    async fn describe_consumer_group(&self, group: &str) -> BrokerResult<GroupMembers>;

    /// Offsets committed by the given Consumer Group, for the given Topic Partitions.
    ///
    /// Partitions without a committed offset are reported as [`crate::kafka_types::Offset::Unknown`].
    async fn fetch_committed_offsets(
        &self,
        group: &str,
        tps: &TopicPartitionSet,
    ) -> BrokerResult<OffsetMap>;

    /// Earliest and latest (high watermark) offsets of the given Topic Partitions.
    async fn fetch_offset_bounds(&self, tps: &TopicPartitionSet) -> BrokerResult<OffsetBounds>;
}
