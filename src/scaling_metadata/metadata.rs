use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::errors::{ScalingMetadataError, ScalingMetadataResult};

/// Where a Consumer starts from, when it has no committed offset for a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetResetPolicy {
    Earliest,
    #[default]
    Latest,
}

impl FromStr for OffsetResetPolicy {
    type Err = ScalingMetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(OffsetResetPolicy::Earliest),
            "latest" => Ok(OffsetResetPolicy::Latest),
            other => Err(ScalingMetadataError::UnsupportedOffsetResetPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OffsetResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetResetPolicy::Earliest => write!(f, "earliest"),
            OffsetResetPolicy::Latest => write!(f, "latest"),
        }
    }
}

/// Immutable configuration of a single Kafka lag scaler.
///
/// Can only be created via [`ScalingMetadataBuilder::build`], that validates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingMetadata {
    bootstrap_servers: String,
    consumer_group: String,
    topics: BTreeSet<String>,
    partition_limitation: BTreeSet<u32>,
    lag_threshold: i64,
    activation_lag_threshold: i64,
    offset_reset_policy: OffsetResetPolicy,
    allow_idle_consumers: bool,
    exclude_persistent_lag: bool,
    scale_to_zero_on_invalid_offset: bool,
    limit_to_partitions_with_lag: bool,
    trigger_index: usize,
}

impl ScalingMetadata {
    pub fn builder() -> ScalingMetadataBuilder {
        ScalingMetadataBuilder::default()
    }

    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    /// Topics to scale on. Empty means "discover from the Consumer Group".
    pub fn topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    pub fn lag_threshold(&self) -> i64 {
        self.lag_threshold
    }

    pub fn activation_lag_threshold(&self) -> i64 {
        self.activation_lag_threshold
    }

    pub fn offset_reset_policy(&self) -> OffsetResetPolicy {
        self.offset_reset_policy
    }

    pub fn allow_idle_consumers(&self) -> bool {
        self.allow_idle_consumers
    }

    pub fn exclude_persistent_lag(&self) -> bool {
        self.exclude_persistent_lag
    }

    pub fn scale_to_zero_on_invalid_offset(&self) -> bool {
        self.scale_to_zero_on_invalid_offset
    }

    pub fn limit_to_partitions_with_lag(&self) -> bool {
        self.limit_to_partitions_with_lag
    }

    pub fn trigger_index(&self) -> usize {
        self.trigger_index
    }

    /// Is `partition` allowed by the partition limitation? All partitions are, if it's empty.
    pub fn is_active_partition(&self, partition: u32) -> bool {
        self.partition_limitation.is_empty() || self.partition_limitation.contains(&partition)
    }
}

/// Builder for [`ScalingMetadata`].
///
/// Defaults follow the upstream autoscaler: activation threshold `0`, `latest` reset policy
/// and all flags off. The lag threshold has no default and must be set.
#[derive(Debug, Clone, Default)]
pub struct ScalingMetadataBuilder {
    bootstrap_servers: String,
    consumer_group: String,
    topics: BTreeSet<String>,
    partition_limitation: BTreeSet<u32>,
    lag_threshold: Option<i64>,
    activation_lag_threshold: i64,
    offset_reset_policy: OffsetResetPolicy,
    allow_idle_consumers: bool,
    exclude_persistent_lag: bool,
    scale_to_zero_on_invalid_offset: bool,
    limit_to_partitions_with_lag: bool,
    trigger_index: usize,
}

impl ScalingMetadataBuilder {
    pub fn bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = servers.into();
        self
    }

    pub fn consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    /// Topics to scale on. Blank names are dropped.
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn partition_limitation(mut self, partitions: impl IntoIterator<Item = u32>) -> Self {
        self.partition_limitation = partitions.into_iter().collect();
        self
    }

    pub fn lag_threshold(mut self, threshold: i64) -> Self {
        self.lag_threshold = Some(threshold);
        self
    }

    pub fn activation_lag_threshold(mut self, threshold: i64) -> Self {
        self.activation_lag_threshold = threshold;
        self
    }

    pub fn offset_reset_policy(mut self, policy: OffsetResetPolicy) -> Self {
        self.offset_reset_policy = policy;
        self
    }

    pub fn allow_idle_consumers(mut self, allow: bool) -> Self {
        self.allow_idle_consumers = allow;
        self
    }

    pub fn exclude_persistent_lag(mut self, exclude: bool) -> Self {
        self.exclude_persistent_lag = exclude;
        self
    }

    pub fn scale_to_zero_on_invalid_offset(mut self, scale_to_zero: bool) -> Self {
        self.scale_to_zero_on_invalid_offset = scale_to_zero;
        self
    }

    pub fn limit_to_partitions_with_lag(mut self, limit: bool) -> Self {
        self.limit_to_partitions_with_lag = limit;
        self
    }

    pub fn trigger_index(mut self, index: usize) -> Self {
        self.trigger_index = index;
        self
    }

    /// Validate and build the [`ScalingMetadata`].
    pub fn build(self) -> ScalingMetadataResult<ScalingMetadata> {
        if self.bootstrap_servers.trim().is_empty() {
            return Err(ScalingMetadataError::MissingBootstrapServers);
        }
        if self.consumer_group.trim().is_empty() {
            return Err(ScalingMetadataError::MissingConsumerGroup);
        }

        let lag_threshold = self.lag_threshold.ok_or(ScalingMetadataError::MissingLagThreshold)?;
        if lag_threshold <= 0 {
            return Err(ScalingMetadataError::LagThresholdNotPositive(lag_threshold));
        }
        if self.activation_lag_threshold < 0 {
            return Err(ScalingMetadataError::ActivationLagThresholdNegative(
                self.activation_lag_threshold,
            ));
        }

        if self.allow_idle_consumers && self.limit_to_partitions_with_lag {
            return Err(ScalingMetadataError::IdleConsumersWithPartitionsWithLag);
        }
        if self.limit_to_partitions_with_lag && self.topics.is_empty() {
            return Err(ScalingMetadataError::PartitionsWithLagWithoutTopic);
        }

        // Partitions are only meaningful relative to explicitly configured topics
        let mut partition_limitation = self.partition_limitation;
        if self.topics.is_empty() && !partition_limitation.is_empty() {
            warn!("No specific topic set: ignoring partition limitation {:?}", partition_limitation);
            partition_limitation.clear();
        }

        Ok(ScalingMetadata {
            bootstrap_servers: self.bootstrap_servers,
            consumer_group: self.consumer_group,
            topics: self.topics,
            partition_limitation,
            lag_threshold,
            activation_lag_threshold: self.activation_lag_threshold,
            offset_reset_policy: self.offset_reset_policy,
            allow_idle_consumers: self.allow_idle_consumers,
            exclude_persistent_lag: self.exclude_persistent_lag,
            scale_to_zero_on_invalid_offset: self.scale_to_zero_on_invalid_offset,
            limit_to_partitions_with_lag: self.limit_to_partitions_with_lag,
            trigger_index: self.trigger_index,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base() -> ScalingMetadataBuilder {
        ScalingMetadata::builder()
            .bootstrap_servers("localhost:9092")
            .consumer_group("my-group")
            .lag_threshold(10)
    }

    #[test]
    fn defaults() {
        let meta = base().build().unwrap();

        assert_eq!(meta.lag_threshold(), 10);
        assert_eq!(meta.activation_lag_threshold(), 0);
        assert_eq!(meta.offset_reset_policy(), OffsetResetPolicy::Latest);
        assert!(meta.topics().is_empty());
        assert!(meta.is_active_partition(0));
        assert!(meta.is_active_partition(u32::MAX));
        assert!(!meta.allow_idle_consumers());
        assert!(!meta.exclude_persistent_lag());
        assert!(!meta.scale_to_zero_on_invalid_offset());
        assert!(!meta.limit_to_partitions_with_lag());
    }

    #[test]
    fn idle_consumers_and_partitions_with_lag_are_mutually_exclusive() {
        let res = base()
            .topics(["orders"])
            .allow_idle_consumers(true)
            .limit_to_partitions_with_lag(true)
            .build();

        assert_eq!(res, Err(ScalingMetadataError::IdleConsumersWithPartitionsWithLag));
    }

    #[test]
    fn partitions_with_lag_requires_topic() {
        assert_eq!(
            base().limit_to_partitions_with_lag(true).build(),
            Err(ScalingMetadataError::PartitionsWithLagWithoutTopic)
        );
        assert!(base().topics(["orders"]).limit_to_partitions_with_lag(true).build().is_ok());
    }

    #[test]
    fn thresholds_are_validated() {
        let no_threshold = ScalingMetadata::builder()
            .bootstrap_servers("localhost:9092")
            .consumer_group("my-group")
            .build();
        assert_eq!(no_threshold, Err(ScalingMetadataError::MissingLagThreshold));

        assert_eq!(base().lag_threshold(0).build(), Err(ScalingMetadataError::LagThresholdNotPositive(0)));
        assert_eq!(
            base().activation_lag_threshold(-1).build(),
            Err(ScalingMetadataError::ActivationLagThresholdNegative(-1))
        );
    }

    #[test]
    fn servers_and_group_are_required() {
        assert_eq!(
            base().bootstrap_servers(" ").build(),
            Err(ScalingMetadataError::MissingBootstrapServers)
        );
        assert_eq!(base().consumer_group("").build(), Err(ScalingMetadataError::MissingConsumerGroup));
    }

    #[test]
    fn partition_limitation_ignored_without_topics() {
        let meta = base().partition_limitation([1, 2]).build().unwrap();
        assert!(meta.is_active_partition(7));

        let meta = base().topics(["orders"]).partition_limitation([1, 2]).build().unwrap();
        assert!(meta.is_active_partition(1));
        assert!(!meta.is_active_partition(7));
    }

    #[test]
    fn blank_topics_are_dropped() {
        let meta = base().topics(["orders", " ", "payments "]).build().unwrap();
        assert_eq!(
            meta.topics(),
            &BTreeSet::from(["orders".to_string(), "payments".to_string()])
        );
    }

    #[test]
    fn parse_offset_reset_policy() {
        assert_eq!("earliest".parse(), Ok(OffsetResetPolicy::Earliest));
        assert_eq!("latest".parse(), Ok(OffsetResetPolicy::Latest));
        assert_eq!(
            "newest".parse::<OffsetResetPolicy>(),
            Err(ScalingMetadataError::UnsupportedOffsetResetPolicy("newest".to_string()))
        );
    }
}
