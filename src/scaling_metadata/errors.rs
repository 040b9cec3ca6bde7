use thiserror::Error;

/// Possible errors building a [`super::ScalingMetadata`].
///
/// These are all fatal: they are surfaced at construction time, never per polling cycle.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum ScalingMetadataError {
    #[error("Bootstrap servers must be set")]
    MissingBootstrapServers,

    #[error("Consumer group must be set")]
    MissingConsumerGroup,

    #[error("Lag threshold must be set")]
    MissingLagThreshold,

    #[error("Lag threshold must be a positive number, got {0}")]
    LagThresholdNotPositive(i64),

    #[error("Activation lag threshold must be a non-negative number, got {0}")]
    ActivationLagThresholdNegative(i64),

    #[error("Offset reset policy '{0}' not supported: must be 'earliest' or 'latest'")]
    UnsupportedOffsetResetPolicy(String),

    #[error("Partition limitation '{0}' is not a valid list of partitions or ranges")]
    InvalidPartitionLimitation(String),

    #[error("'allowIdleConsumers' and 'limitToPartitionsWithLag' cannot be set simultaneously")]
    IdleConsumersWithPartitionsWithLag,

    #[error("A topic must be specified when using 'limitToPartitionsWithLag'")]
    PartitionsWithLagWithoutTopic,
}

pub type ScalingMetadataResult<T> = Result<T, ScalingMetadataError>;
