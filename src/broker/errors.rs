use thiserror::Error;

/// Possible errors talking to the Kafka cluster.
///
/// The message of the underlying client error is carried verbatim.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BrokerError {
    #[error("Failed to allocate Kafka client: {0}")]
    ClientCreation(String),

    #[error("Failed to fetch cluster metadata: {0}")]
    Metadata(String),

    #[error("Failed to describe consumer group '{0}': {1}")]
    DescribeGroup(String, String),

    #[error("Failed to fetch committed offsets of consumer group '{0}': {1}")]
    CommittedOffsets(String, String),

    #[error("Failed to fetch partition '{0}:{1}' begin/end offsets: {2}")]
    OffsetBounds(String, u32, String),

    #[error("Blocking fetch task failed: {0}")]
    TaskJoin(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
