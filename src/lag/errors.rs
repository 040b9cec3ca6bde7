use thiserror::Error;
use tokio::time::Duration;

use crate::broker::BrokerError;

/// Possible errors computing the lag of a Consumer Group.
///
/// Any of these aborts the current polling cycle: no partial lag is ever reported.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum LagError {
    /// No topic is configured, and the Consumer Group has no Members to discover topics from.
    #[error("No active members in group '{group}', group-state is '{state}'")]
    NoActiveMembers {
        group: String,
        state: String,
    },

    /// The partition limitation excludes every partition of a configured topic.
    #[error("Expected at least one active partition within the topic '{0}'")]
    NoActivePartitions(String),

    /// A topic is present in one offsets map, but missing from the other.
    #[error("Topic '{topic}' not found in {source_name} offsets")]
    TopicMissingFromOffsets {
        topic: String,
        source_name: &'static str,
    },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Lag computation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lag computation cancelled")]
    Cancelled,
}

pub type LagResult<T> = Result<T, LagError>;
