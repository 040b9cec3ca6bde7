use std::collections::BTreeSet;

use super::errors::{LagError, LagResult};
use crate::broker::BrokerClient;
use crate::kafka_types::TopicPartitionSet;
use crate::scaling_metadata::ScalingMetadata;

/// Resolve the Topic Partitions that the lag of the Consumer Group of `metadata` is computed on.
///
/// If topics are configured, those topics are taken from the ones known to the cluster.
/// Otherwise, the Consumer Group is required to have active Members, and every topic known to the
/// cluster is taken: topics are not narrowed down to the ones assigned to the Members.
///
/// In both cases, only partitions passing [`ScalingMetadata::is_active_partition`] are kept.
///
/// # Arguments
///
/// * `client` - Source of cluster metadata
/// * `metadata` - Scaler configuration
pub async fn resolve_topic_partitions(
    client: &dyn BrokerClient,
    metadata: &ScalingMetadata,
) -> LagResult<TopicPartitionSet> {
    let configured_topics = metadata.topics();
    if configured_topics.is_empty() {
        return discover_topic_partitions(client, metadata).await;
    }

    let known = client.list_topics_and_partitions().await?;

    let mut res = TopicPartitionSet::new();
    for (topic, partitions) in known.into_iter() {
        if !configured_topics.contains(&topic) {
            continue;
        }

        let active = active_partitions(partitions, metadata);
        if active.is_empty() {
            return Err(LagError::NoActivePartitions(topic));
        }
        res.insert(topic, active);
    }

    for missing in configured_topics.iter().filter(|t| !res.contains_key(*t)) {
        warn!("Topic '{missing}' not found in cluster: not considered for lag");
    }

    Ok(res)
}

async fn discover_topic_partitions(
    client: &dyn BrokerClient,
    metadata: &ScalingMetadata,
) -> LagResult<TopicPartitionSet> {
    let consumer_group = metadata.consumer_group();
    let group = client.describe_consumer_group(consumer_group).await?;
    if group.member_count() == 0 {
        return Err(LagError::NoActiveMembers {
            group: consumer_group.to_string(),
            state: group.state,
        });
    }

    let known = client.list_topics_and_partitions().await?;

    if log_enabled!(log::Level::Debug) {
        let assigned = group.assigned_topics();
        let unassigned =
            known.keys().filter(|t| !assigned.contains(*t)).cloned().collect::<Vec<String>>();
        if !unassigned.is_empty() {
            debug!(
                "Group '{consumer_group}' has {} members, none assigned to topics {:?}: including them anyway",
                group.member_count(),
                unassigned
            );
        }
    }

    Ok(known
        .into_iter()
        .map(|(topic, partitions)| (topic, active_partitions(partitions, metadata)))
        .filter(|(_, partitions)| !partitions.is_empty())
        .collect())
}

fn active_partitions(partitions: BTreeSet<u32>, metadata: &ScalingMetadata) -> BTreeSet<u32> {
    partitions.into_iter().filter(|p| metadata.is_active_partition(*p)).collect()
}
