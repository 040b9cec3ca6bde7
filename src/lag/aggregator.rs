use super::errors::{LagError, LagResult};
use super::tracker::PersistentLagTracker;
use crate::kafka_types::{Offset, OffsetMap};
use crate::scaling_metadata::{OffsetResetPolicy, ScalingMetadata};

/// Lag of a single Topic Partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionLag {
    /// Lag to scale on: `0` when the lag is persistent and persistent lag is excluded.
    pub lag: i64,

    /// Lag including persistent lag.
    pub lag_with_persistent: i64,
}

impl PartitionLag {
    fn same(lag: i64) -> Self {
        Self {
            lag,
            lag_with_persistent: lag,
        }
    }
}

/// Lag of a Consumer Group, across all the Topic Partitions it is computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalLag {
    /// Total lag, capped (when configured) so that it never asks for more consumers than partitions.
    pub total_lag: i64,

    /// Total lag including persistent lag. Never capped.
    pub total_lag_with_persistent: i64,

    /// Number of Topic Partitions the lag was computed on.
    pub partitions: i64,

    /// Number of Topic Partitions with lag greater than `0`.
    pub partitions_with_lag: i64,
}

/// Compute the lag of a single Topic Partition.
///
/// A partition missing from `consumer_offsets` is treated as having no committed offset.
/// A topic missing entirely from either map is an error.
///
/// # Arguments
///
/// * `topic` - Topic of the Partition
/// * `partition` - Partition to compute the lag of
/// * `consumer_offsets` - Offsets committed by the Consumer Group
/// * `producer_offsets` - Latest (high watermark) offsets
/// * `metadata` - Scaler configuration
/// * `tracker` - Persistent lag state, consulted (and updated) only when persistent lag is excluded
pub fn compute_partition_lag(
    topic: &str,
    partition: u32,
    consumer_offsets: &OffsetMap,
    producer_offsets: &OffsetMap,
    metadata: &ScalingMetadata,
    tracker: &mut PersistentLagTracker,
) -> LagResult<PartitionLag> {
    let consumer_partitions =
        consumer_offsets.get(topic).ok_or_else(|| LagError::TopicMissingFromOffsets {
            topic: topic.to_string(),
            source_name: "consumer",
        })?;
    let producer_partitions =
        producer_offsets.get(topic).ok_or_else(|| LagError::TopicMissingFromOffsets {
            topic: topic.to_string(),
            source_name: "producer",
        })?;

    let consumer_offset = consumer_partitions.get(&partition).copied().unwrap_or_default();
    let producer_offset =
        producer_partitions.get(&partition).and_then(Offset::known).unwrap_or_default();

    let consumer_offset = match consumer_offset {
        Offset::Known(o) => o,
        Offset::Unknown => {
            return Ok(match metadata.offset_reset_policy() {
                OffsetResetPolicy::Latest => {
                    let lag = if metadata.scale_to_zero_on_invalid_offset() {
                        0
                    } else {
                        1
                    };
                    debug!(
                        "Invalid offset found for '{topic}:{partition}' in group '{}': using {lag} for lag, as 'latest' reset policy is set",
                        metadata.consumer_group()
                    );
                    PartitionLag::same(lag)
                },
                OffsetResetPolicy::Earliest => {
                    debug!(
                        "Invalid offset found for '{topic}:{partition}' in group '{}': using latest offset {producer_offset} for lag, as 'earliest' reset policy is set",
                        metadata.consumer_group()
                    );
                    PartitionLag::same(producer_offset)
                },
            });
        },
    };

    let lag = producer_offset - consumer_offset;

    if metadata.exclude_persistent_lag() && tracker.observe(topic, partition, consumer_offset) {
        return Ok(PartitionLag {
            lag: 0,
            lag_with_persistent: lag,
        });
    }

    Ok(PartitionLag::same(lag))
}

/// Compute the [`TotalLag`] of a Consumer Group.
///
/// Iterates over the Topic Partitions in `producer_offsets`: every partition has a latest offset,
/// while a Consumer Group might have never committed on some.
///
/// Unless idle consumers are allowed, `total_lag` is capped to `upper_bound * lag_threshold`,
/// with `upper_bound` being the number of partitions (or, with `limit_to_partitions_with_lag`,
/// the number of partitions with lag). Consumers beyond the number of partitions would be idle.
///
/// `tracker` is updated only if the lag of every partition is computed: a failed cycle
/// leaves no baseline behind.
pub fn compute_total_lag(
    consumer_offsets: &OffsetMap,
    producer_offsets: &OffsetMap,
    metadata: &ScalingMetadata,
    tracker: &mut PersistentLagTracker,
) -> LagResult<TotalLag> {
    let mut res = TotalLag::default();
    let mut cycle_tracker = tracker.clone();

    for (topic, partitions) in producer_offsets.iter() {
        for partition in partitions.keys() {
            let pl = compute_partition_lag(
                topic,
                *partition,
                consumer_offsets,
                producer_offsets,
                metadata,
                &mut cycle_tracker,
            )?;

            res.total_lag += pl.lag;
            res.total_lag_with_persistent += pl.lag_with_persistent;
            if pl.lag > 0 {
                res.partitions_with_lag += 1;
            }
        }
        res.partitions += partitions.len() as i64;
    }
    *tracker = cycle_tracker;

    debug!(
        "Group '{}': total lag {}, total lag with persistent {}, over {} partitions ({} with lag)",
        metadata.consumer_group(),
        res.total_lag,
        res.total_lag_with_persistent,
        res.partitions,
        res.partitions_with_lag
    );

    if !metadata.allow_idle_consumers() || metadata.limit_to_partitions_with_lag() {
        let upper_bound = if metadata.limit_to_partitions_with_lag() {
            res.partitions_with_lag
        } else {
            res.partitions
        };

        if res.total_lag / metadata.lag_threshold() > upper_bound {
            let capped = upper_bound * metadata.lag_threshold();
            debug!(
                "Capping total lag {} to {capped}: no more than {upper_bound} consumers can be busy",
                res.total_lag
            );
            res.total_lag = capped;
        }
    }

    Ok(res)
}
