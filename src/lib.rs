//! Turns the offset lag of a Kafka Consumer Group into a bounded autoscaling signal.
//!
//! Every polling cycle:
//!
//! 1. the Topic Partitions to consider are resolved (configured, or discovered via the Consumer Group)
//! 2. committed and latest offsets are fetched concurrently
//! 3. per-partition lag is computed, excluding persistent lag if configured
//! 4. the total lag is capped, and turned into a metric value plus an activation flag
//!
//! See [`scaler::KafkaLagScaler`] for the entry point.

#[macro_use]
extern crate log;

pub mod broker;
#[cfg(unix)]
pub mod cli;
mod constants;
pub mod internals;
pub mod kafka_types;
pub mod lag;
pub mod logging;
pub mod prometheus_metrics;
pub mod scaler;
pub mod scaling_metadata;
