// Inner modules
mod aggregator;
mod errors;
mod fetcher;
mod resolver;
#[cfg(test)]
pub(crate) mod testing;
mod tracker;

// Exports
pub use aggregator::{compute_partition_lag, compute_total_lag, PartitionLag, TotalLag};
pub use errors::{LagError, LagResult};
pub use fetcher::{fetch_consumer_offsets, fetch_offsets, fetch_producer_offsets, FetchedOffsets};
pub use resolver::resolve_topic_partitions;
pub use tracker::PersistentLagTracker;
