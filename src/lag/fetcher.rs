use std::sync::Arc;

use tokio::task::JoinHandle;

use super::errors::LagResult;
use crate::broker::{BrokerClient, BrokerError, BrokerResult};
use crate::kafka_types::{OffsetBounds, OffsetMap, TopicPartitionSet};

/// Consumer (committed) and producer (earliest/latest) offsets, read during the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedOffsets {
    pub consumer: OffsetMap,
    pub producer: OffsetBounds,
}

/// Fetch the offsets committed by `group` for the given Topic Partitions.
pub fn fetch_consumer_offsets(
    client: Arc<dyn BrokerClient>,
    group: &str,
    tps: &TopicPartitionSet,
) -> JoinHandle<BrokerResult<OffsetMap>> {
    let group = group.to_string();
    let tps = tps.clone();

    tokio::spawn(async move { client.fetch_committed_offsets(&group, &tps).await })
}

/// Fetch earliest and latest (high watermark) offsets for the given Topic Partitions.
pub fn fetch_producer_offsets(
    client: Arc<dyn BrokerClient>,
    tps: &TopicPartitionSet,
) -> JoinHandle<BrokerResult<OffsetBounds>> {
    let tps = tps.clone();

    tokio::spawn(async move { client.fetch_offset_bounds(&tps).await })
}

/// Fetch consumer and producer offsets concurrently, as two independent tasks.
///
/// Both requests are issued before either is awaited. The first error received is returned
/// right away: the other task is left to finish in the background, and its result discarded.
pub async fn fetch_offsets(
    client: Arc<dyn BrokerClient>,
    group: &str,
    tps: &TopicPartitionSet,
) -> LagResult<FetchedOffsets> {
    let consumer_task = fetch_consumer_offsets(client.clone(), group, tps);
    let producer_task = fetch_producer_offsets(client, tps);

    let (consumer, producer) = tokio::try_join!(joined(consumer_task), joined(producer_task))?;

    Ok(FetchedOffsets {
        consumer,
        producer,
    })
}

async fn joined<T>(handle: JoinHandle<BrokerResult<T>>) -> LagResult<T> {
    Ok(handle.await.map_err(|e| BrokerError::TaskJoin(e.to_string()))??)
}

#[cfg(test)]
mod test {
    use std::sync::atomic::Ordering;

    use tokio::time::{Duration, Instant};

    use super::*;
    use crate::kafka_types::Offset;
    use crate::lag::testing::{tps, StaticBrokerClient};
    use crate::lag::LagError;

    #[tokio::test]
    async fn fetch_both_offsets() {
        let client = Arc::new(
            StaticBrokerClient::new()
                .with_topic("orders", 2)
                .with_committed("orders", &[Some(5), None])
                .with_latest("orders", &[10, 20]),
        );

        let res = fetch_offsets(client.clone(), "g", &tps(&[("orders", &[0, 1])])).await.unwrap();

        assert_eq!(res.consumer["orders"][&0], Offset::Known(5));
        assert_eq!(res.consumer["orders"][&1], Offset::Unknown);
        assert_eq!(res.producer.latest["orders"][&0], Offset::Known(10));
        assert_eq!(res.producer.latest["orders"][&1], Offset::Known(20));
        assert_eq!(res.producer.earliest["orders"][&1], Offset::Known(0));
        assert_eq!(client.committed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.bounds_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fetches_run_concurrently() {
        let client = Arc::new(
            StaticBrokerClient::new()
                .with_topic("orders", 1)
                .with_committed("orders", &[Some(1)])
                .with_latest("orders", &[2])
                .with_committed_delay(Duration::from_millis(300))
                .with_bounds_delay(Duration::from_millis(300)),
        );

        let start = Instant::now();
        fetch_offsets(client, "g", &tps(&[("orders", &[0])])).await.unwrap();

        // Sequential fetches would take at least 600ms
        assert!(start.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn first_error_is_returned_without_waiting_for_the_other() {
        let client = Arc::new(
            StaticBrokerClient::new()
                .with_topic("orders", 1)
                .with_latest("orders", &[2])
                .with_bounds_delay(Duration::from_secs(5)),
        );
        client.fail_committed_with(BrokerError::CommittedOffsets(
            "g".to_string(),
            "Coordinator not available".to_string(),
        ));

        let start = Instant::now();
        let res = fetch_offsets(client, "g", &tps(&[("orders", &[0])])).await;

        assert_eq!(
            res,
            Err(LagError::Broker(BrokerError::CommittedOffsets(
                "g".to_string(),
                "Coordinator not available".to_string()
            )))
        );
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn producer_error_aborts() {
        let client = Arc::new(
            StaticBrokerClient::new().with_topic("orders", 1).with_committed("orders", &[Some(1)]),
        );
        let err = BrokerError::OffsetBounds("orders".to_string(), 0, "Leader not available".to_string());
        client.fail_bounds_with(err.clone());

        let res = fetch_offsets(client, "g", &tps(&[("orders", &[0])])).await;

        assert_eq!(res, Err(LagError::Broker(err)));
    }
}
