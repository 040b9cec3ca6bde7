use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::{sync::Mutex, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerClient;
use crate::lag::{
    compute_total_lag, fetch_offsets, resolve_topic_partitions, LagError, LagResult,
    PersistentLagTracker, TotalLag,
};
use crate::scaling_metadata::ScalingMetadata;

const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters not allowed in a metric name: each is replaced with `-`.
const METRIC_NAME_INVALID_CHARS: &str = r"[^A-Za-z0-9_,\-]";

/// External metric the upstream autoscaler should scale on.
///
/// Desired replicas are computed upstream as `metric value / target_average_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub metric_name: String,
    pub target_average_value: i64,
}

/// Outcome of one polling cycle: the metric value to scale on, and whether scaling is active at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingSignal {
    pub metric_name: String,

    /// Total lag (possibly capped, possibly excluding persistent lag)
    pub metric_value: f64,

    /// Is total lag (including persistent lag) above the activation threshold?
    pub is_active: bool,

    /// The [`TotalLag`] the signal was derived from
    pub lag: TotalLag,

    /// [`DateTime<Utc>`] when the signal was computed
    pub read_datetime: DateTime<Utc>,
}

impl ScalingSignal {
    /// Metric value expressed in milli-units, as external metrics are served.
    pub fn metric_milli_value(&self) -> i64 {
        (self.metric_value * 1000.0) as i64
    }
}

/// Turns the offset lag of a Consumer Group into a [`ScalingSignal`].
///
/// Owns the [`PersistentLagTracker`] of the scaler: it lives and dies with this object.
/// The tracker lock is held for the whole cycle, so concurrent invocations are serialized.
pub struct KafkaLagScaler {
    metadata: ScalingMetadata,
    client: Arc<dyn BrokerClient>,
    tracker: Mutex<PersistentLagTracker>,
    cycle_timeout: Duration,
    metric_name: String,
}

impl KafkaLagScaler {
    /// Create a new [`KafkaLagScaler`]
    ///
    /// # Arguments
    ///
    /// * `metadata` - Validated scaler configuration
    /// * `client` - Source of cluster metadata and offsets
    pub fn new(metadata: ScalingMetadata, client: Arc<dyn BrokerClient>) -> Self {
        let metric_name = build_metric_name(&metadata);

        Self {
            metadata,
            client,
            tracker: Mutex::new(PersistentLagTracker::new()),
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            metric_name,
        }
    }

    /// Upper bound to the duration of a single polling cycle.
    pub fn with_cycle_timeout(mut self, cycle_timeout: Duration) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    pub fn metadata(&self) -> &ScalingMetadata {
        &self.metadata
    }

    pub fn get_metric_spec(&self) -> MetricSpec {
        MetricSpec {
            metric_name: self.metric_name.clone(),
            target_average_value: self.metadata.lag_threshold(),
        }
    }

    /// Compute the current [`TotalLag`] of the Consumer Group.
    ///
    /// Fails with [`LagError::Timeout`] if the cycle takes longer than the configured timeout,
    /// or with [`LagError::Cancelled`] if `shutdown_token` is cancelled first.
    pub async fn get_total_lag(&self, shutdown_token: &CancellationToken) -> LagResult<TotalLag> {
        tokio::select! {
            res = tokio::time::timeout(self.cycle_timeout, self.compute_total_lag()) => {
                res.map_err(|_| LagError::Timeout(self.cycle_timeout))?
            },
            _ = shutdown_token.cancelled() => {
                Err(LagError::Cancelled)
            },
        }
    }

    /// Compute the [`ScalingSignal`] for the upstream autoscaler.
    ///
    /// The metric value is the total lag. Activation instead looks at the total lag
    /// _including_ persistent lag: a stuck partition with real backlog still activates scaling.
    pub async fn get_metrics_and_activity(
        &self,
        shutdown_token: &CancellationToken,
    ) -> LagResult<ScalingSignal> {
        let lag = self.get_total_lag(shutdown_token).await?;

        Ok(ScalingSignal {
            metric_name: self.metric_name.clone(),
            metric_value: lag.total_lag as f64,
            is_active: lag.total_lag_with_persistent > self.metadata.activation_lag_threshold(),
            lag,
            read_datetime: Utc::now(),
        })
    }

    async fn compute_total_lag(&self) -> LagResult<TotalLag> {
        let mut tracker = self.tracker.lock().await;

        let tps = resolve_topic_partitions(self.client.as_ref(), &self.metadata).await?;
        trace!("Computing lag of group '{}' on {:?}", self.metadata.consumer_group(), tps);

        let offsets = fetch_offsets(self.client.clone(), self.metadata.consumer_group(), &tps).await?;

        compute_total_lag(&offsets.consumer, &offsets.producer.latest, &self.metadata, &mut tracker)
    }
}

/// Name of the external metric: `s{trigger index}-kafka-{topics, or consumer group}`.
fn build_metric_name(metadata: &ScalingMetadata) -> String {
    let subject = if metadata.topics().is_empty() {
        metadata.consumer_group().to_string()
    } else {
        metadata.topics().iter().cloned().collect::<Vec<String>>().join(",")
    };

    let invalid_chars = Regex::new(METRIC_NAME_INVALID_CHARS)
        .unwrap_or_else(|e| panic!("Invalid metric name regex - this should never happen: {e}"));

    format!(
        "s{}-{}",
        metadata.trigger_index(),
        invalid_chars.replace_all(&format!("kafka-{subject}"), "-")
    )
}
