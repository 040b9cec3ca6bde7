use std::sync::Arc;

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, IntCounter, IntGauge, Registry,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::scaler::{KafkaLagScaler, ScalingSignal};
use crate::internals::Emitter;
use crate::lag::LagError;

const CHANNEL_SIZE: usize = 5;

const MET_CYCLE_NAME: &str = "scaler_cycle_time_seconds";
const MET_CYCLE_HELP: &str = "Time (s) taken to compute the scaling signal";
const MET_CYCLE_ERR_NAME: &str = "scaler_cycle_errors_total";
const MET_CYCLE_ERR_HELP: &str = "Polling cycles that failed to compute the scaling signal";
const MET_LAG_NAME: &str = "scaler_total_lag";
const MET_LAG_HELP: &str = "Total lag used as scaling metric value";
const MET_LAG_PERS_NAME: &str = "scaler_total_lag_with_persistent";
const MET_LAG_PERS_HELP: &str = "Total lag, including persistent lag";
const MET_ACTIVE_NAME: &str = "scaler_active";
const MET_ACTIVE_HELP: &str = "1 if the scaler is active (lag above activation threshold), 0 otherwise";

/// Emits [`ScalingSignal`] via a provided [`mpsc::channel`].
///
/// It wraps a [`KafkaLagScaler`], and polls it at regular intervals, standing in for
/// the polling loop of the upstream autoscaler.
///
/// It shuts down when the provided [`CancellationToken`] is cancelled.
pub struct ScalingSignalEmitter {
    scaler: Arc<KafkaLagScaler>,
    poll_interval: Duration,

    // Prometheus Metrics
    metric_cycle: Histogram,
    metric_cycle_err: IntCounter,
    metric_lag: IntGauge,
    metric_lag_pers: IntGauge,
    metric_active: IntGauge,
}

impl ScalingSignalEmitter {
    /// Create a new [`ScalingSignalEmitter`]
    ///
    /// # Arguments
    ///
    /// * `scaler` - Scaler polled for a new [`ScalingSignal`] every `poll_interval`
    /// * `poll_interval` - Interval between polling cycles
    /// * `metrics` - Registry for the metrics of this emitter
    pub fn new(scaler: Arc<KafkaLagScaler>, poll_interval: Duration, metrics: Arc<Registry>) -> Self {
        Self {
            scaler,
            poll_interval,
            metric_cycle: register_histogram_with_registry!(MET_CYCLE_NAME, MET_CYCLE_HELP, metrics)
                .unwrap_or_else(|e| panic!("Failed to create metric '{MET_CYCLE_NAME}': {e}")),
            metric_cycle_err: register_int_counter_with_registry!(
                MET_CYCLE_ERR_NAME,
                MET_CYCLE_ERR_HELP,
                metrics
            )
            .unwrap_or_else(|e| panic!("Failed to create metric '{MET_CYCLE_ERR_NAME}': {e}")),
            metric_lag: register_int_gauge_with_registry!(MET_LAG_NAME, MET_LAG_HELP, metrics)
                .unwrap_or_else(|e| panic!("Failed to create metric '{MET_LAG_NAME}': {e}")),
            metric_lag_pers: register_int_gauge_with_registry!(
                MET_LAG_PERS_NAME,
                MET_LAG_PERS_HELP,
                metrics
            )
            .unwrap_or_else(|e| panic!("Failed to create metric '{MET_LAG_PERS_NAME}': {e}")),
            metric_active: register_int_gauge_with_registry!(MET_ACTIVE_NAME, MET_ACTIVE_HELP, metrics)
                .unwrap_or_else(|e| panic!("Failed to create metric '{MET_ACTIVE_NAME}': {e}")),
        }
    }
}

impl Emitter for ScalingSignalEmitter {
    type Emitted = ScalingSignal;

    /// Spawn a new async task to run the business logic of this struct.
    ///
    /// When this emitter gets spawned, it returns a [`mpsc::Receiver`] for [`ScalingSignal`],
    /// and a [`JoinHandle`] to help join on the task spawned internally.
    /// The task concludes (joins) only ones the inner task of the emitter terminates.
    ///
    /// A failed polling cycle is logged and skipped: the next tick is a new attempt.
    ///
    /// # Arguments
    ///
    /// * `shutdown_token`: A [`CancellationToken`] that, when cancelled, will make the internal loop terminate.
    ///
    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>) {
        let (sx, rx) = mpsc::channel::<Self::Emitted>(CHANNEL_SIZE);

        // Clone what is needed inside the spawned future
        let scaler = self.scaler.clone();
        let poll_interval = self.poll_interval;
        let metric_cycle = self.metric_cycle.clone();
        let metric_cycle_err = self.metric_cycle_err.clone();
        let metric_lag = self.metric_lag.clone();
        let metric_lag_pers = self.metric_lag_pers.clone();
        let metric_active = self.metric_active.clone();

        let join_handle = tokio::spawn(async move {
            let mut interval = interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // Wait for next "tick", or get interrupted by shutdown
                tokio::select! {
                    _ = interval.tick() => {},
                    _ = shutdown_token.cancelled() => {
                        info!("Shutting down");
                        break;
                    },
                }

                let timer = metric_cycle.start_timer();
                let res_signal = scaler.get_metrics_and_activity(&shutdown_token).await;
                timer.observe_duration();

                match res_signal {
                    Ok(signal) => {
                        metric_lag.set(signal.lag.total_lag);
                        metric_lag_pers.set(signal.lag.total_lag_with_persistent);
                        metric_active.set(signal.is_active as i64);

                        tokio::select! {
                            res = sx.send(signal) => {
                                if let Err(e) = res {
                                    error!("Failed to emit {}: {e}", std::any::type_name::<ScalingSignal>());
                                }
                            },
                            _ = shutdown_token.cancelled() => {
                                info!("Shutting down");
                                break;
                            },
                        }
                    },
                    Err(LagError::Cancelled) => {
                        info!("Shutting down");
                        break;
                    },
                    Err(e) => {
                        metric_cycle_err.inc();
                        error!(
                            "Failed to compute scaling signal for group '{}': {e}",
                            scaler.metadata().consumer_group()
                        );
                    },
                }
            }
        });

        (rx, join_handle)
    }
}
