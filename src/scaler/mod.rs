// Inner modules
mod emitter;
#[allow(clippy::module_inception)]
mod scaler;

// Exports
pub use emitter::ScalingSignalEmitter;
pub use scaler::{KafkaLagScaler, MetricSpec, ScalingSignal};
