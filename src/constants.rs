use const_format::formatcp;

/// Kafka internal topic that keeps track of Consumer's committed Offsets.
/// It is never considered when scaling.
pub(crate) const KONSUMER_OFFSETS_DATA_TOPIC: &str = "__consumer_offsets";

/// State reported for a Consumer Group the cluster knows nothing about.
pub(crate) const UNKNOWN_GROUP_STATE: &str = "Unknown";

/// Name of the environment variable that can override the logging level.
pub(crate) const LOG_ENV_VAR: &str = "LAGSCALER_LOG";

pub(crate) const DEFAULT_LAG_THRESHOLD: &str = "10";
pub(crate) const DEFAULT_ACTIVATION_LAG_THRESHOLD: &str = "0";
pub(crate) const DEFAULT_OFFSET_RESET_POLICY: &str = "latest";

pub(crate) const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub(crate) const DEFAULT_POLL_INTERVAL: &str = formatcp!("{}", DEFAULT_POLL_INTERVAL_SECS);

pub(crate) const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub(crate) const DEFAULT_FETCH_TIMEOUT: &str = formatcp!("{}", DEFAULT_FETCH_TIMEOUT_SECS);
