use clap::{ArgGroup, Parser};
use rdkafka::ClientConfig;
use tokio::time::Duration;

use crate::constants::{
    DEFAULT_ACTIVATION_LAG_THRESHOLD, DEFAULT_FETCH_TIMEOUT, DEFAULT_LAG_THRESHOLD,
    DEFAULT_OFFSET_RESET_POLICY, DEFAULT_POLL_INTERVAL,
};
use crate::scaling_metadata::{
    parse_partition_limitation, OffsetResetPolicy, ScalingMetadata, ScalingMetadataResult,
};

/// Command Line Interface, defined via the declarative,
/// `derive` based functionality of the `clap` crate.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("logging_flags")
        .required(false)
        .multiple(false)
        .args(["verbose", "quiet"]),
))]
pub struct Cli {
    // ------------------------------------------------------------------------ Kafka Client configuration
    /// Initial Kafka Brokers to connect to (format: 'HOST:PORT,...').
    ///
    /// Equivalent to '--kafka-conf=bootstrap.servers:host:port,...'.
    #[arg(short = 'b', long = "brokers", value_name = "BOOTSTRAP_BROKERS")]
    pub bootstrap_brokers: String,

    /// Client identifier used by the internal Kafka Clients.
    ///
    /// Equivalent to '--kafka-conf=client.id:my-client-id'.
    #[arg(long = "client-id", value_name = "CLIENT_ID", default_value = env!("CARGO_PKG_NAME"))]
    pub client_id: String,

    /// Additional configuration used by the internal Kafka Clients (format: 'CONF_KEY:CONF_VAL').
    ///
    /// To set multiple configurations keys, use this argument multiple times.
    /// This is where SASL and TLS are configured.
    /// See: https://github.com/edenhill/librdkafka/blob/master/CONFIGURATION.md.
    #[arg(
        long = "kafka-conf",
        value_name = "CONF_KEY:CONF_VAL",
        value_parser = kv_clap_value_parser,
        verbatim_doc_comment
    )]
    pub kafka_config: Vec<KVPair>,

    /// Override the timeout of each single request to the Kafka cluster (seconds).
    #[arg(
        long = "fetch-timeout",
        value_name = "SECONDS",
        default_value = DEFAULT_FETCH_TIMEOUT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub fetch_timeout_secs: u64,

    // ------------------------------------------------------------------------- Scaler configuration
    /// Consumer Group whose lag drives scaling.
    #[arg(short = 'g', long = "group", value_name = "CONSUMER_GROUP")]
    pub consumer_group: String,

    /// Topics to compute lag on (comma separated, or repeated).
    ///
    /// If not set, topics are discovered via the Consumer Group: this requires
    /// the group to have active members, and considers every topic in the cluster.
    #[arg(short = 't', long = "topic", value_name = "TOPIC", value_delimiter = ',', verbatim_doc_comment)]
    pub topics: Vec<String>,

    /// Limit lag computation to these partitions (format: '0,2,5-7').
    ///
    /// Ignored if no '--topic' is set.
    #[arg(long = "partition-limitation", value_name = "PARTITIONS", verbatim_doc_comment)]
    pub partition_limitation: Option<String>,

    /// Target lag per consumer: desired replicas are 'total lag / lag threshold'.
    #[arg(long = "lag-threshold", value_name = "LAG", default_value = DEFAULT_LAG_THRESHOLD)]
    pub lag_threshold: i64,

    /// Total lag (persistent lag included) above which scaling becomes active.
    #[arg(
        long = "activation-lag-threshold",
        value_name = "LAG",
        default_value = DEFAULT_ACTIVATION_LAG_THRESHOLD
    )]
    pub activation_lag_threshold: i64,

    /// Where consumers start from when there is no committed offset ('earliest' or 'latest').
    #[arg(
        long = "offset-reset-policy",
        value_name = "POLICY",
        default_value = DEFAULT_OFFSET_RESET_POLICY
    )]
    pub offset_reset_policy: String,

    /// Allow more consumers than partitions: the total lag is not capped.
    #[arg(long = "allow-idle-consumers")]
    pub allow_idle_consumers: bool,

    /// Do not count the lag of partitions whose consumer offset did not move since the previous poll.
    #[arg(long = "exclude-persistent-lag")]
    pub exclude_persistent_lag: bool,

    /// Partitions without committed offset count '0' instead of '1' (with 'latest' reset policy).
    #[arg(long = "scale-to-zero-on-invalid-offset")]
    pub scale_to_zero_on_invalid_offset: bool,

    /// Cap the total lag to the number of partitions with lag, instead of the number of partitions.
    #[arg(long = "limit-to-partitions-with-lag")]
    pub limit_to_partitions_with_lag: bool,

    /// Index of this trigger, used to generate the metric name.
    #[arg(long = "trigger-index", value_name = "INDEX", default_value = "0")]
    pub trigger_index: usize,

    /// Interval between polling cycles (seconds).
    ///
    /// This is also the upper bound to the duration of each single cycle.
    #[arg(
        long = "poll-interval",
        value_name = "SECONDS",
        default_value = DEFAULT_POLL_INTERVAL,
        value_parser = clap::value_parser!(u64).range(1..),
        verbatim_doc_comment
    )]
    pub poll_interval_secs: u64,

    /// Verbose logging.
    ///
    /// * none    = 'WARN'
    /// * '-v'    = 'INFO'
    /// * '-vv'   = 'DEBUG'
    /// * '-vvv'  = 'TRACE'
    ///
    /// Alternatively, set environment variable 'LAGSCALER_LOG=(ERROR|WARN|INFO|DEBUG|TRACE|OFF)'.
    #[arg(short, long, action = clap::ArgAction::Count, verbatim_doc_comment)]
    pub verbose: u8,

    /// Quiet logging.
    ///
    /// * none    = 'WARN'
    /// * '-q'    = 'ERROR'
    /// * '-qq'   = 'OFF'
    ///
    /// Alternatively, set environment variable 'LAGSCALER_LOG=(ERROR|WARN|INFO|DEBUG|TRACE|OFF)'.
    #[arg(short, long, action = clap::ArgAction::Count, verbatim_doc_comment)]
    pub quiet: u8,
}

impl Cli {
    pub fn parse_and_validate() -> Self {
        Self::parse()
    }

    pub fn verbosity_level(&self) -> i8 {
        self.verbose as i8 - self.quiet as i8
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Kafka client configuration, connecting to the bootstrap servers of `metadata`.
    pub fn build_client_config(&self, metadata: &ScalingMetadata) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", metadata.bootstrap_servers())
            .set("client.id", self.client_id.clone());
        for cfg in &self.kafka_config {
            config.set(cfg.0.clone(), cfg.1.clone());
        }

        trace!("Created:\n{:#?}", config);
        config
    }

    pub fn build_scaling_metadata(&self) -> ScalingMetadataResult<ScalingMetadata> {
        let partition_limitation = match &self.partition_limitation {
            Some(pl) => parse_partition_limitation(pl)?,
            None => Default::default(),
        };

        ScalingMetadata::builder()
            .bootstrap_servers(self.bootstrap_brokers.clone())
            .consumer_group(self.consumer_group.clone())
            .topics(self.topics.clone())
            .partition_limitation(partition_limitation)
            .lag_threshold(self.lag_threshold)
            .activation_lag_threshold(self.activation_lag_threshold)
            .offset_reset_policy(self.offset_reset_policy.parse::<OffsetResetPolicy>()?)
            .allow_idle_consumers(self.allow_idle_consumers)
            .exclude_persistent_lag(self.exclude_persistent_lag)
            .scale_to_zero_on_invalid_offset(self.scale_to_zero_on_invalid_offset)
            .limit_to_partitions_with_lag(self.limit_to_partitions_with_lag)
            .trigger_index(self.trigger_index)
            .build()
    }
}

/// A simple (key,value) pair of `String`s, useful to be parsed from arguments via [`kv_clap_value_parser`].
pub type KVPair = (String, String);

/// To be used as [`clap::value_parser`] function to create [`KVPair`] values.
fn kv_clap_value_parser(kv: &str) -> Result<KVPair, String> {
    let (k, v) = match kv.split_once(':') {
        None => {
            return Err("Should have 'K:V' format".to_string());
        },
        Some((k, v)) => (k, v),
    };

    Ok((k.to_string(), v.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scaling_metadata::ScalingMetadataError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from([&["lagscaler", "-b", "localhost:9092", "-g", "my-group"][..], args].concat())
            .unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        let meta = cli.build_scaling_metadata().unwrap();

        assert_eq!(meta.lag_threshold(), 10);
        assert_eq!(meta.activation_lag_threshold(), 0);
        assert_eq!(meta.offset_reset_policy(), OffsetResetPolicy::Latest);
        assert!(meta.topics().is_empty());
        assert_eq!(cli.poll_interval(), Duration::from_secs(30));
        assert_eq!(cli.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn topics_and_partitions() {
        let cli = parse(&[
            "-t",
            "orders,payments",
            "--topic",
            "audit",
            "--partition-limitation",
            "0,3-4",
            "--offset-reset-policy",
            "earliest",
        ]);
        let meta = cli.build_scaling_metadata().unwrap();

        assert_eq!(meta.topics().len(), 3);
        assert!(meta.is_active_partition(4));
        assert!(!meta.is_active_partition(1));
        assert_eq!(meta.offset_reset_policy(), OffsetResetPolicy::Earliest);
    }

    #[test]
    fn invalid_configuration_is_reported() {
        let cli = parse(&["-t", "orders", "--allow-idle-consumers", "--limit-to-partitions-with-lag"]);
        assert_eq!(
            cli.build_scaling_metadata(),
            Err(ScalingMetadataError::IdleConsumersWithPartitionsWithLag)
        );

        let cli = parse(&["--offset-reset-policy", "smallest"]);
        assert_eq!(
            cli.build_scaling_metadata(),
            Err(ScalingMetadataError::UnsupportedOffsetResetPolicy("smallest".to_string()))
        );

        let cli = parse(&["-t", "orders", "--partition-limitation", "x"]);
        assert_eq!(
            cli.build_scaling_metadata(),
            Err(ScalingMetadataError::InvalidPartitionLimitation("x".to_string()))
        );
    }

    #[test]
    fn kafka_conf_pairs() {
        let cli = parse(&["--kafka-conf", "security.protocol:SASL_SSL", "-vv"]);

        assert_eq!(cli.kafka_config, vec![("security.protocol".to_string(), "SASL_SSL".to_string())]);
        assert_eq!(cli.verbosity_level(), 2);
        assert!(kv_clap_value_parser("no-separator").is_err());

        let meta = cli.build_scaling_metadata().unwrap();
        let config = cli.build_client_config(&meta);
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(config.get("client.id"), Some("lagscaler"));
    }

    #[test]
    fn short_and_long_flags_are_equivalent() {
        let short = Cli::try_parse_from(["lagscaler", "-b", "k1:9092", "-g", "billing", "-t", "orders"]).unwrap();
        let long = Cli::try_parse_from([
            "lagscaler",
            "--brokers",
            "k1:9092",
            "--group",
            "billing",
            "--topic",
            "orders",
        ])
        .unwrap();

        assert_eq!(short.bootstrap_brokers, long.bootstrap_brokers);
        assert_eq!(short.consumer_group, "billing");
        assert_eq!(short.consumer_group, long.consumer_group);
        assert_eq!(short.topics, vec!["orders".to_string()]);
        assert_eq!(short.topics, long.topics);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let base = ["lagscaler", "-b", "localhost:9092", "-g", "my-group"];

        let res = Cli::try_parse_from([&base[..], &["--poll-interval", "0"][..]].concat());
        assert_eq!(res.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);

        let res = Cli::try_parse_from([&base[..], &["--fetch-timeout", "0"][..]].concat());
        assert_eq!(res.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);

        let cli = parse(&["--poll-interval", "1", "--fetch-timeout", "1"]);
        assert_eq!(cli.poll_interval(), Duration::from_secs(1));
        assert_eq!(cli.fetch_timeout(), Duration::from_secs(1));
    }
}
