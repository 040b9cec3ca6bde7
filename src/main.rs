#[macro_use]
extern crate log;

use std::error::Error;
use std::sync::Arc;

use log::Level::Trace;
use prometheus::{Registry, TextEncoder};
use tokio_util::sync::CancellationToken;

use lagscaler::broker::RdKafkaBrokerClient;
use lagscaler::cli::Cli;
use lagscaler::internals::Emitter;
use lagscaler::scaler::{KafkaLagScaler, ScalingSignalEmitter};
use lagscaler::{logging, prometheus_metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = parse_cli_and_init_logging();

    let metadata = cli.build_scaling_metadata().unwrap_or_else(|e| {
        error!("Invalid scaler configuration: {e}");
        std::process::exit(exit_code::USAGE_ERROR);
    });

    let client = RdKafkaBrokerClient::new(cli.build_client_config(&metadata), cli.fetch_timeout())
        .unwrap_or_else(|e| {
            error!("{e}");
            std::process::exit(exit_code::SERVICE_UNAVAILABLE);
        });

    let shutdown_token = build_shutdown_token();
    let metrics = Arc::new(prometheus_metrics::init(&metadata));

    let scaler =
        Arc::new(KafkaLagScaler::new(metadata, Arc::new(client)).with_cycle_timeout(cli.poll_interval()));

    let spec = scaler.get_metric_spec();
    info!("Scaling on metric '{}' with target average value {}", spec.metric_name, spec.target_average_value);

    let (mut signal_rx, emitter_join) =
        ScalingSignalEmitter::new(scaler, cli.poll_interval(), metrics.clone())
            .spawn(shutdown_token.clone());

    while let Some(signal) = signal_rx.recv().await {
        println!(
            "{} {}={} (milli: {}) active={} lag_with_persistent={}",
            signal.read_datetime.to_rfc3339(),
            signal.metric_name,
            signal.metric_value,
            signal.metric_milli_value(),
            signal.is_active,
            signal.lag.total_lag_with_persistent
        );

        if log_enabled!(Trace) {
            trace!("Scaler metrics:\n{}", encode_metrics(&metrics));
        }
    }
    emitter_join.await?;

    Ok(())
}

fn parse_cli_and_init_logging() -> Cli {
    // Parse command line input and initialize logging
    let cli = Cli::parse_and_validate();
    logging::init(cli.verbosity_level());

    trace!("Created:\n{:#?}", cli);

    cli
}

fn build_shutdown_token() -> CancellationToken {
    let shutdown_token = CancellationToken::new();

    // Setup shutdown signal handler:
    // when it's time to shutdown, cancels the token and all its clones get notified.
    //
    // NOTE: This handler will be listening on its own dedicated thread.
    let shutdown_token_clone = shutdown_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutting down...");
        shutdown_token_clone.cancel();
    }) {
        error!("Failed to register signal handler: {e}");
    }

    // Return a token to we can notify other parts of the system.
    shutdown_token
}

fn encode_metrics(metrics: &Registry) -> String {
    let mut body = String::new();
    if let Err(e) = TextEncoder.encode_utf8(&metrics.gather(), &mut body) {
        body = format!("Failed to encode metrics: {e}");
    }
    body
}
