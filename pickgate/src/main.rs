mod config;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use gateway::GatewayError;
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_PREFIX: &str = "pickgate";

#[derive(Parser)]
#[command(name = "pickgate", version, about = "Warehouse pick-route gateway")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, short, default_value = "pickgate.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the gateway and its admin listener
    Gateway,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not install metrics exporter: {0}")]
    Metrics(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            process::exit(1);
        }
    };

    // Held until exit so buffered events are flushed
    let _sentry = config.logging.as_ref().map(init_sentry);
    init_tracing(config.logging.is_some());

    if let Err(e) = run(cli.command, config) {
        tracing::error!(error = %e, "pickgate exited with an error");
        process::exit(1);
    }
}

fn run(command: CliCommand, config: Config) -> Result<(), CliError> {
    if let Some(metrics) = &config.metrics {
        init_metrics(metrics)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(GatewayError::from)?;

    match command {
        CliCommand::Gateway => {
            tracing::info!("Starting gateway");
            runtime.block_on(gateway::run(config.gateway))?;
        }
    }
    Ok(())
}

fn init_sentry(logging: &LoggingConfig) -> sentry::ClientInitGuard {
    sentry::init((
        logging.sentry_dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ))
}

fn init_tracing(with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let sentry_layer = with_sentry.then(|| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    describe_all(gateway::metrics_defs::ALL_METRICS);
    describe_all(tasks::metrics_defs::ALL_METRICS);
    describe_all(tenants::metrics_defs::ALL_METRICS);
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Metrics exported to statsd"
    );
    Ok(())
}
