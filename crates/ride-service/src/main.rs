use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ride_config::{ConfigLoader, GatewayConfig};
use ride_service::{api, backends};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ride-gateway")]
#[command(about = "Ride-hailing gateway", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	/// Overrides `server.log_level` (itself overridable with RIDE_LOG_LEVEL)
	#[arg(long)]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the gateway
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Load configuration before tracing so the configured level applies
	let loaded = ConfigLoader::new().with_file(&cli.config).load().await;

	let log_level = resolve_log_level(cli.log_level.as_deref(), loaded.as_ref().ok());
	setup_tracing(&log_level)?;

	info!("Configuration file: {:?}", cli.config);
	let config = loaded.context("Failed to load configuration")?;

	match cli.command {
		Some(Commands::Start) | None => start_service(config).await,
		Some(Commands::Validate) => validate_config(config),
	}
}

async fn start_service(config: GatewayConfig) -> Result<()> {
	info!("Starting ride gateway");

	let host = config.server.host.clone();
	let port = config.server.port;
	info!("Cache backend: {}", config.cache.backend);
	info!("Ride API: {}", config.ride_api.base_url);

	let engine = backends::engine_builder(config.clone())
		.build()
		.context("Failed to build ride engine")?;

	backends::register_services(&config).await;

	api::serve(Arc::new(engine), &host, port, setup_shutdown_signal())
		.await
		.context("HTTP server failed")?;

	info!("Ride gateway stopped");
	Ok(())
}

fn validate_config(config: GatewayConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Listen address: {}:{}", config.server.host, config.server.port);
	info!("Registered services:");
	for service in &config.services {
		info!("  {} ({})", service.name, service.id);
	}

	Ok(())
}

/// The `--log-level` flag wins over the configured level.
fn resolve_log_level(flag: Option<&str>, config: Option<&GatewayConfig>) -> String {
	flag.map(str::to_string)
		.or_else(|| config.map(|config| config.server.log_level.clone()))
		.unwrap_or_else(|| "info".to_string())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to install Ctrl+C handler: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install signal handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received");
}
