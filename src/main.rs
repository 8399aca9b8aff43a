use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use airq_bridge::{
	BridgeConfig, IngressConnection, IngressError, IngressSubscriber,
	RedisPublisher, Router,
};
use tokio::{signal, time};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
const REDIS_STARTUP_CHECK: Duration = Duration::from_secs(5);

fn init_tracing() {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_thread_ids(false)
				.with_thread_names(false)
				.with_file(false)
				.with_line_number(false)
				.compact(),
		)
		.init();
}

#[tokio::main]
async fn main() -> ExitCode {
	dotenv::dotenv().ok();
	init_tracing();

	let config = match BridgeConfig::from_env() {
		| Ok(config) => config,
		| Err(err) => {
			error!(error = %err, "Invalid configuration");
			return ExitCode::FAILURE;
		}
	};
	let ingress_config = match config.ingress_config() {
		| Ok(ingress_config) => ingress_config,
		| Err(err) => {
			error!(error = %err, "Invalid MQTT configuration");
			return ExitCode::FAILURE;
		}
	};

	info!(url = %config.redis_url(), "Setting up Redis client");
	let publisher = match RedisPublisher::open(&config.redis_url()) {
		| Ok(publisher) => publisher,
		| Err(err) => {
			error!(error = %err, "Invalid Redis configuration");
			return ExitCode::FAILURE;
		}
	};
	match time::timeout(REDIS_STARTUP_CHECK, publisher.connect()).await {
		| Ok(Ok(())) => {}
		// The publisher connects again on the first forward.
		| Ok(Err(err)) => {
			error!(error = %err, "Error during creation of Redis client");
		}
		| Err(_) => {
			error!(timeout = ?REDIS_STARTUP_CHECK, "Redis did not answer in time");
		}
	}
	let router = Router::new(Arc::new(publisher));

	info!(
		host = %config.mqtt_host,
		port = config.mqtt_port,
		client_id = %config.mqtt_client_id,
		"Setting up MQTT client"
	);
	let mut connection =
		match IngressSubscriber::connect(ingress_config, Arc::new(router)).await {
			| Ok(connection) => {
				info!("Created MQTT client. Forwarding data...");
				Some(connection)
			}
			| Err(err) if err.is_fatal() => {
				error!(error = %err, "MQTT subscription could not be set up");
				return ExitCode::FAILURE;
			}
			| Err(err) => {
				error!(error = %err, "Error during creation of MQTT client, not forwarding");
				None
			}
		};

	tokio::select! {
		_ = wait_for_shutdown() => {
			info!("Shutdown signal received");
		}
		result = wait_closed(&mut connection) => {
			if let Err(err) = result {
				error!(error = %err, "MQTT session failed");
				return ExitCode::FAILURE;
			}
			warn!("MQTT session closed by the broker, waiting for shutdown signal");
			wait_for_shutdown().await;
		}
	}

	if let Some(connection) = connection {
		match time::timeout(SHUTDOWN_GRACE, connection.shutdown()).await {
			| Ok(Ok(())) => info!("MQTT client disconnected"),
			| Ok(Err(err)) => warn!(error = %err, "MQTT session ended with error"),
			| Err(_) => warn!("MQTT client did not disconnect in time"),
		}
	}
	ExitCode::SUCCESS
}

async fn wait_closed(
	connection: &mut Option<IngressConnection>,
) -> Result<(), IngressError> {
	match connection {
		| Some(connection) => connection.closed().await,
		| None => std::future::pending().await,
	}
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
	let ctrl_c = async {
		if let Err(err) = signal::ctrl_c().await {
			error!(error = %err, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			| Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			| Err(err) => {
				error!(error = %err, "Failed to install SIGTERM handler");
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
}
