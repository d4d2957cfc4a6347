//! Donor portal gateway binary.
//!
//! Loads configuration from the environment, wires the Salesforce session and Stripe client, and
//! serves the portal routes until `Ctrl-C` or `SIGTERM`.

// std
use std::net::SocketAddr;
// crates.io
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
// self
use donor_gateway::{
	api::{self, AppState},
	config::PortalConfig,
	obs,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let config = PortalConfig::from_env().wrap_err("failed to load gateway configuration")?;
	let state = AppState::from_config(&config).wrap_err("failed to build gateway state")?;
	let app = api::router(state);
	let listener = TcpListener::bind(config.bind)
		.await
		.wrap_err_with(|| format!("failed to bind to {}", config.bind))?;

	tracing::info!(addr = %config.bind, policy = ?config.salesforce.refresh_policy, "gateway listening");

	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await
		.wrap_err("gateway server failure")?;

	tracing::info!("gateway stopped");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::warn!(error = %err, "failed to listen for ctrl-c");
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(err) => {
				tracing::warn!(error = %err, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("shutdown signal received");
}
