//! Skyrelay - Entry Point
//!
//! Starts the connection hub, the telemetry service, and the HTTP/HTTPS
//! servers with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod server;
mod telemetry;
mod tls;
mod ws;

use config::Config;
use server::{AppState, RelayServer};
use telemetry::{SimulatedSource, TelemetryService};
use ws::Hub;

#[tokio::main]
async fn main() -> error::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyrelay=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skyrelay");

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded");

    // Load or generate the TLS certificate
    let tls = Arc::new(tls::ensure_tls_assets(
        &config.tls.cert_dir,
        &config.server.https_listen,
    )?);
    info!(
        "TLS enabled; certificate: {} (viewers can download it from {}/cert.pem)",
        tls.cert_path.display(),
        config.http_url()
    );

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);

    // Start the connection hub
    let (hub, hub_handle, inbound) = Hub::new();
    let hub_task = tokio::spawn(hub.run(shutdown_tx.subscribe()));

    // Start the telemetry service
    let telemetry_service = TelemetryService::new(
        hub_handle.clone(),
        inbound,
        Box::new(SimulatedSource::new()),
        config.telemetry.clone(),
    );
    let telemetry_task = tokio::spawn(telemetry_service.run(shutdown_tx.subscribe()));

    // Start the HTTP/HTTPS servers
    let state = AppState::new(hub_handle, config.clone(), tls);
    let relay_server = RelayServer::new(state);
    let server_shutdown = shutdown_tx.subscribe();
    let server_task = tokio::spawn(async move {
        if let Err(e) = relay_server.run(server_shutdown).await {
            error!("Relay server error: {}", e);
        }
    });

    info!(
        "Servers started - HTTP: {}, HTTPS: {} (map viewers connect to {})",
        config.server.http_listen,
        config.server.https_listen,
        config.wss_url()
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    // Send shutdown signal to all services
    let _ = shutdown_tx.send(true);

    // Wait for all tasks to complete
    let _ = tokio::join!(hub_task, telemetry_task, server_task);

    info!("Skyrelay stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
