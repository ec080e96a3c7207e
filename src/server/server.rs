//! Relay server
//!
//! Binds the shared router on both the plain-HTTP and the TLS listener. The
//! HTTP listener exists so viewers can fetch the certificate before their
//! browser trusts the HTTPS endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::tls::TlsAssets;
use crate::ws::{HubHandle, OriginPolicy};

use super::routes;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub origin_policy: OriginPolicy,
    pub config: Arc<Config>,
    pub tls: Arc<TlsAssets>,
    pub started_at: Instant,
    pub started_at_utc: DateTime<Utc>,
}

impl AppState {
    pub fn new(hub: HubHandle, config: Arc<Config>, tls: Arc<TlsAssets>) -> Self {
        Self {
            hub,
            origin_policy: OriginPolicy::new(&config.origin),
            config,
            tls,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        }
    }
}

/// HTTP/HTTPS server pair
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run both listeners until shutdown is signalled
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let http_addr = self.state.config.server.http_listen;
        let https_addr = self.state.config.server.https_listen;
        let router = self.build_router();

        let rustls_config = RustlsConfig::from_pem_file(
            &self.state.tls.cert_path,
            &self.state.tls.key_path,
        )
        .await
        .map_err(|e| RelayError::Certificate(format!("failed to load TLS assets: {}", e)))?;

        let https_handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = https_handle.clone();
            let mut shutdown = shutdown.clone();
            async move {
                let _ = shutdown.changed().await;
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        });

        let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
        info!("HTTP listening on {}", http_addr);

        let mut http_shutdown = shutdown.clone();
        let http_server = axum::serve(http_listener, router.clone())
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.changed().await;
            });

        info!("HTTPS listening on {}", https_addr);
        let https_server = axum_server::bind_rustls(https_addr, rustls_config)
            .handle(https_handle)
            .serve(router.into_make_service());

        tokio::try_join!(
            async { http_server.await.map_err(RelayError::Io) },
            async { https_server.await.map_err(RelayError::Io) },
        )?;

        info!("Relay server shut down");
        Ok(())
    }
}
