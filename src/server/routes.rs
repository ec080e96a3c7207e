//! Route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handlers::ws_upgrade))
        .route("/cert.pem", get(handlers::cert_pem))
        .route("/cert.der", get(handlers::cert_der))
        .route("/status", get(handlers::status))
        .route("/", get(handlers::index))
        .with_state(state)
}
