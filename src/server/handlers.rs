//! Request handlers

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::error::RelayError;
use crate::ws::MAX_MESSAGE_SIZE;

use super::server::AppState;

/// WebSocket upgrade endpoint.
///
/// The origin policy is applied before the upgrade; a denied origin gets a
/// 403 and no connection. Accepted requests hand the socket to the hub,
/// which registers the connection and runs its pipeline until teardown.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, RelayError> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !state.origin_policy.allows(origin) {
        return Err(RelayError::OriginRejected {
            origin: origin.unwrap_or("<none>").to_string(),
        });
    }

    let ws = ws.ok_or_else(|| {
        RelayError::Upgrade("request is not a WebSocket handshake".to_string())
    })?;

    info!("viewer connecting (origin: {})", origin.unwrap_or("<none>"));

    let hub = state.hub.clone();
    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move { hub.attach(socket).await }))
}

/// Certificate download, PEM encoding
pub async fn cert_pem(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/x-pem-file"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"skyrelay-cert.pem\"",
            ),
        ],
        state.tls.cert_pem.clone(),
    )
}

/// Certificate download, DER encoding
pub async fn cert_der(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/x-x509-ca-cert"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"skyrelay-cert.der\"",
            ),
        ],
        state.tls.cert_der.clone(),
    )
}

/// JSON status endpoint
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "skyrelay",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.hub.connection_count(),
        "dropped_broadcasts": state.hub.dropped_broadcasts(),
        "started_at": state.started_at_utc.to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "endpoints": {
            "http": state.config.http_url(),
            "https": state.config.https_url(),
            "ws": state.config.ws_url(),
            "wss": state.config.wss_url(),
        },
    }))
}

/// Setup instructions page with certificate download links
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>skyrelay TLS certificate</title>
  <style>
    body {{ font-family: "Segoe UI", Tahoma, sans-serif; margin: 0; padding: 24px; background: #0f172a; color: #e2e8f0; }}
    h1 {{ font-size: 28px; margin: 0 0 8px; }}
    p {{ max-width: 920px; line-height: 1.5; }}
    a {{ color: #38bdf8; }}
    .cards {{ display: flex; gap: 12px; flex-wrap: wrap; margin: 16px 0 8px; }}
    .card {{ background: #1f2937; border: 1px solid #334155; padding: 12px 14px; border-radius: 8px; min-width: 220px; }}
    code {{ background: #0b1222; padding: 2px 6px; border-radius: 4px; }}
  </style>
</head>
<body>
  <h1>Secure WebSocket setup (wss://)</h1>
  <p>skyrelay generates a self-signed TLS certificate automatically. Install the
  certificate on devices you use to view the map so <code>wss://</code>
  connections are trusted. This page is also reachable over plain HTTP
  (<code>{http}</code>) if your browser blocks HTTPS initially.</p>
  <div class="cards">
    <div class="card">
      <strong>Certificate (PEM)</strong><br>
      <a href="/cert.pem">/cert.pem</a>
    </div>
    <div class="card">
      <strong>Certificate (DER)</strong><br>
      <a href="/cert.der">/cert.der</a>
    </div>
    <div class="card">
      <strong>Secure WebSocket (recommended)</strong><br>
      <code>{wss}</code>
    </div>
    <div class="card">
      <strong>Fallback WebSocket (no TLS)</strong><br>
      <code>{ws}</code>
    </div>
  </div>
  <p>Server status: <a href="/status">/status</a></p>
</body>
</html>
"#,
        http = config.http_url(),
        wss = config.wss_url(),
        ws = config.ws_url(),
    ))
}
