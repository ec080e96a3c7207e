//! End-to-end relay tests: real HTTP server, real WebSocket client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;

use skyrelay::config::{Config, LogConfig, OriginConfig, ServerConfig, TelemetryConfig, TlsConfig};
use skyrelay::server::{routes, AppState};
use skyrelay::tls::ensure_tls_assets;
use skyrelay::ws::{Hub, HubHandle, InboundMessage};

struct TestRelay {
    hub: HubHandle,
    inbound: ReceiverStream<InboundMessage>,
    ws_url: String,
    _shutdown: watch::Sender<bool>,
}

async fn start_relay() -> TestRelay {
    let config = Config {
        server: ServerConfig {
            http_listen: "127.0.0.1:0".parse().unwrap(),
            https_listen: "127.0.0.1:0".parse().unwrap(),
        },
        origin: OriginConfig {
            allow_all: false,
            allowed_origins: vec![],
        },
        telemetry: TelemetryConfig {
            report_interval_ms: 200,
            disable_relocate: false,
        },
        tls: TlsConfig {
            cert_dir: PathBuf::from("."),
        },
        log: LogConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    };

    static NEXT_DIR: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
    let cert_dir = std::env::temp_dir().join(format!(
        "skyrelay-e2e-{}-{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&cert_dir).unwrap();
    let tls = ensure_tls_assets(&cert_dir, &config.server.https_listen).unwrap();

    let (hub, handle, inbound) = Hub::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(hub.run(shutdown_rx));

    let state = AppState::new(handle.clone(), Arc::new(config), Arc::new(tls));
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestRelay {
        hub: handle,
        inbound,
        ws_url: format!("ws://{}/ws", addr),
        _shutdown: shutdown_tx,
    }
}

fn handshake_request(url: &str, origin: &str) -> tokio_tungstenite::tungstenite::handshake::client::Request {
    let mut request = url.into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", HeaderValue::from_str(origin).unwrap());
    request
}

async fn wait_for_registration(hub: &HubHandle, count: usize) {
    for _ in 0..500 {
        if hub.connection_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection never registered");
}

#[tokio::test]
async fn test_rejects_disallowed_origin() {
    let relay = start_relay().await;

    let err = connect_async(handshake_request(&relay.ws_url, "https://evil.example"))
        .await
        .unwrap_err();

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 403);
        }
        other => panic!("expected HTTP rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_broadcast_round_trip() {
    let relay = start_relay().await;

    let (mut client, _) = connect_async(handshake_request(&relay.ws_url, "http://localhost:3000"))
        .await
        .unwrap();
    wait_for_registration(&relay.hub, 1).await;

    let payload = serde_json::json!({"type": "plane", "altitude": "1000"});
    relay.hub.broadcast(&payload).await.unwrap();

    let frame = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for broadcast")
        .expect("stream ended")
        .unwrap();

    let text = match frame {
        Message::Text(text) => text,
        other => panic!("expected text frame, got {:?}", other),
    };

    assert!(text.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(value, payload);
}

#[tokio::test]
async fn test_broadcasts_batch_and_preserve_order() {
    let relay = start_relay().await;

    let (mut client, _) = connect_async(handshake_request(&relay.ws_url, "http://localhost:3000"))
        .await
        .unwrap();
    wait_for_registration(&relay.hub, 1).await;

    for n in 0..5u32 {
        relay.hub.broadcast(&serde_json::json!({ "n": n })).await.unwrap();
    }

    // Frames may arrive coalesced; newline-split to recover the units.
    let mut units = Vec::new();
    while units.len() < 5 {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for broadcasts")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            units.extend(
                text.lines()
                    .filter(|line| !line.is_empty())
                    .map(|line| line.to_string()),
            );
        }
    }

    for (n, unit) in units.iter().enumerate() {
        let value: serde_json::Value = serde_json::from_str(unit).unwrap();
        assert_eq!(value["n"], n as u64);
    }
}

#[tokio::test]
async fn test_viewer_command_reaches_inbound_stream() {
    let mut relay = start_relay().await;

    let (mut client, _) = connect_async(handshake_request(&relay.ws_url, "http://localhost:3000"))
        .await
        .unwrap();
    wait_for_registration(&relay.hub, 1).await;

    client
        .send(Message::Text(
            "{\"type\":\"teleport\",\"lat\":60.1,\"lng\":11.1,\"altitude\":2500.0}".to_string(),
        ))
        .await
        .unwrap();

    let inbound = timeout(Duration::from_secs(5), relay.inbound.next())
        .await
        .expect("timed out waiting for inbound message")
        .expect("inbound stream ended");

    let value: serde_json::Value = serde_json::from_str(&inbound.payload).unwrap();
    assert_eq!(value["type"], "teleport");
    assert_eq!(value["lat"], 60.1);
}

#[tokio::test]
async fn test_oversized_message_terminates_connection() {
    let mut relay = start_relay().await;

    let (mut client, _) = connect_async(handshake_request(&relay.ws_url, "http://localhost:3000"))
        .await
        .unwrap();
    wait_for_registration(&relay.hub, 1).await;

    let oversized = "x".repeat(4096);
    // The server may already be closing the socket when the send lands.
    let _ = client.send(Message::Text(oversized)).await;

    // The connection is torn down without the payload reaching the
    // inbound stream.
    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection was not closed");

    assert!(
        timeout(Duration::from_millis(200), relay.inbound.next())
            .await
            .is_err(),
        "oversized payload must not be delivered"
    );
}

#[tokio::test]
async fn test_disconnect_unregisters_connection() {
    let relay = start_relay().await;

    let (client, _) = connect_async(handshake_request(&relay.ws_url, "http://localhost:3000"))
        .await
        .unwrap();
    wait_for_registration(&relay.hub, 1).await;

    drop(client);

    for _ in 0..500 {
        if relay.hub.connection_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection never unregistered");
}
