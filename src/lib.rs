//! Skyrelay - Flight Telemetry WebSocket Relay
//!
//! Relays live flight telemetry to connected map viewers over WebSocket and
//! routes viewer commands back to the telemetry source.
//!
//! ## Features
//!
//! - Lock-free connection hub: all membership changes and broadcast fan-out
//!   run through a single coordination loop over message queues
//! - Per-connection reader/aggregator/writer pipeline with 16 ms
//!   micro-batching, keepalive pings, and write deadlines
//! - Non-blocking fan-out: a slow viewer drops broadcasts instead of
//!   stalling delivery to everyone else
//! - Origin allow-list with loopback/private-network auto-allow
//! - Self-signed TLS certificate provisioning with download endpoints

pub mod config;
pub mod error;
pub mod server;
pub mod telemetry;
pub mod tls;
pub mod ws;

pub use config::Config;
pub use error::{RelayError, Result};
