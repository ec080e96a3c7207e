//! HTTP surface
//!
//! Plain-HTTP and TLS listeners sharing one router: the WebSocket upgrade
//! endpoint, certificate downloads, a JSON status endpoint, and the setup
//! instructions page.

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::{AppState, RelayServer};
