//! WebSocket connection hub
//!
//! The hub owns the set of live viewer connections, fans broadcast updates
//! out to all of them, and multiplexes inbound viewer messages into a single
//! stream. Each connection runs three cooperating tasks (reader, aggregator,
//! writer) wired together with bounded channels; all membership mutation
//! happens inside the hub's single coordination loop, so no locks are needed
//! anywhere on the broadcast path.

use std::time::Duration;

pub mod connection;
pub mod framer;
pub mod hub;
pub mod origin;

pub use hub::{ConnectionId, Hub, HubHandle, InboundMessage};
pub use origin::OriginPolicy;

/// Time allowed to write a message to the peer before the write is abandoned
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between liveness acknowledgments (pongs) from the peer
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Ping interval; must stay well under [`PONG_WAIT`] (nine-tenths of it)
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum message size allowed from a peer, in bytes
pub const MAX_MESSAGE_SIZE: usize = 2048;

/// Interval on which queued outbound payloads are coalesced into one frame
pub const AGGREGATE_INTERVAL: Duration = Duration::from_millis(16);

/// Maximum number of payloads buffered per connection
pub const OUTBOUND_BUFFER: usize = 256;

/// Capacity of the hub's broadcast and inbound queues
pub const HUB_BUFFER: usize = 256;
