//! Connection hub
//!
//! Single source of truth for the set of live viewer connections. All
//! membership changes and broadcast fan-out funnel through one coordination
//! loop over message queues, so the connection set is only ever touched by
//! one task and the broadcast path takes no locks.
//!
//! Fan-out never blocks on a slow peer: a full per-connection queue drops
//! that broadcast for that connection and bumps a counter, so one stalled
//! viewer cannot starve delivery to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocket;
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::Result;

use super::connection;
use super::{HUB_BUFFER, OUTBOUND_BUFFER};

/// Unique identity of one viewer connection
pub type ConnectionId = Uuid;

/// One normalized message received from a viewer, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub payload: String,
    pub origin: ConnectionId,
}

/// Hub-side handle to one registered connection
#[derive(Debug)]
pub(crate) struct ConnectionEntry {
    pub id: ConnectionId,
    pub outbound: mpsc::Sender<Bytes>,
}

/// Connection hub; owns the connection set and runs the coordination loop
pub struct Hub {
    connections: HashMap<ConnectionId, mpsc::Sender<Bytes>>,
    register_rx: mpsc::Receiver<ConnectionEntry>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    broadcast_rx: mpsc::Receiver<Bytes>,
    connection_count: Arc<AtomicUsize>,
    dropped_broadcasts: Arc<AtomicU64>,
}

/// Cloneable handle used by collaborators to talk to the hub
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<ConnectionEntry>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    broadcast_tx: mpsc::Sender<Bytes>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    connection_count: Arc<AtomicUsize>,
    dropped_broadcasts: Arc<AtomicU64>,
}

impl Hub {
    /// Create a hub, a handle for collaborators, and the inbound message
    /// stream consumed by the command dispatcher
    pub fn new() -> (Hub, HubHandle, ReceiverStream<InboundMessage>) {
        let (register_tx, register_rx) = mpsc::channel(HUB_BUFFER);
        let (unregister_tx, unregister_rx) = mpsc::channel(HUB_BUFFER);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(HUB_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(HUB_BUFFER);

        let connection_count = Arc::new(AtomicUsize::new(0));
        let dropped_broadcasts = Arc::new(AtomicU64::new(0));

        let hub = Hub {
            connections: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            connection_count: connection_count.clone(),
            dropped_broadcasts: dropped_broadcasts.clone(),
        };

        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            inbound_tx,
            connection_count,
            dropped_broadcasts,
        };

        (hub, handle, ReceiverStream::new(inbound_rx))
    }

    /// Run the coordination loop until shutdown is signalled.
    ///
    /// This is the only task that touches the connection set.
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Hub coordination loop started");

        loop {
            tokio::select! {
                Some(entry) = self.register_rx.recv() => {
                    self.register(entry);
                }
                Some(id) = self.unregister_rx.recv() => {
                    self.unregister(id);
                }
                Some(payload) = self.broadcast_rx.recv() => {
                    self.fan_out(payload);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                else => break,
            }
        }

        // Dropping the outbound senders closes every connection's queue,
        // which cascades into connection teardown.
        let remaining = self.connections.len();
        self.connections.clear();
        self.connection_count.store(0, Ordering::Relaxed);
        info!("Hub coordination loop stopped ({} connections closed)", remaining);
    }

    fn register(&mut self, entry: ConnectionEntry) {
        debug!("viewer connected: {}", entry.id);
        self.connections.insert(entry.id, entry.outbound);
        self.connection_count
            .store(self.connections.len(), Ordering::Relaxed);
    }

    fn unregister(&mut self, id: ConnectionId) {
        // May race with fan-out's own stale-connection removal; removing an
        // unknown id is a no-op, which keeps teardown idempotent.
        if self.connections.remove(&id).is_some() {
            debug!("viewer disconnected: {}", id);
            self.connection_count
                .store(self.connections.len(), Ordering::Relaxed);
        }
    }

    /// Enqueue one serialized payload onto every registered connection.
    ///
    /// `try_send` keeps the loop non-blocking: a full queue means that peer
    /// misses this broadcast, a closed queue means the connection is already
    /// tearing down and gets removed here.
    fn fan_out(&mut self, payload: Bytes) {
        let mut stale = Vec::new();

        for (id, outbound) in &self.connections {
            match outbound.try_send(payload.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped_broadcasts.fetch_add(1, Ordering::Relaxed);
                    debug!("broadcast dropped for slow viewer {}", id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(*id);
                }
            }
        }

        for id in stale {
            self.unregister(id);
        }
    }
}

impl HubHandle {
    /// Serialize `update` once and fan it out to all registered connections.
    ///
    /// Broadcasts are delivered to every connection in the order `broadcast`
    /// was called; a connection only sees broadcasts issued after its
    /// registration completed.
    pub async fn broadcast<T: Serialize>(&self, update: &T) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec(update)?);
        // A closed queue means the hub has shut down; nothing left to notify.
        let _ = self.broadcast_tx.send(bytes).await;
        Ok(())
    }

    /// Number of currently registered connections
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Number of broadcasts dropped due to slow viewers
    pub fn dropped_broadcasts(&self) -> u64 {
        self.dropped_broadcasts.load(Ordering::Relaxed)
    }

    /// Attach an upgraded WebSocket to the hub: register a new connection
    /// and drive its reader/aggregator/writer tasks until teardown.
    pub async fn attach(&self, socket: WebSocket) {
        let id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        let entry = ConnectionEntry {
            id,
            outbound: outbound_tx,
        };
        if self.register_tx.send(entry).await.is_err() {
            debug!("hub is gone; dropping incoming connection {}", id);
            return;
        }

        let (sink, stream) = socket.split();
        connection::run(
            id,
            sink,
            stream,
            outbound_rx,
            self.inbound_tx.clone(),
            self.unregister_tx.clone(),
        )
        .await;
    }
}
