//! Per-connection pipeline
//!
//! Three tasks run for each viewer connection:
//!
//! - the **reader** pulls messages off the stream, enforces the inbound size
//!   cap and the liveness deadline, and publishes normalized lines to the
//!   hub's inbound queue;
//! - the **aggregator** drains the connection's outbound queue into a rolling
//!   buffer and flushes one coalesced frame per tick to the writer;
//! - the **writer** is the sole task touching the sink: it writes frames
//!   under a deadline and keeps the peer alive with periodic pings.
//!
//! Teardown is a queue-closure cascade with no forced cancellation: the
//! reader's exit unregisters the connection, the hub drops the outbound
//! queue, the aggregator closes the batch queue, and the writer sends a close
//! frame and exits. A writer failure raises the closing signal so the reader
//! ends promptly as well. Any failure is terminal for the connection; the
//! viewer is expected to reconnect as a brand-new connection.

use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::framer::{normalize_line, Framer};
use super::hub::{ConnectionId, InboundMessage};
use super::{AGGREGATE_INTERVAL, MAX_MESSAGE_SIZE, PING_PERIOD, PONG_WAIT, WRITE_WAIT};

/// Drive one connection's reader, aggregator, and writer tasks to completion
pub(crate) async fn run<W, R>(
    id: ConnectionId,
    sink: W,
    stream: R,
    outbound_rx: mpsc::Receiver<Bytes>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    unregister_tx: mpsc::Sender<ConnectionId>,
) where
    W: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
{
    let (closing_tx, closing_rx) = watch::channel(false);
    let (batch_tx, batch_rx) = mpsc::channel(1);

    let reader = tokio::spawn(read_pump(id, stream, inbound_tx, unregister_tx, closing_rx));
    let aggregator = tokio::spawn(aggregate_pump(outbound_rx, batch_tx));
    let writer = tokio::spawn(write_pump(id, sink, batch_rx, closing_tx));

    let _ = tokio::join!(reader, aggregator, writer);
    debug!("connection {} closed", id);
}

/// Read one message at a time until the peer goes away.
///
/// The liveness deadline is renewed on every pong; if it lapses the stream is
/// treated as dead. On exit the connection is unregistered from the hub,
/// which starts the teardown cascade for the other two tasks.
async fn read_pump<R>(
    id: ConnectionId,
    mut stream: R,
    inbound_tx: mpsc::Sender<InboundMessage>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    mut closing: watch::Receiver<bool>,
) where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut deadline = Instant::now() + PONG_WAIT;

    loop {
        tokio::select! {
            changed = closing.changed() => {
                if changed.is_err() || *closing.borrow() {
                    break;
                }
            }
            read = timeout_at(deadline, stream.next()) => {
                match read {
                    Err(_) => {
                        debug!("connection {}: no pong within {:?}", id, PONG_WAIT);
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        debug!("connection {}: read failed: {}", id, e);
                        break;
                    }
                    Ok(Some(Ok(msg))) => match msg {
                        Message::Pong(_) => {
                            deadline = Instant::now() + PONG_WAIT;
                        }
                        // The transport answers pings on its own.
                        Message::Ping(_) => {}
                        Message::Close(_) => break,
                        Message::Text(text) => {
                            if !publish(id, text.into_bytes(), &inbound_tx).await {
                                break;
                            }
                        }
                        Message::Binary(data) => {
                            if !publish(id, data, &inbound_tx).await {
                                break;
                            }
                        }
                    },
                }
            }
        }
    }

    // Teardown trigger: the hub drops our outbound queue in response, which
    // cascades through the aggregator and writer.
    let _ = unregister_tx.send(id).await;
}

/// Normalize and publish one inbound message; false means the connection
/// must terminate (oversized payload, malformed bytes, or hub gone)
async fn publish(
    id: ConnectionId,
    data: Vec<u8>,
    inbound_tx: &mpsc::Sender<InboundMessage>,
) -> bool {
    if data.len() > MAX_MESSAGE_SIZE {
        warn!(
            "connection {}: message too large ({} bytes, limit {})",
            id,
            data.len(),
            MAX_MESSAGE_SIZE
        );
        return false;
    }

    let text = match String::from_utf8(data) {
        Ok(text) => text,
        Err(_) => {
            debug!("connection {}: non-UTF-8 message", id);
            return false;
        }
    };

    inbound_tx
        .send(InboundMessage {
            payload: normalize_line(&text),
            origin: id,
        })
        .await
        .is_ok()
}

/// Sole consumer of the outbound queue: newline-terminate each payload into
/// the rolling buffer and flush one coalesced block per tick.
async fn aggregate_pump(mut outbound_rx: mpsc::Receiver<Bytes>, batch_tx: mpsc::Sender<Bytes>) {
    let mut framer = Framer::new();
    let mut tick = interval_at(Instant::now() + AGGREGATE_INTERVAL, AGGREGATE_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            payload = outbound_rx.recv() => {
                match payload {
                    Some(payload) => framer.push(&payload),
                    // The hub dropped our queue: the connection is tearing down.
                    None => break,
                }
            }
            _ = tick.tick() => {
                if let Some(block) = framer.take_block() {
                    if batch_tx.send(block).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Dropping batch_tx closes the writer's queue.
}

/// Sole writer to the sink: frames from the aggregator compete with the
/// keepalive schedule, every write bounded by the write deadline.
async fn write_pump<W>(
    id: ConnectionId,
    mut sink: W,
    mut batch_rx: mpsc::Receiver<Bytes>,
    closing_tx: watch::Sender<bool>,
) where
    W: Sink<Message, Error = axum::Error> + Unpin,
{
    let mut ping = interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            batch = batch_rx.recv() => {
                match batch {
                    Some(block) => {
                        let text = String::from_utf8_lossy(&block).into_owned();
                        match timeout(WRITE_WAIT, sink.send(Message::Text(text))).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                debug!("connection {}: write failed: {}", id, e);
                                break;
                            }
                            Err(_) => {
                                debug!("connection {}: write deadline exceeded", id);
                                break;
                            }
                        }
                    }
                    None => {
                        // Batch queue closed: finish the teardown handshake.
                        let _ = timeout(WRITE_WAIT, sink.send(Message::Close(None))).await;
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                match timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!("connection {}: ping failed: {}", id, e);
                        break;
                    }
                    Err(_) => {
                        debug!("connection {}: ping deadline exceeded", id);
                        break;
                    }
                }
            }
        }
    }

    // Whatever ended the writer must end the reader too.
    let _ = closing_tx.send(true);
}
