//! Telemetry relay service
//!
//! Background service bridging the telemetry source and the hub: on each
//! report tick the source is sampled and the decoded update is broadcast to
//! all viewers; between ticks the hub's inbound stream is drained and
//! decoded viewer commands are applied back to the source. Source errors are
//! logged and skipped; they never terminate the service.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument, warn};

use crate::config::TelemetryConfig;
use crate::ws::{HubHandle, InboundMessage};

use super::command::{decode_command, CommandError, ViewerCommand};
use super::source::TelemetrySource;

/// Background service driving broadcasts and command dispatch
pub struct TelemetryService {
    hub: HubHandle,
    inbound: ReceiverStream<InboundMessage>,
    source: Box<dyn TelemetrySource>,
    config: TelemetryConfig,
}

impl TelemetryService {
    pub fn new(
        hub: HubHandle,
        inbound: ReceiverStream<InboundMessage>,
        source: Box<dyn TelemetrySource>,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            hub,
            inbound,
            source,
            config,
        }
    }

    /// Run the service until shutdown is signalled
    #[instrument(skip(self, shutdown))]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let TelemetryService {
            hub,
            mut inbound,
            mut source,
            config,
        } = self;

        info!(
            "Telemetry service started (report interval: {}ms)",
            config.report_interval_ms
        );

        let mut report_tick = interval(Duration::from_millis(config.report_interval_ms.max(1)));
        report_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = report_tick.tick() => {
                    match source.sample().await {
                        Ok(Some(report)) => {
                            if let Err(e) = hub.broadcast(&report.to_update()).await {
                                warn!("Failed to broadcast plane update: {}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Telemetry sample failed: {}", e);
                        }
                    }
                }
                message = inbound.next() => {
                    match message {
                        Some(message) => {
                            handle_command(source.as_mut(), &config, message).await;
                        }
                        // Hub gone; nothing left to relay.
                        None => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Telemetry service stopped");
    }
}

/// Decode one inbound viewer message and apply it to the source
async fn handle_command(
    source: &mut dyn TelemetrySource,
    config: &TelemetryConfig,
    message: InboundMessage,
) {
    match decode_command(&message.payload) {
        Ok(ViewerCommand::Relocate(cmd)) => {
            if config.disable_relocate {
                info!("Relocation disabled; ignoring command from {}", message.origin);
                return;
            }

            match source.relocate(cmd.lat, cmd.lng, cmd.altitude).await {
                Ok(()) => {
                    info!(
                        "Relocated aircraft to {:.4}, {:.4} at {:.0} ft (viewer {})",
                        cmd.lat, cmd.lng, cmd.altitude, message.origin
                    );
                }
                Err(e) => {
                    warn!("Relocation failed: {}", e);
                }
            }
        }
        Err(CommandError::Unrecognized(kind)) => {
            debug!(
                "Unrecognized command type {:?} from {}; ignoring",
                kind, message.origin
            );
        }
        Err(CommandError::Malformed(e)) => {
            debug!("Malformed command from {}: {}", message.origin, e);
        }
    }
}
