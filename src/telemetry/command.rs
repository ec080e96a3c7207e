//! Viewer command decoding
//!
//! Inbound viewer messages are self-describing JSON objects carrying a
//! `type` discriminator. Decoding is two-step: the discriminator is parsed
//! first, then the remainder is decoded into one of a closed set of command
//! shapes. Unknown discriminators are reported as unrecognized rather than
//! being matched structurally.

use serde::Deserialize;
use thiserror::Error;

/// Aircraft relocation request from a viewer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelocateCommand {
    pub lat: f64,
    pub lng: f64,
    /// Feet
    pub altitude: f64,
}

/// Closed set of commands a viewer may send
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    /// Wire tag `teleport`: move the aircraft to the given position
    Relocate(RelocateCommand),
}

/// Why an inbound message did not decode to a command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unrecognized command type: {0}")]
    Unrecognized(String),

    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Tagged {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode one inbound viewer message into a command
pub fn decode_command(payload: &str) -> Result<ViewerCommand, CommandError> {
    let tag: Tagged = serde_json::from_str(payload)?;

    match tag.kind.as_str() {
        "teleport" => Ok(ViewerCommand::Relocate(serde_json::from_str(payload)?)),
        other => Err(CommandError::Unrecognized(other.to_string())),
    }
}
