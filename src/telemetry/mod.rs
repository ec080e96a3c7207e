//! Telemetry integration
//!
//! The relay consumes typed plane reports from a [`TelemetrySource`],
//! decodes them into self-describing wire updates, and broadcasts them on a
//! schedule. Viewer commands flowing the other way are decoded from the
//! hub's inbound stream and applied back to the source.

pub mod command;
pub mod report;
pub mod service;
pub mod source;

pub use command::{decode_command, CommandError, ViewerCommand};
pub use report::{PlaneReport, PlaneUpdate};
pub use service::TelemetryService;
pub use source::{SimulatedSource, TelemetrySource};
