//! Telemetry source seam
//!
//! The real simulator SDK binding lives outside this crate; the relay only
//! depends on this trait. The built-in [`SimulatedSource`] flies a slow
//! orbit so the relay is usable (and testable) without a simulator attached.

use async_trait::async_trait;

use crate::error::Result;

use super::report::PlaneReport;

/// Producer of typed plane reports, with command write-back
#[async_trait]
pub trait TelemetrySource: Send {
    /// Take the next sample, if one is available
    async fn sample(&mut self) -> Result<Option<PlaneReport>>;

    /// Move the aircraft to the given position
    async fn relocate(&mut self, lat: f64, lng: f64, altitude: f64) -> Result<()>;
}

/// Deterministic stand-in source: orbits the start position at a fixed
/// airspeed, climbing gently toward a cruise altitude
pub struct SimulatedSource {
    report: PlaneReport,
    tick: u64,
}

const CRUISE_ALTITUDE: f64 = 4500.0;
const ORBIT_DEGREES_PER_TICK: f64 = 0.45;

impl SimulatedSource {
    pub fn new() -> Self {
        Self {
            report: PlaneReport {
                title: "Skyrelay Trainer".to_string(),
                latitude: 60.1939,
                longitude: 11.1004,
                altitude: 681.0,
                heading: 0.0,
                airspeed: 105.0,
                airspeed_true: 109.0,
                vertical_speed: 0.0,
                flaps: 0.0,
                trim: 1.5,
                rudder_trim: 0.0,
            },
            tick: 0,
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SimulatedSource {
    async fn sample(&mut self) -> Result<Option<PlaneReport>> {
        self.tick += 1;

        let report = &mut self.report;
        report.heading = (report.heading + ORBIT_DEGREES_PER_TICK) % 360.0;

        let heading_rad = report.heading.to_radians();
        report.latitude += 0.0004 * heading_rad.cos();
        report.longitude += 0.0004 * heading_rad.sin();

        if report.altitude < CRUISE_ALTITUDE {
            report.altitude = (report.altitude + 12.0).min(CRUISE_ALTITUDE);
            report.vertical_speed = 700.0;
        } else {
            report.vertical_speed = 0.0;
        }

        Ok(Some(report.clone()))
    }

    async fn relocate(&mut self, lat: f64, lng: f64, altitude: f64) -> Result<()> {
        self.report.latitude = lat;
        self.report.longitude = lng;
        self.report.altitude = altitude;
        self.report.vertical_speed = 0.0;
        Ok(())
    }
}
