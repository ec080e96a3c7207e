//! Plane report decoding
//!
//! A [`PlaneReport`] is the typed sample produced by a telemetry source. The
//! wire form sent to viewers is a [`PlaneUpdate`]: positions stay raw
//! floating point, while display-only fields are pre-formatted strings and
//! the heading is truncated to whole degrees.

use serde::Serialize;

/// One typed telemetry sample for the user aircraft
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneReport {
    pub title: String,
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Feet
    pub altitude: f64,
    /// Degrees true
    pub heading: f64,
    /// Knots
    pub airspeed: f64,
    /// Knots
    pub airspeed_true: f64,
    /// Feet per minute
    pub vertical_speed: f64,
    /// Degrees
    pub flaps: f64,
    /// Percent
    pub trim: f64,
    /// Percent
    pub rudder_trim: f64,
}

/// Self-describing wire object broadcast to viewers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaneUpdate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: String,
    pub heading: i64,
    pub airspeed: String,
    pub airspeed_true: String,
    pub vertical_speed: String,
    pub flaps: String,
    pub trim: String,
    pub rudder_trim: String,
}

impl PlaneReport {
    /// Decode this sample into the wire update consumed by viewers
    pub fn to_update(&self) -> PlaneUpdate {
        PlaneUpdate {
            kind: "plane",
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: format!("{:.0}", self.altitude),
            heading: self.heading as i64,
            airspeed: format!("{:.0}", self.airspeed),
            airspeed_true: format!("{:.0}", self.airspeed_true),
            vertical_speed: format!("{:.0}", self.vertical_speed),
            flaps: format!("{:.0}", self.flaps),
            trim: format!("{:.1}", self.trim),
            rudder_trim: format!("{:.1}", self.rudder_trim),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PlaneReport {
        PlaneReport {
            title: "Cessna 172".to_string(),
            latitude: 60.193,
            longitude: 11.1,
            altitude: 1234.6,
            heading: 187.9,
            airspeed: 104.4,
            airspeed_true: 110.2,
            vertical_speed: -320.7,
            flaps: 10.2,
            trim: 2.25,
            rudder_trim: -0.55,
        }
    }

    #[test]
    fn test_update_formats_display_fields() {
        let update = sample_report().to_update();

        assert_eq!(update.kind, "plane");
        assert_eq!(update.altitude, "1235");
        assert_eq!(update.heading, 187);
        assert_eq!(update.airspeed, "104");
        assert_eq!(update.vertical_speed, "-321");
        assert_eq!(update.trim, "2.2");
        assert_eq!(update.rudder_trim, "-0.6");
    }

    #[test]
    fn test_update_keeps_raw_position() {
        let update = sample_report().to_update();

        assert_eq!(update.latitude, 60.193);
        assert_eq!(update.longitude, 11.1);
    }

    #[test]
    fn test_update_serializes_with_type_discriminator() {
        let update = sample_report().to_update();
        let value: serde_json::Value = serde_json::to_value(&update).unwrap();

        assert_eq!(value["type"], "plane");
        assert_eq!(value["altitude"], "1235");
        assert_eq!(value["heading"], 187);
    }
}
