//! Line format of the calibration telemetry stream.
//!
//! ```text
//! Distances, Readings
//! 9, 1001
//! 9, 998
//! ```

/// First line of every stream.
pub const HEADER: &str = "Distances, Readings\n";

/// One `"<distance>, <raw>\n"` sample line, both fields plain decimal.
pub fn sample_line(distance_cm: u8, raw: u16) -> String {
    format!("{distance_cm}, {raw}\n")
}
