//! Runtime configuration for the calibration controller.
//!
//! Separate from the TOML-deserialized config in `ir_config`; see
//! `conversions` for the mapping.

/// Fixed delays of a calibration session, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTiming {
    /// After collaborators are initialized, before the first prompt.
    pub startup_ms: u64,
    /// After each button press, before the first sample.
    pub settle_ms: u64,
    /// After every sample.
    pub sample_interval_ms: u64,
}

impl CalibrationTiming {
    /// No delays at all; for simulations and tests.
    pub const NONE: Self = Self {
        startup_ms: 0,
        settle_ms: 0,
        sample_interval_ms: 0,
    };
}

impl Default for CalibrationTiming {
    fn default() -> Self {
        Self {
            startup_ms: 500,
            settle_ms: 500,
            sample_interval_ms: 20,
        }
    }
}

/// The two independent switches of a session. Neither implies the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationOptions {
    /// Send every sample over the serial transport.
    pub stream_telemetry: bool,
    /// Store the rounded per-distance mean in the calibration table.
    pub save_means: bool,
}
