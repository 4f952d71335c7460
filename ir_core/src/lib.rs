#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! IR distance sensor logic (hardware-agnostic).
//!
//! All hardware interaction goes through the traits in `ir_traits`: the
//! converter register file, the character display, the push-button, the
//! serial link and the ack/error sinks.
//!
//! ## Architecture
//!
//! - **ADC configuration**: typed settings and their register bytes (`adc`)
//! - **Sampling**: trigger + busy-wait read of one 10-bit code (`sampler`)
//! - **Conversion**: analytical and calibrated raw → cm models (`distance`)
//! - **Calibration**: operator-guided sweep, mean table, telemetry stream
//!   (`calibration`, `telemetry`)
//! - **Dispatch**: single-byte command routing (`dispatch`)
//!
//! Everything is single-threaded and blocking. The `Sampler` is borrowed
//! mutably by whichever operation is using the converter.

pub mod adc;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod dispatch;
pub mod distance;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod sampler;
pub mod telemetry;
pub mod util;

pub use adc::{AdcConfig, Prescaler, VoltageReference};
pub use calibration::{
    CalibrationBuilder, CalibrationController, CalibrationReport, CalibrationTable,
};
pub use config::{CalibrationOptions, CalibrationTiming};
pub use dispatch::{
    Command, DispatchOutcome, Dispatcher, ReadingHandler, ReplyReadingHandler, Subsystem,
};
pub use distance::{CubicModel, DistanceModel, analytical_convert, calibrated_convert};
pub use error::{BuildError, IrError, Result};
pub use sampler::Sampler;
