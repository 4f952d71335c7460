//! Operator-assisted calibration of the IR sensor.
//!
//! The operator places a target at each whole-centimeter mark from
//! [`MIN_DISTANCE_CM`] to [`MAX_DISTANCE_CM`] and presses the button; the
//! controller then takes [`SAMPLES_PER_DISTANCE`] samples. Samples can be
//! streamed over serial for offline fitting and/or averaged into a
//! [`CalibrationTable`].
//!
//! The table is a data-collection artifact. `distance::calibrated_convert`
//! never consults it.

use std::ops::RangeInclusive;

use ir_traits::{AdcRegisters, Button, Clock, Display, MonotonicClock, SerialTx};
use tracing::{debug, info, info_span, trace, warn};

use crate::config::{CalibrationOptions, CalibrationTiming};
use crate::error::{BuildError, IrError, Result};
use crate::hw_error::map_hw_error;
use crate::sampler::Sampler;
use crate::telemetry;

pub const MIN_DISTANCE_CM: u8 = 9;
pub const MAX_DISTANCE_CM: u8 = 50;
pub const SAMPLES_PER_DISTANCE: u16 = 50;

/// Calibrated distances, ascending.
pub fn distances() -> RangeInclusive<u8> {
    MIN_DISTANCE_CM..=MAX_DISTANCE_CM
}

/// Lines a streaming session emits: the header plus one per sample.
pub fn telemetry_line_count() -> usize {
    1 + distances().count() * usize::from(SAMPLES_PER_DISTANCE)
}

/// Rounded mean raw code per calibrated distance.
///
/// Starts zeroed. Only a calibration session with mean-saving enabled writes
/// to it; every other holder can only read. Nothing checks that entries are
/// monotonic in distance, see [`CalibrationTable::is_strictly_monotonic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTable {
    entries: [u16; MAX_DISTANCE_CM as usize + 1],
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self {
            entries: [0; MAX_DISTANCE_CM as usize + 1],
        }
    }

    /// Entry for `distance_cm`, or `None` outside the calibrated range.
    pub fn get(&self, distance_cm: u8) -> Option<u16> {
        if distances().contains(&distance_cm) {
            Some(self.entries[usize::from(distance_cm)])
        } else {
            None
        }
    }

    pub(crate) fn record(&mut self, distance_cm: u8, mean_raw: u16) {
        debug_assert!(distances().contains(&distance_cm));
        self.entries[usize::from(distance_cm)] = mean_raw;
    }

    /// `(distance_cm, mean_raw)` for every calibrated distance, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        distances().map(|d| (d, self.entries[usize::from(d)]))
    }

    pub fn is_zeroed(&self) -> bool {
        self.entries.iter().all(|&e| e == 0)
    }

    /// True when entries strictly increase or strictly decrease with
    /// distance across the whole range.
    pub fn is_strictly_monotonic(&self) -> bool {
        let values: Vec<u16> = self.iter().map(|(_, v)| v).collect();
        let rising = values.windows(2).all(|w| w[0] < w[1]);
        let falling = values.windows(2).all(|w| w[0] > w[1]);
        rising || falling
    }
}

/// What a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalibrationReport {
    /// Distances visited, in order.
    pub distances: Vec<u8>,
    pub samples: u32,
    /// Telemetry lines sent, header included.
    pub telemetry_lines: u32,
}

pub struct CalibrationController {
    display: Box<dyn Display>,
    button: Box<dyn Button>,
    serial: Option<Box<dyn SerialTx>>,
    clock: Box<dyn Clock>,
    timing: CalibrationTiming,
}

impl std::fmt::Debug for CalibrationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationController")
            .field("has_serial", &self.serial.is_some())
            .field("timing", &self.timing)
            .finish()
    }
}

impl CalibrationController {
    pub fn builder() -> CalibrationBuilder {
        CalibrationBuilder::default()
    }

    pub fn timing(&self) -> &CalibrationTiming {
        &self.timing
    }

    /// Run a full session over every distance in [`distances`].
    ///
    /// Blocks on the button at each distance and has no cancellation path.
    /// Fails only if a collaborator fails, or if streaming is requested
    /// without a serial transport (checked before anything is initialized).
    pub fn run_calibration<R: AdcRegisters>(
        &mut self,
        sampler: &mut Sampler<R>,
        table: &mut CalibrationTable,
        options: CalibrationOptions,
    ) -> Result<CalibrationReport> {
        let span = info_span!(
            "calibration",
            stream = options.stream_telemetry,
            save = options.save_means
        );
        let _enter = span.enter();

        if options.stream_telemetry && self.serial.is_none() {
            return Err(IrError::State(
                "telemetry streaming requested without a serial transport".into(),
            ));
        }

        self.display
            .init()
            .map_err(|e| map_hw_error(&*e, IrError::Display))?;
        self.button
            .init()
            .map_err(|e| map_hw_error(&*e, IrError::Input))?;

        let mut report = CalibrationReport::default();
        if options.stream_telemetry {
            let serial = self.serial_mut()?;
            serial
                .open()
                .map_err(|e| map_hw_error(&*e, IrError::Transport))?;
            serial
                .send(telemetry::HEADER)
                .map_err(|e| map_hw_error(&*e, IrError::Transport))?;
            report.telemetry_lines += 1;
        }

        self.clock.delay_ms(self.timing.startup_ms);
        info!("calibration started");

        let per_sample = f32::from(SAMPLES_PER_DISTANCE);
        for dist in distances() {
            self.show(&format!("Ready to Start {dist} cm"))?;
            self.button
                .wait_press()
                .map_err(|e| map_hw_error(&*e, IrError::Input))?;
            self.show("Sampling...")?;
            self.clock.delay_ms(self.timing.settle_ms);

            // Running mean: each sample contributes raw / N.
            let mut avg = 0.0f32;
            for _ in 0..SAMPLES_PER_DISTANCE {
                let sample = sampler.read_raw();
                report.samples += 1;
                trace!(distance_cm = dist, raw = sample, "calibration sample");
                if options.stream_telemetry {
                    self.serial_mut()?
                        .send(&telemetry::sample_line(dist, sample))
                        .map_err(|e| map_hw_error(&*e, IrError::Transport))?;
                    report.telemetry_lines += 1;
                }
                if options.save_means {
                    avg += f32::from(sample) / per_sample;
                }
                self.clock.delay_ms(self.timing.sample_interval_ms);
            }

            if options.save_means {
                let mean = avg.round() as u16;
                table.record(dist, mean);
                debug!(distance_cm = dist, mean_raw = mean, "mean recorded");
            }
            report.distances.push(dist);
        }

        if options.save_means && !table.is_strictly_monotonic() {
            warn!("calibration table is not strictly monotonic in distance");
        }
        info!(
            samples = report.samples,
            telemetry_lines = report.telemetry_lines,
            "calibration complete"
        );
        Ok(report)
    }

    fn show(&mut self, text: &str) -> Result<()> {
        self.display
            .clear()
            .map_err(|e| map_hw_error(&*e, IrError::Display))?;
        self.display
            .print(text)
            .map_err(|e| map_hw_error(&*e, IrError::Display))
    }

    fn serial_mut(&mut self) -> Result<&mut Box<dyn SerialTx>> {
        self.serial
            .as_mut()
            .ok_or_else(|| IrError::State("serial transport missing".into()))
    }
}

/// Builder for `CalibrationController`. Display and button are required;
/// the serial transport is only needed for streaming sessions.
#[derive(Default)]
pub struct CalibrationBuilder {
    display: Option<Box<dyn Display>>,
    button: Option<Box<dyn Button>>,
    serial: Option<Box<dyn SerialTx>>,
    clock: Option<Box<dyn Clock>>,
    timing: Option<CalibrationTiming>,
}

impl CalibrationBuilder {
    pub fn with_display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn with_button(mut self, button: impl Button + 'static) -> Self {
        self.button = Some(Box::new(button));
        self
    }

    pub fn with_serial(mut self, serial: impl SerialTx + 'static) -> Self {
        self.serial = Some(Box::new(serial));
        self
    }

    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_timing(mut self, timing: CalibrationTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn build(self) -> eyre::Result<CalibrationController> {
        let display = self
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;
        let button = self
            .button
            .ok_or_else(|| eyre::Report::new(BuildError::MissingButton))?;
        Ok(CalibrationController {
            display,
            button,
            serial: self.serial,
            clock: self
                .clock
                .unwrap_or_else(|| Box::new(MonotonicClock::new())),
            timing: self.timing.unwrap_or_default(),
        })
    }
}
