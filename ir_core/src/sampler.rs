//! Blocking access to the converter: configuration, trigger and polled read.
//!
//! A `Sampler` owns the register file. Every operation that touches the
//! converter (calibration, dispatched readings) borrows the sampler mutably,
//! so two of them can never interleave on the same hardware.
use ir_traits::AdcRegisters;
use ir_traits::regs::DATA_MASK;
use tracing::{debug, trace};

use crate::adc::{AdcConfig, CONVERSION_BUSY};
use crate::distance::{DistanceModel, calibrated_convert};
use crate::util::spin_until_clear;

pub struct Sampler<R: AdcRegisters> {
    regs: R,
    config: AdcConfig,
}

impl<R: AdcRegisters> Sampler<R> {
    /// Sampler for the IR sensor configuration. Registers are not touched
    /// until [`Sampler::configure`] is called.
    pub fn new(regs: R) -> Self {
        Self::with_config(regs, AdcConfig::IR_SENSOR)
    }

    pub fn with_config(regs: R, config: AdcConfig) -> Self {
        Self { regs, config }
    }

    pub fn config(&self) -> &AdcConfig {
        &self.config
    }

    /// Program reference, channel, enable and prescaler. Idempotent; never
    /// starts a conversion.
    pub fn configure(&mut self) {
        let mux = self.config.mux_bits();
        let control = self.config.control_bits();
        self.regs.write_mux(mux);
        self.regs.write_control(control);
        debug!(mux, control, "adc configured");
    }

    /// Set the start-conversion bit and return without waiting.
    pub fn trigger(&mut self) {
        let control = self.regs.read_control();
        self.regs.write_control(control | CONVERSION_BUSY);
    }

    /// Trigger a conversion and busy-wait until the converter clears its
    /// busy bit, then return the 10-bit code.
    ///
    /// Blocks the calling thread for one conversion time (13 converter clocks
    /// at the configured prescaler). There is no timeout: a converter that
    /// never finishes hangs the caller.
    pub fn read_raw(&mut self) -> u16 {
        self.trigger();
        let regs = &mut self.regs;
        let polls = spin_until_clear(|| regs.read_control() & CONVERSION_BUSY != 0);
        let raw = self.regs.read_data() & DATA_MASK;
        trace!(raw, polls, "adc conversion");
        raw
    }

    /// Distance in cm using the calibrated polynomial.
    pub fn reading(&mut self) -> f32 {
        calibrated_convert(self.read_raw())
    }

    pub fn reading_with(&mut self, model: &DistanceModel) -> f32 {
        model.convert(self.read_raw())
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_inner(self) -> R {
        self.regs
    }
}
