//! Typed converter configuration and its translation to register bytes.
//!
//! Callers build an [`AdcConfig`]; only [`AdcConfig::mux_bits`] and
//! [`AdcConfig::control_bits`] know the register layout.

use ir_traits::regs;

/// Multiplexer value for the IR sensor: internal 2.56 V reference,
/// single-ended channel 2.
pub const IR_MUX_VALUE: u8 = 0xC2;
/// Control value for the IR sensor: converter enabled, clock divided by 128.
pub const IR_CONTROL_VALUE: u8 = 0x87;
/// Control-register bit that is set while a conversion is in progress.
pub const CONVERSION_BUSY: u8 = regs::ADSC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageReference {
    /// External AREF pin.
    Aref,
    /// AVCC with external capacitor at AREF.
    Avcc,
    /// Internal 2.56 V bandgap.
    Internal2V56,
}

impl VoltageReference {
    fn bits(self) -> u8 {
        match self {
            VoltageReference::Aref => regs::REFS_AREF,
            VoltageReference::Avcc => regs::REFS_AVCC,
            VoltageReference::Internal2V56 => regs::REFS_INTERNAL_2V56,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Div2,
    Div4,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
}

impl Prescaler {
    fn bits(self) -> u8 {
        match self {
            Prescaler::Div2 => 0b001,
            Prescaler::Div4 => 0b010,
            Prescaler::Div8 => 0b011,
            Prescaler::Div16 => 0b100,
            Prescaler::Div32 => 0b101,
            Prescaler::Div64 => 0b110,
            Prescaler::Div128 => 0b111,
        }
    }

    pub fn divisor(self) -> u32 {
        1 << self.bits()
    }

    pub fn from_divisor(divisor: u16) -> Option<Self> {
        Some(match divisor {
            2 => Prescaler::Div2,
            4 => Prescaler::Div4,
            8 => Prescaler::Div8,
            16 => Prescaler::Div16,
            32 => Prescaler::Div32,
            64 => Prescaler::Div64,
            128 => Prescaler::Div128,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcConfig {
    pub reference: VoltageReference,
    /// Single-ended input channel; only the low three bits are used.
    pub channel: u8,
    pub enabled: bool,
    pub prescaler: Prescaler,
    /// Conversions are polled, so this stays off for the IR sensor.
    pub interrupt_enable: bool,
}

impl AdcConfig {
    /// Configuration of the IR distance sensor.
    pub const IR_SENSOR: Self = Self {
        reference: VoltageReference::Internal2V56,
        channel: 2,
        enabled: true,
        prescaler: Prescaler::Div128,
        interrupt_enable: false,
    };

    pub fn mux_bits(&self) -> u8 {
        self.reference.bits() | (self.channel & 0x07)
    }

    pub fn control_bits(&self) -> u8 {
        let mut bits = self.prescaler.bits();
        if self.enabled {
            bits |= regs::ADEN;
        }
        if self.interrupt_enable {
            bits |= regs::ADIE;
        }
        bits
    }

    /// Conversion clock for a given CPU clock (125 kHz for 16 MHz / 128).
    pub fn conversion_clock_hz(&self, cpu_hz: u32) -> u32 {
        cpu_hz / self.prescaler.divisor()
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self::IR_SENSOR
    }
}
