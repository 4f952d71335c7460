//! Bit layout of the converter's register file (ATmega128 ADC block).
//!
//! Only the hardware boundary (`AdcRegisters` implementations and the typed
//! configuration in `ir_core::adc`) should touch these.

// Multiplexer selection register.
/// Reference selection bits: `11` = internal 2.56 V.
pub const REFS_MASK: u8 = 0xC0;
pub const REFS_AREF: u8 = 0x00;
pub const REFS_AVCC: u8 = 0x40;
pub const REFS_INTERNAL_2V56: u8 = 0xC0;
/// Left-adjust result; never set by this subsystem.
pub const ADLAR: u8 = 0x20;
/// Channel selection bits (single-ended channels 0..=7 occupy the low three).
pub const MUX_MASK: u8 = 0x1F;

// Control and status register.
pub const ADEN: u8 = 0x80;
/// Start conversion; reads back as 1 while a conversion is in progress.
pub const ADSC: u8 = 0x40;
/// Free-running mode.
pub const ADFR: u8 = 0x20;
pub const ADIF: u8 = 0x10;
/// Interrupt enable; left unset, conversions are always polled.
pub const ADIE: u8 = 0x08;
pub const ADPS_MASK: u8 = 0x07;

/// Conversion results are 10 bits wide.
pub const DATA_MASK: u16 = 0x03FF;
