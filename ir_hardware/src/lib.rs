pub mod error;
pub mod link;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use ir_traits::regs::{ADEN, ADSC, DATA_MASK, MUX_MASK, REFS_INTERNAL_2V56, REFS_MASK};
use ir_traits::{AdcRegisters, Button};
use std::cell::Cell;
use std::rc::Rc;

pub use link::{ChannelLink, LinkHost, WriteLink, channel_link};

// Sensor response used to synthesize codes; same datasheet fit the
// analytical converter inverts.
const SIM_SLOPE: f32 = 0.042977;
const SIM_INTERCEPT: f32 = -0.009167;
const SIM_BIAS_CM: f32 = 0.42;

/// Reflective target in front of the simulated sensor.
///
/// Cloning shares the position, so an operator model can move the target the
/// converter is looking at.
#[derive(Clone)]
pub struct SimulatedTarget {
    distance_cm: Rc<Cell<f32>>,
    jitter_codes: u16,
    rng: Rc<Cell<u32>>,
}

impl SimulatedTarget {
    pub fn new(distance_cm: f32) -> Self {
        Self {
            distance_cm: Rc::new(Cell::new(distance_cm)),
            jitter_codes: 2,
            rng: Rc::new(Cell::new(0x2545_F491)),
        }
    }

    /// Peak-to-peak noise added to every code is `2 * jitter + 1` codes.
    pub fn with_jitter(mut self, jitter_codes: u16) -> Self {
        self.jitter_codes = jitter_codes;
        self
    }

    pub fn distance_cm(&self) -> f32 {
        self.distance_cm.get()
    }

    pub fn set_distance_cm(&self, d: f32) {
        self.distance_cm.set(d);
    }

    /// Noise-free code the sensor would produce at the current distance with
    /// the internal 2.56 V reference.
    pub fn ideal_code(&self) -> u16 {
        let d = self.distance_cm.get().max(0.0);
        let volts = (1.0 / (d + SIM_BIAS_CM) - SIM_INTERCEPT) / SIM_SLOPE;
        let code = (volts * 1024.0 / 2.56).round();
        code.clamp(0.0, f32::from(DATA_MASK)) as u16
    }

    fn sample(&self) -> u16 {
        let ideal = i32::from(self.ideal_code());
        if self.jitter_codes == 0 {
            return ideal as u16;
        }
        // xorshift32
        let mut x = self.rng.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng.set(x);
        let span = u32::from(self.jitter_codes) * 2 + 1;
        let noise = (x % span) as i32 - i32::from(self.jitter_codes);
        (ideal + noise).clamp(0, i32::from(DATA_MASK)) as u16
    }
}

/// In-memory register file behaving like the ATmega ADC block.
///
/// Setting ADSC while ADEN is set starts a conversion that completes after
/// `conversion_polls` reads of the control register; ADSC then reads back as
/// clear and the data register holds the new code. Setting ADSC while the
/// converter is disabled is ignored and the data register keeps its value.
pub struct SimulatedAdc {
    mux: u8,
    control: u8,
    data: u16,
    conversion_polls: u32,
    polls_left: u32,
    wired_channel: u8,
    target: SimulatedTarget,
}

impl SimulatedAdc {
    pub fn new(target: SimulatedTarget) -> Self {
        SimulatedAdc {
            mux: 0,
            control: 0,
            data: 0,
            conversion_polls: 13,
            polls_left: 0,
            wired_channel: 2,
            target,
        }
    }

    pub fn with_conversion_polls(mut self, polls: u32) -> Self {
        self.conversion_polls = polls;
        self
    }

    pub fn with_wired_channel(mut self, channel: u8) -> Self {
        self.wired_channel = channel;
        self
    }

    pub fn target(&self) -> &SimulatedTarget {
        &self.target
    }

    pub fn mux(&self) -> u8 {
        self.mux
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    fn latch(&mut self) {
        let channel = self.mux & MUX_MASK;
        let internal_ref = self.mux & REFS_MASK == REFS_INTERNAL_2V56;
        self.data = if channel == self.wired_channel && internal_ref {
            self.target.sample()
        } else if channel == self.wired_channel {
            // AVCC/AREF at 5 V: same voltage, coarser code
            ((u32::from(self.target.sample()) * 256) / 500) as u16
        } else {
            0
        };
        tracing::trace!(raw = self.data, channel, "simulated conversion complete");
    }
}

impl AdcRegisters for SimulatedAdc {
    fn write_mux(&mut self, value: u8) {
        self.mux = value;
    }

    fn write_control(&mut self, value: u8) {
        let starting = value & ADSC != 0 && self.control & ADSC == 0;
        if value & ADEN == 0 {
            self.control = value & !ADSC;
            self.polls_left = 0;
            return;
        }
        self.control = value;
        if starting {
            self.polls_left = self.conversion_polls;
            if self.polls_left == 0 {
                self.latch();
                self.control &= !ADSC;
            }
        }
    }

    fn read_control(&mut self) -> u8 {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            if self.polls_left == 0 {
                self.latch();
                self.control &= !ADSC;
            }
        }
        self.control
    }

    fn read_data(&mut self) -> u16 {
        self.data & DATA_MASK
    }
}

/// Operator model for calibration: moves the target to the next mark on each
/// button press. With an inner button the simulated operator waits for a real
/// press first (e.g. Enter on a terminal).
pub struct SimulatedOperator {
    target: SimulatedTarget,
    marks: std::vec::IntoIter<f32>,
    inner: Option<Box<dyn Button>>,
    presses: u32,
}

impl SimulatedOperator {
    pub fn new(target: SimulatedTarget, marks: impl IntoIterator<Item = f32>) -> Self {
        Self {
            target,
            marks: marks.into_iter().collect::<Vec<_>>().into_iter(),
            inner: None,
            presses: 0,
        }
    }

    pub fn with_button(mut self, button: Box<dyn Button>) -> Self {
        self.inner = Some(button);
        self
    }

    pub fn presses(&self) -> u32 {
        self.presses
    }
}

impl Button for SimulatedOperator {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self.inner.as_mut() {
            Some(b) => b.init(),
            None => Ok(()),
        }
    }

    fn wait_press(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(b) = self.inner.as_mut() {
            b.wait_press()?;
        }
        if let Some(d) = self.marks.next() {
            self.target.set_distance_cm(d);
            tracing::debug!(distance_cm = d, "simulated operator moved target");
        }
        self.presses += 1;
        Ok(())
    }
}
