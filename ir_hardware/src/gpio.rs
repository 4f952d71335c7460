//! Raspberry Pi backends: GPIO push-button and UART telemetry/command link.

use std::time::Duration;

use ir_traits::{Button, SerialRx, SerialTx};
use rppal::gpio::{Gpio, InputPin};
use rppal::uart::{Parity, Uart};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::wait_for_level;

const BUTTON_POLL: Duration = Duration::from_millis(5);
const BUTTON_DEBOUNCE_N: u8 = 3;

pub struct GpioButton {
    pin: InputPin,
    active_low: bool,
}

impl GpioButton {
    pub fn new(bcm_pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = if active_low {
            pin.into_input_pullup()
        } else {
            pin.into_input_pulldown()
        };
        Ok(Self { pin, active_low })
    }

    fn pressed(&self) -> bool {
        self.pin.is_low() == self.active_low
    }
}

impl Button for GpioButton {
    fn wait_press(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // A press counts once it is released again, so one push never
        // satisfies two consecutive prompts.
        wait_for_level(|| self.pressed(), true, BUTTON_DEBOUNCE_N, BUTTON_POLL);
        trace!("button down");
        wait_for_level(|| self.pressed(), false, BUTTON_DEBOUNCE_N, BUTTON_POLL);
        debug!("button press");
        Ok(())
    }
}

pub struct UartLink {
    uart: Uart,
}

impl UartLink {
    /// 8N1 at `baud` on `device` (e.g. `/dev/serial0`).
    pub fn open(device: &str, baud: u32) -> Result<Self> {
        let mut uart = Uart::with_path(device, baud, Parity::None, 8, 1)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        // Block until at least one byte is available.
        uart.set_read_mode(1, Duration::ZERO)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        Ok(Self { uart })
    }
}

impl SerialTx for UartLink {
    fn send(
        &mut self,
        text: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut buf = text.as_bytes();
        while !buf.is_empty() {
            let n = self
                .uart
                .write(buf)
                .map_err(|e| HwError::Uart(e.to_string()))?;
            buf = &buf[n..];
        }
        Ok(())
    }
}

impl SerialRx for UartLink {
    fn recv_byte(&mut self) -> std::result::Result<u8, Box<dyn std::error::Error + Send + Sync>> {
        let mut byte = [0u8; 1];
        loop {
            let n = self
                .uart
                .read(&mut byte)
                .map_err(|e| HwError::Uart(e.to_string()))?;
            if n == 1 {
                return Ok(byte[0]);
            }
        }
    }
}
