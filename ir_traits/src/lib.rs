pub mod clock;
pub mod regs;

pub use clock::{Clock, MonotonicClock};

/// Register file of the converter: the multiplexer/reference register, the
/// control/status register and the 10-bit data register.
pub trait AdcRegisters {
    fn write_mux(&mut self, value: u8);
    fn write_control(&mut self, value: u8);
    fn read_control(&mut self) -> u8;
    /// Combined high and low data bytes of the last conversion.
    fn read_data(&mut self) -> u16;
}

pub trait Display {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn print(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub trait Button {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    /// Block until the operator presses the button.
    fn wait_press(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub trait SerialTx {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn send(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Button + ?Sized> Button for Box<T> {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).init()
    }
    fn wait_press(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).wait_press()
    }
}

impl<T: SerialTx + ?Sized> SerialTx for Box<T> {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).open()
    }
    fn send(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(text)
    }
}

pub trait SerialRx {
    /// Block until one byte arrives.
    fn recv_byte(&mut self) -> Result<u8, Box<dyn std::error::Error + Send + Sync>>;
}

/// Outbound queue acknowledging received command bytes to the host.
pub trait AckQueue {
    fn enqueue(&mut self, byte: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    BadMessage,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::BadMessage => "bad_message",
        }
    }
}

/// Process-wide error sink; reports are fire-and-forget.
pub trait ErrorReporter {
    fn report(&mut self, category: ErrorCategory, message: &str);
}
