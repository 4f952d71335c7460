//! Test and helper mocks for ir_core.
//!
//! Every recording mock writes into a shared [`Journal`], so tests can assert
//! both what happened and in which order across collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ir_traits::regs::{ADSC, DATA_MASK};
use ir_traits::{
    AckQueue, AdcRegisters, Button, Display, ErrorCategory, ErrorReporter, SerialRx, SerialTx,
};

use crate::dispatch::{ReadingHandler, Subsystem};
use crate::sampler::Sampler;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Ordered log shared by the recording mocks.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Entries starting with `prefix`, with the prefix stripped.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_owned))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Register file that replays a fixed script of codes, cycling when it runs
/// out. The busy bit stays set for `busy_polls` reads after each start.
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    codes: Vec<u16>,
    next: usize,
    control: u8,
    data: u16,
    busy_polls: u32,
    busy_left: u32,
    pub mux_writes: Vec<u8>,
    pub control_writes: Vec<u8>,
    pub conversions: u32,
    pub control_reads: u32,
}

impl ScriptedAdc {
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            busy_polls: 3,
            ..Self::default()
        }
    }

    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    fn next_code(&mut self) -> u16 {
        if self.codes.is_empty() {
            return 0;
        }
        let code = self.codes[self.next % self.codes.len()];
        self.next += 1;
        code
    }
}

impl AdcRegisters for ScriptedAdc {
    fn write_mux(&mut self, value: u8) {
        self.mux_writes.push(value);
    }

    fn write_control(&mut self, value: u8) {
        self.control_writes.push(value);
        let starting = value & ADSC != 0 && self.busy_left == 0;
        self.control = value;
        if starting {
            self.conversions += 1;
            self.data = self.next_code();
            self.busy_left = self.busy_polls;
            if self.busy_left == 0 {
                self.control &= !ADSC;
            }
        }
    }

    fn read_control(&mut self) -> u8 {
        self.control_reads += 1;
        if self.busy_left > 0 {
            self.busy_left -= 1;
            if self.busy_left == 0 {
                self.control &= !ADSC;
            }
        }
        self.control
    }

    fn read_data(&mut self) -> u16 {
        // Only readable once the conversion has finished.
        assert_eq!(self.busy_left, 0, "data register read mid-conversion");
        self.data & DATA_MASK
    }
}

/// Display logging `display init`, `display clear`, `display <text>`.
pub struct RecordingDisplay {
    journal: Journal,
}

impl RecordingDisplay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl Display for RecordingDisplay {
    fn init(&mut self) -> Result<(), BoxError> {
        self.journal.push("display init");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BoxError> {
        self.journal.push("display clear");
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), BoxError> {
        self.journal.push(format!("display {text}"));
        Ok(())
    }
}

/// Button that is pressed immediately, logging `button init` / `button press`.
pub struct CountingButton {
    journal: Journal,
}

impl CountingButton {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl Button for CountingButton {
    fn init(&mut self) -> Result<(), BoxError> {
        self.journal.push("button init");
        Ok(())
    }

    fn wait_press(&mut self) -> Result<(), BoxError> {
        self.journal.push("button press");
        Ok(())
    }
}

/// Serial port logging `serial open` and `tx <text>`, and replaying a queue
/// of inbound bytes (an empty queue reads as a closed link).
pub struct RecordingSerial {
    journal: Journal,
    inbound: VecDeque<u8>,
    fail_after: Option<usize>,
    sent: usize,
}

impl RecordingSerial {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            inbound: VecDeque::new(),
            fail_after: None,
            sent: 0,
        }
    }

    pub fn with_inbound(mut self, bytes: impl IntoIterator<Item = u8>) -> Self {
        self.inbound.extend(bytes);
        self
    }

    /// Fail every send after the first `n` succeed.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl SerialTx for RecordingSerial {
    fn open(&mut self) -> Result<(), BoxError> {
        self.journal.push("serial open");
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), BoxError> {
        if self.fail_after.is_some_and(|n| self.sent >= n) {
            return Err("serial buffer overrun".into());
        }
        self.sent += 1;
        self.journal.push(format!("tx {text}"));
        Ok(())
    }
}

impl SerialRx for RecordingSerial {
    fn recv_byte(&mut self) -> Result<u8, BoxError> {
        let b = self.inbound.pop_front().ok_or("serial link closed")?;
        self.journal.push(format!("rx {b}"));
        Ok(b)
    }
}

/// Ack queue logging `ack <byte>`.
pub struct RecordingAck {
    journal: Journal,
}

impl RecordingAck {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl AckQueue for RecordingAck {
    fn enqueue(&mut self, byte: u8) -> Result<(), BoxError> {
        self.journal.push(format!("ack {byte}"));
        Ok(())
    }
}

/// Error reporter logging `error <category>: <message>`.
pub struct RecordingReporter {
    journal: Journal,
}

impl RecordingReporter {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&mut self, category: ErrorCategory, message: &str) {
        self.journal
            .push(format!("error {}: {message}", category.as_str()));
    }
}

/// Reading handler logging `reading <subsystem> <raw>` after one sample.
pub struct RecordingHandler {
    journal: Journal,
}

impl RecordingHandler {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl<R: AdcRegisters> ReadingHandler<R> for RecordingHandler {
    fn handle_reading(
        &mut self,
        subsystem: Subsystem,
        sampler: &mut Sampler<R>,
    ) -> Result<(), BoxError> {
        let raw = sampler.read_raw();
        self.journal
            .push(format!("reading {} {raw}", subsystem.as_str()));
        Ok(())
    }
}
