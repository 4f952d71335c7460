//! Routing of single-byte commands from the host link.
//!
//! Every received byte is acknowledged before it is interpreted, including
//! bytes that turn out to be unknown. Unknown codes go to the error reporter
//! and are otherwise harmless.

use std::error::Error;

use ir_traits::{AckQueue, AdcRegisters, ErrorCategory, ErrorReporter, SerialRx, SerialTx};
use tracing::{debug, warn};

use crate::distance::DistanceModel;
use crate::error::{IrError, Result};
use crate::hw_error::map_hw_error;
use crate::sampler::Sampler;

/// Message reported for an unrecognized command code.
pub const BAD_COMMAND_MESSAGE: &str = "Bad IR Command";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Program the converter for the IR sensor.
    Init = 0,
    /// Hand a reading request to the external reading handler.
    Reading = 1,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, u8> {
        match code {
            0 => Ok(Command::Init),
            1 => Ok(Command::Reading),
            other => Err(other),
        }
    }
}

/// Which sensor a reading request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Subsystem {
    Ir,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Ir => "ir",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Configured,
    ReadingHandled,
    /// The code was acknowledged and reported, nothing else happened.
    Rejected(u8),
}

/// Performs a reading on behalf of the dispatcher. Lives outside this
/// module; the dispatcher only says which subsystem asked.
pub trait ReadingHandler<R: AdcRegisters> {
    fn handle_reading(
        &mut self,
        subsystem: Subsystem,
        sampler: &mut Sampler<R>,
    ) -> std::result::Result<(), Box<dyn Error + Send + Sync>>;
}

pub struct Dispatcher<H> {
    rx: Box<dyn SerialRx>,
    ack: Box<dyn AckQueue>,
    reporter: Box<dyn ErrorReporter>,
    handler: H,
}

impl<H> Dispatcher<H> {
    pub fn new(
        rx: impl SerialRx + 'static,
        ack: impl AckQueue + 'static,
        reporter: impl ErrorReporter + 'static,
        handler: H,
    ) -> Self {
        Self {
            rx: Box::new(rx),
            ack: Box::new(ack),
            reporter: Box::new(reporter),
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Block for one command byte, acknowledge it, then act on it.
    ///
    /// An unknown code is not an error: it is reported with
    /// [`ErrorCategory::BadMessage`] and yields [`DispatchOutcome::Rejected`].
    /// Errors come only from the link, the ack queue or the handler.
    pub fn dispatch_one<R>(&mut self, sampler: &mut Sampler<R>) -> Result<DispatchOutcome>
    where
        R: AdcRegisters,
        H: ReadingHandler<R>,
    {
        let code = self
            .rx
            .recv_byte()
            .map_err(|e| map_hw_error(&*e, IrError::Transport))?;
        self.ack
            .enqueue(code)
            .map_err(|e| map_hw_error(&*e, IrError::Transport))?;

        match Command::try_from(code) {
            Ok(Command::Init) => {
                debug!(command = code, "configure");
                sampler.configure();
                Ok(DispatchOutcome::Configured)
            }
            Ok(Command::Reading) => {
                debug!(command = code, subsystem = Subsystem::Ir.as_str(), "reading");
                self.handler
                    .handle_reading(Subsystem::Ir, sampler)
                    .map_err(|e| map_hw_error(&*e, IrError::Handler))?;
                Ok(DispatchOutcome::ReadingHandled)
            }
            Err(bad) => {
                warn!(command = bad, "unrecognized command");
                self.reporter
                    .report(ErrorCategory::BadMessage, BAD_COMMAND_MESSAGE);
                Ok(DispatchOutcome::Rejected(bad))
            }
        }
    }
}

/// Reading handler that answers over serial with one
/// `"<raw>, <cm>\n"` line per sample, distance to two decimals.
pub struct ReplyReadingHandler {
    tx: Box<dyn SerialTx>,
    model: DistanceModel,
    samples: u16,
}

impl ReplyReadingHandler {
    pub fn new(tx: impl SerialTx + 'static) -> Self {
        Self {
            tx: Box::new(tx),
            model: DistanceModel::default(),
            samples: 1,
        }
    }

    pub fn with_model(mut self, model: DistanceModel) -> Self {
        self.model = model;
        self
    }

    /// Samples per request, at least one.
    pub fn with_samples(mut self, samples: u16) -> Self {
        self.samples = samples.max(1);
        self
    }

    pub fn model(&self) -> &DistanceModel {
        &self.model
    }
}

/// Reply line for one sample.
pub fn reply_line(raw: u16, cm: f32) -> String {
    format!("{raw}, {cm:.2}\n")
}

impl<R: AdcRegisters> ReadingHandler<R> for ReplyReadingHandler {
    fn handle_reading(
        &mut self,
        subsystem: Subsystem,
        sampler: &mut Sampler<R>,
    ) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
        for _ in 0..self.samples {
            let raw = sampler.read_raw();
            let cm = self.model.convert(raw);
            debug!(
                subsystem = subsystem.as_str(),
                raw,
                cm,
                model = self.model.name(),
                "reading reply"
            );
            self.tx.send(&reply_line(raw, cm))?;
        }
        Ok(())
    }
}
