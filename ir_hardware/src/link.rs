//! Host-side serial links: an in-process channel pair and a plain writer.

use crossbeam_channel as xch;
use ir_traits::{SerialRx, SerialTx};
use std::io::Write;

use crate::error::HwError;

/// Rover end of an in-process serial link.
///
/// `recv_byte` blocks until the host sends a byte; once every host sender is
/// dropped and the queue is drained it fails with `HwError::LinkClosed`.
pub struct ChannelLink {
    rx: xch::Receiver<u8>,
    tx: xch::Sender<String>,
}

/// Host end of an in-process serial link.
#[derive(Clone)]
pub struct LinkHost {
    pub to_rover: xch::Sender<u8>,
    pub from_rover: xch::Receiver<String>,
}

impl LinkHost {
    /// Everything the rover has sent so far, without blocking.
    pub fn drain_text(&self) -> Vec<String> {
        self.from_rover.try_iter().collect()
    }
}

pub fn channel_link() -> (LinkHost, ChannelLink) {
    let (to_rover, rx) = xch::unbounded();
    let (tx, from_rover) = xch::unbounded();
    (LinkHost { to_rover, from_rover }, ChannelLink { rx, tx })
}

impl SerialRx for ChannelLink {
    fn recv_byte(&mut self) -> Result<u8, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rx.recv().map_err(|_| HwError::LinkClosed)?)
    }
}

impl SerialTx for ChannelLink {
    fn send(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx
            .send(text.to_owned())
            .map_err(|_| HwError::LinkClosed)?;
        Ok(())
    }
}

/// Transmit-only link writing text to any `Write` (stdout, a capture file).
pub struct WriteLink<W: Write> {
    out: W,
}

impl<W: Write> WriteLink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SerialTx for WriteLink<W> {
    fn send(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.out.write_all(text.as_bytes()).map_err(HwError::from)?;
        if text.ends_with('\n') {
            self.out.flush().map_err(HwError::from)?;
        }
        Ok(())
    }
}
