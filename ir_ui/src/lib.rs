#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Terminal stand-ins for the operator panel: a character display and a
//! push-button driven by line input.

use std::io::{BufRead, Write};

use ir_traits::{Button, Display};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Columns of the character LCD on the sensor board.
pub const LCD_COLUMNS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("operator input closed")]
    InputClosed,
    #[error("terminal i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Character display rendered as lines on a writer.
///
/// `clear` starts a new frame and `print` writes at the cursor, clipped to
/// the display width like the real panel.
pub struct TerminalDisplay<W: Write> {
    out: W,
    columns: usize,
    cursor: usize,
    framed: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self::with_columns(out, LCD_COLUMNS)
    }

    pub fn with_columns(out: W, columns: usize) -> Self {
        Self {
            out,
            columns: columns.max(1),
            cursor: 0,
            framed: false,
        }
    }

    /// Terminate the current frame and hand back the writer.
    pub fn into_inner(mut self) -> W {
        if self.framed {
            let _ = writeln!(self.out);
        }
        self.out
    }
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn init(&mut self) -> Result<(), BoxError> {
        self.cursor = 0;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BoxError> {
        if self.framed {
            writeln!(self.out).map_err(UiError::from)?;
        }
        write!(self.out, "| ").map_err(UiError::from)?;
        self.out.flush().map_err(UiError::from)?;
        self.framed = true;
        self.cursor = 0;
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), BoxError> {
        let room = self.columns.saturating_sub(self.cursor);
        let shown: String = text.chars().take(room).collect();
        self.cursor += shown.chars().count();
        write!(self.out, "{shown}").map_err(UiError::from)?;
        self.out.flush().map_err(UiError::from)?;
        Ok(())
    }
}

/// Push-button that counts one press per input line (Enter).
pub struct LineButton<R: BufRead> {
    input: R,
    presses: u32,
}

impl<R: BufRead> LineButton<R> {
    pub fn new(input: R) -> Self {
        Self { input, presses: 0 }
    }

    pub fn presses(&self) -> u32 {
        self.presses
    }
}

impl LineButton<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> Button for LineButton<R> {
    fn wait_press(&mut self) -> Result<(), BoxError> {
        let mut line = String::new();
        let n = self.input.read_line(&mut line).map_err(UiError::from)?;
        if n == 0 {
            return Err(UiError::InputClosed.into());
        }
        self.presses += 1;
        Ok(())
    }
}
