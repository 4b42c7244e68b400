use std::io::Write;

use super::{EventSink, SinkError};
use crate::UiEvent;

const DIM_ITALIC: &str = "\x1b[2;3m";
const RESET: &str = "\x1b[0m";

/// Live terminal renderer: one status block per phase, logs streamed into it
/// as they arrive, utterances as standalone lines.
#[derive(Debug)]
pub struct StatusSink<W: Write> {
    out: W,
    ansi: bool,
}

impl<W: Write> StatusSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, ansi: false }
    }

    /// Grey/italic phase titles (only makes sense on a real terminal).
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn title(&self, title: &str) -> String {
        if self.ansi {
            format!("{DIM_ITALIC}{title}{RESET}")
        } else {
            title.to_string()
        }
    }
}

impl<W: Write> EventSink for StatusSink<W> {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        match event {
            UiEvent::PhaseOpened { title } => {
                writeln!(self.out, "🧠 {} …", self.title(&title))?;
            }
            UiEvent::PhaseLog { text } => {
                writeln!(self.out, "   │ {text}")?;
            }
            UiEvent::PhaseClosed { title, log_lines } => {
                let noun = if log_lines.len() == 1 { "line" } else { "lines" };
                writeln!(
                    self.out,
                    "   └ ✓ {} ({} {noun})",
                    self.title(&title),
                    log_lines.len()
                )?;
            }
            UiEvent::Utterance { text } => {
                writeln!(self.out, "🤖 {text}")?;
            }
        }
        // Live view: every event must be visible immediately.
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
