use std::io::Write;

use super::{EventSink, SinkError};
use crate::UiEvent;

/// Markdown transcript renderer.
///
/// A phase is written once, when it closes: a blockquote title followed by a
/// collapsed `<details>` block holding the logs. Blank lines around the HTML
/// tags are required or most markdown renderers show the tags verbatim.
/// Phases without log lines render nothing.
#[derive(Debug)]
pub struct MarkdownSink<W: Write> {
    out: W,
    summary_label: String,
}

impl<W: Write> MarkdownSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary_label: "View Logs".to_string(),
        }
    }

    pub fn with_summary_label(mut self, label: impl Into<String>) -> Self {
        self.summary_label = label.into();
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for MarkdownSink<W> {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        match event {
            UiEvent::PhaseOpened { .. } | UiEvent::PhaseLog { .. } => return Ok(()),
            UiEvent::PhaseClosed { title, log_lines } => {
                if log_lines.is_empty() {
                    return Ok(());
                }
                let fence = code_fence(&log_lines);
                write!(
                    self.out,
                    "> 🧠 **{title}**\n\n<details>\n<summary>{label}</summary>\n\n{fence}text\n{logs}\n{fence}\n\n</details>\n\n",
                    label = self.summary_label,
                    logs = log_lines.join("\n"),
                )?;
            }
            UiEvent::Utterance { text } => {
                writeln!(self.out, "{text}\n")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// A backtick fence longer than any backtick run inside the logs, so agent
/// output containing fences cannot close the block early.
fn code_fence(lines: &[String]) -> String {
    let longest = lines
        .iter()
        .map(|line| {
            line.split(|c| c != '`')
                .map(str::len)
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}
