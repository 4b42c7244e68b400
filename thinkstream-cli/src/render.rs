// thinkstream-cli/src/render.rs
//
// Backend selection: the parser is always the same, only the sink changes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thinkstream_core::EventSink;
use thinkstream_core::sink::{JsonLinesSink, MarkdownSink, StatusSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Live status blocks in the terminal.
    #[default]
    Status,
    /// Markdown transcript with collapsible log blocks.
    Markdown,
    /// One JSON event per line.
    Jsonl,
}

/// Styling only makes sense on a terminal; files and pipes get plain text.
pub fn ansi_enabled(configured: bool, is_terminal: bool) -> bool {
    configured && is_terminal
}

impl RenderFormat {
    /// Build the sink for this format, writing to `out`.
    pub fn sink<W: Write + 'static>(self, out: W, ansi: bool) -> Box<dyn EventSink> {
        match self {
            RenderFormat::Status => Box::new(StatusSink::new(out).with_ansi(ansi)),
            RenderFormat::Markdown => Box::new(MarkdownSink::new(out)),
            RenderFormat::Jsonl => Box::new(JsonLinesSink::new(out)),
        }
    }
}
