//! Event sinks.
//!
//! The sink is the only place the core touches a presentation layer. Each
//! renderer is one `EventSink` implementation; the parser never changes.
//!
//! - `markdown`: post-hoc transcript with collapsible `<details>` blocks
//! - `status`: live terminal view (one status block per phase)
//! - `jsonl`: one JSON object per event, for piping into another UI
//! - `RecordingSink` / `ChannelSink`: in-memory and async hand-off

pub mod jsonl;
pub mod markdown;
pub mod status;

pub use jsonl::JsonLinesSink;
pub use markdown::MarkdownSink;
pub use status::StatusSink;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::UiEvent;

/// A sink failed to deliver an event. Never produced by the parser itself.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink receiver dropped")]
    Closed,

    #[error("sink backend rejected event: {0}")]
    Backend(String),
}

/// The interface for any rendering backend.
pub trait EventSink {
    /// Deliver one event. Called synchronously, in generation order.
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError>;

    /// Called once after the final event of a capture.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        (**self).emit(event)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        (**self).emit(event)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<UiEvent>,
    finished: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[UiEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<UiEvent> {
        self.events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        self.events.push(event);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

/// Hands events to an ordered queue owned by an async consumer
/// (e.g. a task pushing them to a remote UI). The parser never waits on it.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: UiEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}
