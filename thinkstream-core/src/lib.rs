pub mod capture;
pub mod config;
pub mod phase;
pub mod pipeline;
pub mod process;
pub mod sink;
pub mod stream;

// Re-export the main types so users can just use `thinkstream_core::PhaseStream`
pub use capture::{CaptureScope, Captured, capture, flush_thinking};
pub use config::{CaptureConfig, DEFAULT_PHASE_TITLE, SinkErrorPolicy};
pub use phase::{LifecycleState, Phase, PhaseId, PhaseLifecycle};
pub use pipeline::{CaptureReport, PhaseStream};
pub use process::{AgentCommand, AgentOutcome, OutputSource};
pub use sink::{EventSink, SinkError};
pub use stream::{ClassifiedLine, LineAssembler, LineClassifier};

use serde::{Deserialize, Serialize};

/// The event stream handed to a renderer. Order is significant: a renderer
/// groups `PhaseLog` lines under the most recent `PhaseOpened`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// A new collapsible block starts.
    PhaseOpened { title: String },
    /// One log line inside the open block.
    PhaseLog { text: String },
    /// The block is complete; carries everything it accumulated.
    PhaseClosed {
        title: String,
        log_lines: Vec<String>,
    },
    /// A standalone chat message, never inside a block.
    Utterance { text: String },
}

impl UiEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            UiEvent::PhaseOpened { .. } => "phase_opened",
            UiEvent::PhaseLog { .. } => "phase_log",
            UiEvent::PhaseClosed { .. } => "phase_closed",
            UiEvent::Utterance { .. } => "utterance",
        }
    }
}
