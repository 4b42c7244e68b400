//! Phase lifecycle.
//!
//! Inputs:
//! - classified lines, in arrival order
//! - `close()` when the owning capture ends (or `flush_thinking()`)
//!
//! Output:
//! - ordered `UiEvent`s, appended to the caller's buffer
//! - closed phases, kept until the caller takes them
//!
//! The state change for a line is applied before any of its events reach a
//! sink, so a failed delivery can never leave the lifecycle out of step.

use tracing::debug;

use crate::UiEvent;
use crate::config::DEFAULT_PHASE_TITLE;
use crate::stream::ClassifiedLine;

use super::model::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Open,
}

#[derive(Debug, Clone)]
pub struct PhaseLifecycle {
    default_title: String,

    current: Option<Phase>,
    completed: Vec<Phase>,
}

impl Default for PhaseLifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_PHASE_TITLE)
    }
}

impl PhaseLifecycle {
    pub fn new(default_title: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
            current: None,
            completed: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        if self.current.is_some() {
            LifecycleState::Open
        } else {
            LifecycleState::Idle
        }
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    /// The phase currently accumulating lines, if any.
    pub fn current(&self) -> Option<&Phase> {
        self.current.as_ref()
    }

    /// Phases closed so far, oldest first.
    pub fn completed(&self) -> &[Phase] {
        &self.completed
    }

    pub fn take_completed(&mut self) -> Vec<Phase> {
        std::mem::take(&mut self.completed)
    }

    /// Apply one classified line.
    pub fn apply(&mut self, line: ClassifiedLine, out: &mut Vec<UiEvent>) {
        match line {
            ClassifiedLine::Blank => {}
            ClassifiedLine::PhaseMarker { title } => {
                self.close(out);
                self.open(title, out);
            }
            ClassifiedLine::UtteranceMarker { text } => {
                // An utterance always terminates whatever phase preceded it.
                self.close(out);
                debug!(len = text.len(), "utterance");
                out.push(UiEvent::Utterance { text });
            }
            ClassifiedLine::LogLine { text } => {
                if self.current.is_none() {
                    let title = self.default_title.clone();
                    self.open(title, out);
                }
                if let Some(phase) = &mut self.current {
                    phase.log_lines.push(text.clone());
                }
                out.push(UiEvent::PhaseLog { text });
            }
        }
    }

    /// Close the open phase (if any). Idempotent: a second call emits nothing.
    pub fn close(&mut self, out: &mut Vec<UiEvent>) {
        let Some(mut phase) = self.current.take() else {
            return;
        };

        phase.mark_closed();
        debug!(
            title = %phase.title,
            lines = phase.log_lines.len(),
            duration_ms = ?phase.duration_ms(),
            "phase closed"
        );

        out.push(UiEvent::PhaseClosed {
            title: phase.title.clone(),
            log_lines: phase.log_lines.clone(),
        });
        self.completed.push(phase);
    }

    fn open(&mut self, title: String, out: &mut Vec<UiEvent>) {
        debug!(%title, "phase opened");
        self.current = Some(Phase::open_now(title.clone()));
        out.push(UiEvent::PhaseOpened { title });
    }
}
