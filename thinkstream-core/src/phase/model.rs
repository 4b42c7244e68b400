//! Phase model.
//!
//! Stable UUID ids + UTC timing so a host can persist closed phases next to
//! its chat history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PhaseId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub title: String,
    pub log_lines: Vec<String>,
    pub opened_at: DateTime<Utc>,
    /// `None` while the phase is still accumulating lines.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Phase {
    pub fn open_now(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            log_lines: Vec::new(),
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.log_lines.is_empty()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.closed_at
            .map(|end| (end - self.opened_at).num_milliseconds())
    }

    pub(crate) fn mark_closed(&mut self) {
        self.closed_at = Some(Utc::now());
    }
}
