use serde::{Deserialize, Serialize};

/// Title used when log lines arrive before any `PHASE:` marker.
pub const DEFAULT_PHASE_TITLE: &str = "Thinking";

/// What the stream does when the sink rejects an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkErrorPolicy {
    /// Count + log the failure, keep going. The agent never sees it.
    #[default]
    Log,
    /// Count + log, then hand the error back to the writer.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub default_title: String,
    /// Merge the agent's stderr into the same stream as stdout.
    pub capture_stderr: bool,
    pub sink_error_policy: SinkErrorPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_PHASE_TITLE.to_string(),
            capture_stderr: true,
            sink_error_policy: SinkErrorPolicy::Log,
        }
    }
}

impl CaptureConfig {
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    pub fn with_sink_error_policy(mut self, policy: SinkErrorPolicy) -> Self {
        self.sink_error_policy = policy;
        self
    }

    pub fn with_capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }
}
