/// Marker that opens (or replaces) the current phase.
pub const PHASE_PREFIX: &str = "PHASE:";

/// Marker for a direct utterance.
pub const SAY_PREFIX: &str = "SAY:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    PhaseMarker { title: String },
    UtteranceMarker { text: String },
    LogLine { text: String },
    Blank,
}

impl ClassifiedLine {
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            ClassifiedLine::PhaseMarker { .. } | ClassifiedLine::UtteranceMarker { .. }
        )
    }
}

pub struct LineClassifier;

impl LineClassifier {
    /// Classify one line. Prefixes are case-sensitive and checked in the
    /// order PHASE, SAY, then everything else is a log line.
    pub fn classify(line: &str) -> ClassifiedLine {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return ClassifiedLine::Blank;
        }

        if let Some(rest) = trimmed.strip_prefix(PHASE_PREFIX) {
            return ClassifiedLine::PhaseMarker {
                title: rest.trim().to_string(),
            };
        }

        if let Some(rest) = trimmed.strip_prefix(SAY_PREFIX) {
            return ClassifiedLine::UtteranceMarker {
                text: rest.trim().to_string(),
            };
        }

        ClassifiedLine::LogLine {
            text: trimmed.to_string(),
        }
    }
}
