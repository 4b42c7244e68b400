//! The composed pipeline every capture front-end drives:
//! fragments -> `LineAssembler` -> `LineClassifier` -> `PhaseLifecycle` -> sink.

use std::io;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::UiEvent;
use crate::config::{CaptureConfig, SinkErrorPolicy};
use crate::phase::{LifecycleState, Phase, PhaseLifecycle};
use crate::sink::{EventSink, SinkError};
use crate::stream::{LineAssembler, LineClassifier};

/// What one capture produced, for a host that keeps chat history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub phases: Vec<Phase>,
    pub utterances: Vec<String>,
    pub delivery_failures: usize,
    pub bytes_consumed: usize,
}

impl CaptureReport {
    pub fn log_line_count(&self) -> usize {
        self.phases.iter().map(|p| p.log_lines.len()).sum()
    }
}

#[derive(Debug)]
pub struct PhaseStream<S: EventSink> {
    assembler: LineAssembler,
    lifecycle: PhaseLifecycle,
    sink: S,
    policy: SinkErrorPolicy,

    utterances: Vec<String>,
    delivery_failures: usize,
    bytes_consumed: usize,
}

impl<S: EventSink> PhaseStream<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, &CaptureConfig::default())
    }

    pub fn with_config(sink: S, config: &CaptureConfig) -> Self {
        Self {
            assembler: LineAssembler::new(),
            lifecycle: PhaseLifecycle::new(config.default_title.clone()),
            sink,
            policy: config.sink_error_policy,
            utterances: Vec::new(),
            delivery_failures: 0,
            bytes_consumed: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &PhaseLifecycle {
        &self.lifecycle
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn delivery_failures(&self) -> usize {
        self.delivery_failures
    }

    /// Feed a text fragment.
    pub fn push(&mut self, fragment: &str) -> Result<(), SinkError> {
        self.push_bytes(fragment.as_bytes())
    }

    /// Feed raw bytes. Every completed line is processed even if an earlier
    /// one failed to deliver; the first failure is returned (under `Fail`).
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.bytes_consumed += bytes.len();

        let mut first_err = None;
        for line in self.assembler.feed_bytes(bytes) {
            if let Err(e) = self.process_line(&line) {
                first_err.get_or_insert(e);
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Feed one already-complete line, bypassing the assembler. Used when
    /// the caller assembles lines per source (stdout and stderr separately).
    /// The caller owns the raw bytes, so it reports them via `record_consumed`.
    pub fn push_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.process_line(line)
    }

    /// Count raw input bytes that reached this stream through `push_line`.
    pub fn record_consumed(&mut self, bytes: usize) {
        self.bytes_consumed += bytes;
    }

    /// Close the current phase now, without waiting for the next marker.
    /// An unterminated partial line stays pending.
    pub fn flush_phase(&mut self) -> Result<(), SinkError> {
        let mut events = Vec::new();
        self.lifecycle.close(&mut events);
        self.deliver(events)
    }

    /// Drain the trailing partial line, close the open phase, finish the
    /// sink. Delivery failures here are counted, never returned: a capture
    /// always ends.
    pub fn finish(mut self) -> (S, CaptureReport) {
        if let Some(tail) = self.assembler.drain() {
            let _ = self.process_line(&tail);
        }
        let _ = self.flush_phase();

        if let Err(e) = self.sink.finish() {
            self.delivery_failures += 1;
            warn!(error = %e, "sink finish failed");
        }

        let report = CaptureReport {
            phases: self.lifecycle.take_completed(),
            utterances: self.utterances,
            delivery_failures: self.delivery_failures,
            bytes_consumed: self.bytes_consumed,
        };
        (self.sink, report)
    }

    fn process_line(&mut self, line: &str) -> Result<(), SinkError> {
        let classified = LineClassifier::classify(line);
        let mut events = Vec::new();
        self.lifecycle.apply(classified, &mut events);
        self.deliver(events)
    }

    fn deliver(&mut self, events: Vec<UiEvent>) -> Result<(), SinkError> {
        let mut first_err = None;

        for event in events {
            if let UiEvent::Utterance { text } = &event {
                self.utterances.push(text.clone());
            }

            let kind = event.kind();
            if let Err(e) = self.sink.emit(event) {
                self.delivery_failures += 1;
                warn!(event = kind, error = %e, "sink delivery failed");
                first_err.get_or_insert(e);
            }
        }

        match (first_err, self.policy) {
            (Some(e), SinkErrorPolicy::Fail) => Err(e),
            _ => Ok(()),
        }
    }
}

impl<S: EventSink> io::Write for PhaseStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    /// Writer flush is not a protocol boundary; phases close on markers.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
