//! Capture scopes + the active output channel.
//!
//! Agent code that can be handed a writer should be: `PhaseStream` and
//! `CaptureScope` both implement `io::Write`. For code that can't, the
//! scope installs itself as this thread's active output destination, and
//! `agent_print!` / `agent_println!` write there (or to the real stdout when
//! nothing is capturing).
//!
//! Constraints:
//! - the channel is per thread; output from other threads is not captured
//! - one active scope per thread. Entering a second one saves and later
//!   restores the first, but interleaved exits are unsupported (warned)

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::CaptureConfig;
use crate::phase::LifecycleState;
use crate::pipeline::{CaptureReport, PhaseStream};
use crate::sink::EventSink;

/// Type-erased view of whatever is installed as the active destination.
trait ActiveOutput {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()>;
    fn flush_phase(&self) -> io::Result<()>;
}

/// `None` once the owning scope has exited.
type SharedStream<S> = RefCell<Option<PhaseStream<S>>>;

impl<S: EventSink> ActiveOutput for SharedStream<S> {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        // A sink that prints while it is being driven re-enters here.
        let Ok(mut guard) = self.try_borrow_mut() else {
            return passthrough(bytes);
        };
        match guard.as_mut() {
            Some(stream) => stream.push_bytes(bytes).map_err(io::Error::other),
            None => passthrough(bytes),
        }
    }

    fn flush_phase(&self) -> io::Result<()> {
        let Ok(mut guard) = self.try_borrow_mut() else {
            return Ok(());
        };
        match guard.as_mut() {
            Some(stream) => stream.flush_phase().map_err(io::Error::other),
            None => Ok(()),
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<dyn ActiveOutput>>> = const { RefCell::new(None) };
}

fn active() -> Option<Rc<dyn ActiveOutput>> {
    ACTIVE.with(|slot| slot.borrow().clone())
}

fn install(dest: Option<Rc<dyn ActiveOutput>>) -> Option<Rc<dyn ActiveOutput>> {
    ACTIVE.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), dest))
}

fn passthrough(bytes: &[u8]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.flush()
}

/// True while a `CaptureScope` is installed on this thread.
pub fn is_capturing() -> bool {
    active().is_some()
}

/// Write bytes to the active destination (real stdout if none).
pub fn write_active(bytes: &[u8]) -> io::Result<()> {
    match active() {
        Some(dest) => dest.write_bytes(bytes),
        None => passthrough(bytes),
    }
}

#[doc(hidden)]
pub fn write_active_fmt(args: fmt::Arguments<'_>) -> io::Result<()> {
    match args.as_str() {
        Some(s) => write_active(s.as_bytes()),
        None => write_active(args.to_string().as_bytes()),
    }
}

/// Close the active capture's current phase now, so whatever the host shows
/// next lands after the completed block. No-op when nothing is capturing.
pub fn flush_thinking() -> io::Result<()> {
    match active() {
        Some(dest) => dest.flush_phase(),
        None => Ok(()),
    }
}

/// `print!` into the active capture.
#[macro_export]
macro_rules! agent_print {
    ($($arg:tt)*) => {{
        let _ = $crate::capture::write_active_fmt(format_args!($($arg)*));
    }};
}

/// `println!` into the active capture.
#[macro_export]
macro_rules! agent_println {
    () => {
        $crate::agent_print!("\n")
    };
    ($($arg:tt)*) => {{
        let _ = $crate::capture::write_active_fmt(format_args!("{}\n", format_args!($($arg)*)));
    }};
}

/// Scoped capture. Entering installs the pipeline as this thread's active
/// output; exiting (explicitly, or on drop during an early return or panic)
/// drains the trailing line, closes the open phase and restores the previous
/// destination.
pub struct CaptureScope<S: EventSink + 'static> {
    stream: Rc<SharedStream<S>>,
    previous: Option<Rc<dyn ActiveOutput>>,
    exited: bool,
}

impl<S: EventSink + 'static> fmt::Debug for CaptureScope<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureScope")
            .field("has_previous", &self.previous.is_some())
            .field("exited", &self.exited)
            .finish()
    }
}

impl<S: EventSink + 'static> CaptureScope<S> {
    pub fn enter(sink: S, config: &CaptureConfig) -> Self {
        Self::enter_stream(PhaseStream::with_config(sink, config))
    }

    pub fn enter_stream(stream: PhaseStream<S>) -> Self {
        let stream: Rc<SharedStream<S>> = Rc::new(RefCell::new(Some(stream)));
        let dest: Rc<dyn ActiveOutput> = stream.clone();

        let previous = install(Some(dest));
        if previous.is_some() {
            warn!("nested capture scope entered; the outer scope is suspended until this one exits");
        }
        debug!("capture scope entered");

        Self {
            stream,
            previous,
            exited: false,
        }
    }

    /// Current lifecycle state (`Idle` once exited).
    pub fn state(&self) -> LifecycleState {
        self.stream
            .borrow()
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(LifecycleState::Idle)
    }

    /// Close the current phase now (see `flush_thinking`).
    pub fn flush_phase(&self) -> io::Result<()> {
        self.stream.flush_phase()
    }

    /// Flush and restore, returning the sink and what was captured.
    pub fn exit(mut self) -> (S, CaptureReport) {
        match self.release() {
            Some(outcome) => outcome,
            // `exit` consumes the scope, so nothing released it before.
            None => unreachable!("capture scope released twice"),
        }
    }

    fn release(&mut self) -> Option<(S, CaptureReport)> {
        if self.exited {
            return None;
        }
        self.exited = true;

        let stream = self.stream.borrow_mut().take();
        let outcome = stream.map(PhaseStream::finish);

        let ours: Rc<dyn ActiveOutput> = self.stream.clone();
        let replaced = install(self.previous.take());
        if !replaced.is_some_and(|r| Rc::ptr_eq(&r, &ours)) {
            warn!("capture scopes exited out of order; previous destination restored anyway");
        }
        debug!("capture scope exited");

        outcome
    }
}

impl<S: EventSink + 'static> Write for CaptureScope<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: EventSink + 'static> Drop for CaptureScope<S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// What `capture` hands back once the scope has closed.
#[derive(Debug)]
pub struct Captured<T, S> {
    pub value: T,
    pub sink: S,
    pub report: CaptureReport,
}

/// Run `f` inside a capture scope. The scope is flushed and the previous
/// destination restored before `f`'s result (an `Err` included) is returned;
/// a panic in `f` still flushes and restores while unwinding.
pub fn capture<S, T, F>(sink: S, config: &CaptureConfig, f: F) -> Captured<T, S>
where
    S: EventSink + 'static,
    F: FnOnce(&mut CaptureScope<S>) -> T,
{
    let mut scope = CaptureScope::enter(sink, config);
    let value = f(&mut scope);
    let (sink, report) = scope.exit();
    Captured {
        value,
        sink,
        report,
    }
}
