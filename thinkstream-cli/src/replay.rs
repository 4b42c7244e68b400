// thinkstream-cli/src/replay.rs
//
// Feed a recorded transcript through the same pipeline a live agent uses.

use std::io::{self, Read};

use thinkstream_core::{CaptureReport, EventSink, PhaseStream};

/// Copy `reader` into `stream` until EOF or the first read/delivery error.
/// The stream is finished either way, so an open phase is always closed; the
/// copy result is handed back alongside the sink and report.
pub fn replay_reader<R, S>(mut reader: R, mut stream: PhaseStream<S>) -> (S, CaptureReport, io::Result<u64>)
where
    R: Read,
    S: EventSink,
{
    let copied = io::copy(&mut reader, &mut stream);
    if let Err(e) = &copied {
        tracing::warn!(error = %e, "transcript replay stopped early");
    }
    let (sink, report) = stream.finish();
    (sink, report, copied)
}
