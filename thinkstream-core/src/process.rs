//! Child-process capture: run an agent with piped stdout/stderr and drive a
//! `PhaseStream` with everything it prints.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::pipeline::{CaptureReport, PhaseStream};
use crate::sink::EventSink;
use crate::stream::LineAssembler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
struct OutputChunk {
    source: OutputSource,
    bytes: Vec<u8>,
}

/// How to launch the agent.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    capture_stderr: bool,
    tee: bool,
}

/// Result of a captured run.
#[derive(Debug)]
pub struct AgentOutcome<S> {
    pub status: ExitStatus,
    pub sink: S,
    pub report: CaptureReport,
}

impl AgentCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            capture_stderr: true,
            tee: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Parse the agent's stderr too. When off, stderr goes straight to ours.
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Echo the raw agent output to our stderr as it is parsed.
    pub fn tee(mut self, tee: bool) -> Self {
        self.tee = tee;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the agent and pump its output through `stream` until both pipes
    /// close. The stream is always finished (trailing line drained, open
    /// phase closed) before this returns, on the error path too.
    pub async fn capture<S: EventSink>(&self, mut stream: PhaseStream<S>) -> Result<AgentOutcome<S>> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn agent `{}`", self.program))?;
        info!(program = %self.program, pid = ?child.id(), "agent spawned");

        let (tx, mut rx) = mpsc::channel::<OutputChunk>(256);
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, OutputSource::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, OutputSource::Stderr, tx.clone());
        }
        drop(tx);

        // One assembler per pipe: a partial stdout line must not be glued to
        // a stderr line that happens to arrive in between.
        let mut stdout_lines = LineAssembler::new();
        let mut stderr_lines = LineAssembler::new();
        let mut pump_err = None;

        while let Some(chunk) = rx.recv().await {
            if self.tee {
                echo_raw(&chunk.bytes);
            }
            stream.record_consumed(chunk.bytes.len());

            let assembler = match chunk.source {
                OutputSource::Stdout => &mut stdout_lines,
                OutputSource::Stderr => &mut stderr_lines,
            };
            for line in assembler.feed_bytes(&chunk.bytes) {
                if let Err(e) = stream.push_line(&line) {
                    pump_err.get_or_insert(e);
                }
            }

            if pump_err.is_some() {
                warn!("sink failed under the `fail` policy; stopping the agent");
                let _ = child.start_kill();
                break;
            }
        }

        for tail in [stdout_lines.drain(), stderr_lines.drain()].into_iter().flatten() {
            let _ = stream.push_line(&tail);
        }

        let waited = child.wait().await;
        let (sink, report) = stream.finish();

        if let Some(e) = pump_err {
            return Err(e).context("Event delivery failed");
        }
        let status = waited.context("Failed to wait for agent")?;

        info!(
            program = %self.program,
            code = ?status.code(),
            phases = report.phases.len(),
            utterances = report.utterances.len(),
            "agent finished"
        );

        Ok(AgentOutcome {
            status,
            sink,
            report,
        })
    }
}

fn spawn_reader<R>(mut reader: R, source: OutputSource, tx: mpsc::Sender<OutputChunk>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = OutputChunk {
                        source,
                        bytes: buf[..n].to_vec(),
                    };
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(?source, error = %e, "agent pipe read failed");
                    break;
                }
            }
        }
    });
}

fn echo_raw(bytes: &[u8]) {
    use std::io::Write;

    let mut err = std::io::stderr().lock();
    let _ = err.write_all(bytes);
    let _ = err.flush();
}
