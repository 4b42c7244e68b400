use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use thinkstream_cli::config::{CliConfig, default_config_path};
use thinkstream_cli::render::{RenderFormat, ansi_enabled};
use thinkstream_cli::replay::replay_reader;
use thinkstream_cli::{demo, util};
use thinkstream_core::{AgentCommand, CaptureReport, EventSink, PhaseStream, capture};

#[derive(Debug, Parser)]
#[command(name = "thinkstream", version, about = "Turn agent PHASE:/SAY: output into UI events")]
struct Cli {
    /// Config file (default: <config dir>/thinkstream/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an agent and render its output live.
    Run {
        #[command(flatten)]
        render: RenderArgs,
        /// Do not read the agent's stderr.
        #[arg(long)]
        no_stderr: bool,
        /// Also echo the raw agent output to stderr.
        #[arg(long)]
        tee: bool,
        /// Agent program followed by its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        agent: Vec<String>,
    },
    /// Render a recorded transcript (file or stdin).
    Replay {
        #[command(flatten)]
        render: RenderArgs,
        path: Option<PathBuf>,
    },
    /// Run the built-in mock agent.
    Demo {
        #[command(flatten)]
        render: RenderArgs,
        #[arg(long, default_value = "What is the weather?")]
        input: String,
        /// Pause between steps, in milliseconds.
        #[arg(long, default_value_t = 300)]
        pause_ms: u64,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Debug, clap::Args)]
struct RenderArgs {
    #[arg(long, value_enum)]
    format: Option<RenderFormat>,
    /// Title for output that arrives before any PHASE: line.
    #[arg(long)]
    default_title: Option<String>,
    /// Plain status output without ANSI styling.
    #[arg(long)]
    no_ansi: bool,
}

impl RenderArgs {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(format) = self.format {
            config.render.format = format;
        }
        if let Some(title) = &self.default_title {
            config.apply_default_title(title);
        }
        if self.no_ansi {
            config.render.ansi = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_tracing(cli.verbose);
    util::install_panic_hook();

    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            render,
            no_stderr,
            tee,
            agent,
        } => {
            render.apply(&mut config);
            if no_stderr {
                config.capture.capture_stderr = false;
            }
            let code = run_agent(&config, agent, tee).await?;
            std::process::exit(code);
        }
        Command::Replay { render, path } => {
            render.apply(&mut config);
            replay(&config, path)
        }
        Command::Demo {
            render,
            input,
            pause_ms,
        } => {
            render.apply(&mut config);
            let pause = Duration::from_millis(pause_ms);
            // the mock agent sleeps between steps; keep it off the runtime threads
            tokio::task::spawn_blocking(move || run_demo(&config, &input, pause))
                .await
                .context("Demo agent task failed")?;
            Ok(())
        }
        Command::Config => {
            if let Some(path) = cli.config.or_else(default_config_path) {
                eprintln!("# {}", path.display());
            }
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn run_agent(config: &CliConfig, agent: Vec<String>, tee: bool) -> Result<i32> {
    let mut words = agent.into_iter();
    let program = words.next().context("No agent program given")?;

    let sink = stdout_sink(config);
    let stream = PhaseStream::with_config(sink, &config.capture);

    let outcome = AgentCommand::new(program)
        .args(words)
        .capture_stderr(config.capture.capture_stderr)
        .tee(tee)
        .capture(stream)
        .await?;

    log_report(&outcome.report);
    Ok(util::exit_code(outcome.status))
}

fn replay(config: &CliConfig, path: Option<PathBuf>) -> Result<()> {
    let stream = PhaseStream::with_config(stdout_sink(config), &config.capture);

    let (_sink, report, copied) = match &path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open transcript {}", path.display()))?;
            replay_reader(BufReader::new(file), stream)
        }
        None => replay_reader(io::stdin().lock(), stream),
    };

    log_report(&report);
    copied.context("Failed to replay transcript")?;
    Ok(())
}

fn run_demo(config: &CliConfig, input: &str, pause: Duration) {
    let sink = stdout_sink(config);
    let captured = capture(sink, &config.capture, |_scope| {
        demo::weather_agent(input, pause);
    });
    log_report(&captured.report);
}

fn stdout_sink(config: &CliConfig) -> Box<dyn EventSink> {
    let ansi = ansi_enabled(config.render.ansi, io::stdout().is_terminal());
    config.render.format.sink(io::stdout(), ansi)
}

fn log_report(report: &CaptureReport) {
    info!(
        phases = report.phases.len(),
        log_lines = report.log_line_count(),
        utterances = report.utterances.len(),
        delivery_failures = report.delivery_failures,
        bytes = report.bytes_consumed,
        "capture finished"
    );
}
