use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use thinkstream_cli::config::{CONFIG_FILE_NAME, CliConfig, ENV_DEFAULT_TITLE, RenderConfig};
use thinkstream_cli::demo::weather_agent;
use thinkstream_cli::render::{RenderFormat, ansi_enabled};
use thinkstream_cli::replay::replay_reader;
use thinkstream_core::sink::RecordingSink;
use thinkstream_core::{
    CaptureConfig, DEFAULT_PHASE_TITLE, PhaseStream, SinkErrorPolicy, UiEvent, capture,
};

/// Writer that stays readable after being boxed into a sink.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn render(format: RenderFormat, ansi: bool, transcript: &str) -> String {
    let buf = SharedBuf::default();
    let mut stream = PhaseStream::new(format.sink(buf.clone(), ansi));
    stream.push(transcript).unwrap();
    let _ = stream.finish();
    buf.text()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_default() {
    let config = CliConfig::default();
    assert_eq!(config.capture.default_title, DEFAULT_PHASE_TITLE);
    assert!(config.capture.capture_stderr);
    assert_eq!(config.capture.sink_error_policy, SinkErrorPolicy::Log);
    assert_eq!(config.render.format, RenderFormat::Status);
    assert!(config.render.ansi);
}

#[test]
fn test_config_empty_toml_is_default() {
    let config = CliConfig::from_toml("").unwrap();
    assert_eq!(config, CliConfig::default());
}

#[test]
fn test_config_partial_toml() {
    let config = CliConfig::from_toml(
        r#"
[capture]
default_title = "Reasoning"

[render]
format = "markdown"
"#,
    )
    .unwrap();

    assert_eq!(config.capture.default_title, "Reasoning");
    assert!(config.capture.capture_stderr);
    assert_eq!(config.render.format, RenderFormat::Markdown);
    assert!(config.render.ansi);
}

#[test]
fn test_config_full_toml() {
    let config = CliConfig::from_toml(
        r#"
[capture]
default_title = "Working"
capture_stderr = false
sink_error_policy = "fail"

[render]
format = "jsonl"
ansi = false
"#,
    )
    .unwrap();

    assert_eq!(
        config.capture,
        CaptureConfig::default()
            .with_default_title("Working")
            .with_capture_stderr(false)
            .with_sink_error_policy(SinkErrorPolicy::Fail)
    );
    assert_eq!(
        config.render,
        RenderConfig {
            format: RenderFormat::Jsonl,
            ansi: false,
        }
    );
}

#[test]
fn test_config_rejects_unknown_format() {
    let result = CliConfig::from_toml("[render]\nformat = \"html\"\n");
    assert!(result.is_err());
}

#[test]
fn test_config_toml_roundtrip() {
    let mut config = CliConfig::default();
    config.capture.default_title = "Planning".to_string();
    config.render.format = RenderFormat::Markdown;

    let text = config.to_toml().unwrap();
    assert!(text.contains("default_title = \"Planning\""));
    assert!(text.contains("format = \"markdown\""));
    assert_eq!(CliConfig::from_toml(&text).unwrap(), config);
}

#[test]
fn test_config_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[render]\nformat = \"jsonl\"\n").unwrap();

    let config = CliConfig::load(Some(&path)).unwrap();
    assert_eq!(config.render.format, RenderFormat::Jsonl);
}

#[test]
fn test_config_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");

    let err = CliConfig::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config"));
}

#[test]
fn test_config_load_invalid_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[capture\n").unwrap();

    let err = CliConfig::from_file(&path).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Failed to parse config"));
    assert!(message.contains(CONFIG_FILE_NAME));
}

#[test]
fn test_apply_default_title() {
    let mut config = CliConfig::default();
    config.apply_default_title("  Pondering ");
    assert_eq!(config.capture.default_title, "Pondering");
}

#[test]
fn test_env_default_title_applied() {
    let mut config = CliConfig::default();
    config.apply_env(|key| (key == ENV_DEFAULT_TITLE).then(|| "Musing".to_string()));
    assert_eq!(config.capture.default_title, "Musing");
}

#[test]
fn test_env_blank_default_title_ignored() {
    let mut config = CliConfig::from_toml("[capture]\ndefault_title = \"From File\"\n").unwrap();
    config.apply_env(|_| Some("  ".to_string()));
    assert_eq!(config.capture.default_title, "From File");
}

#[test]
fn test_env_unset_keeps_file_title() {
    let mut config = CliConfig::from_toml("[capture]\ndefault_title = \"From File\"\n").unwrap();
    config.apply_env(|_| None);
    assert_eq!(config.capture.default_title, "From File");
}

#[test]
fn test_apply_blank_default_title_is_ignored() {
    let mut config = CliConfig::default();
    config.apply_default_title("   ");
    assert_eq!(config.capture.default_title, DEFAULT_PHASE_TITLE);
}

// ============================================================================
// Render Format Tests
// ============================================================================

const TRANSCRIPT: &str = "PHASE: Search\nquery sent\n2 hits\nSAY: Found it.\n";

#[test]
fn test_render_status_plain() {
    let out = render(RenderFormat::Status, false, TRANSCRIPT);
    assert_eq!(
        out,
        "🧠 Search …\n   │ query sent\n   │ 2 hits\n   └ ✓ Search (2 lines)\n🤖 Found it.\n"
    );
}

#[test]
fn test_render_status_ansi_styles_titles() {
    let out = render(RenderFormat::Status, true, TRANSCRIPT);
    assert!(out.contains("\x1b["));
    assert!(out.contains("🤖 Found it."));
}

#[test]
fn test_render_markdown() {
    let out = render(RenderFormat::Markdown, true, TRANSCRIPT);
    assert!(out.contains("**Search**"));
    assert!(out.contains("<details>"));
    assert!(out.contains("query sent\n2 hits"));
    assert!(out.ends_with("Found it.\n\n"));
    // markdown never carries terminal escapes
    assert!(!out.contains("\x1b["));
}

#[test]
fn test_render_jsonl() {
    let out = render(RenderFormat::Jsonl, true, TRANSCRIPT);
    let events: Vec<UiEvent> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0],
        UiEvent::PhaseOpened {
            title: "Search".to_string()
        }
    );
    assert_eq!(
        events[3],
        UiEvent::PhaseClosed {
            title: "Search".to_string(),
            log_lines: vec!["query sent".to_string(), "2 hits".to_string()],
        }
    );
    assert_eq!(
        events[4],
        UiEvent::Utterance {
            text: "Found it.".to_string()
        }
    );
}

#[test]
fn test_ansi_only_on_terminal() {
    assert!(ansi_enabled(true, true));
    assert!(!ansi_enabled(true, false));
    assert!(!ansi_enabled(false, true));
}

#[test]
fn test_render_format_default_is_status() {
    assert_eq!(RenderFormat::default(), RenderFormat::Status);
}

// ============================================================================
// Demo Agent Tests
// ============================================================================

#[test]
fn test_demo_agent_event_sequence() {
    let captured = capture(RecordingSink::new(), &CaptureConfig::default(), |_scope| {
        weather_agent("Is it raining?", Duration::ZERO);
    });

    let kinds: Vec<&str> = captured.sink.events().iter().map(UiEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "phase_opened",
            "phase_log",
            "phase_log",
            "phase_closed",
            "utterance",
            "phase_opened",
            "phase_log",
            "phase_log",
            "phase_closed",
            "utterance",
        ]
    );

    let titles: Vec<&str> = captured
        .report
        .phases
        .iter()
        .map(|p| p.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Analysis", "Tool Execution"]);
    assert_eq!(
        captured.report.utterances,
        vec![
            "I'm checking that for you...".to_string(),
            "The weather is 22°C and sunny.".to_string(),
        ]
    );
    assert!(captured.report.phases[0].log_lines[0].contains("Is it raining?"));
}

#[test]
fn test_demo_agent_outside_capture_does_not_panic() {
    // no active scope: output passes through to stdout
    weather_agent("hello", Duration::ZERO);
}

// ============================================================================
// Replay Tests
// ============================================================================

/// Yields `data`, then fails instead of reaching EOF.
struct BrokenReader {
    data: io::Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::other("transcript truncated")),
            n => Ok(n),
        }
    }
}

#[test]
fn test_replay_reader_full_transcript() {
    let stream = PhaseStream::new(RecordingSink::new());
    let (sink, report, copied) = replay_reader(TRANSCRIPT.as_bytes(), stream);

    assert_eq!(copied.unwrap(), TRANSCRIPT.len() as u64);
    assert!(sink.is_finished());
    assert_eq!(sink.events().len(), 5);
    assert_eq!(report.utterances, vec!["Found it."]);
}

#[test]
fn test_replay_reader_closes_phase_after_read_error() {
    let reader = BrokenReader {
        data: io::Cursor::new(b"PHASE: A\nx\n".to_vec()),
    };
    let stream = PhaseStream::new(RecordingSink::new());
    let (sink, report, copied) = replay_reader(reader, stream);

    assert!(copied.is_err());
    assert_eq!(
        sink.events().last(),
        Some(&UiEvent::PhaseClosed {
            title: "A".to_string(),
            log_lines: vec!["x".to_string()],
        })
    );
    assert_eq!(report.phases.len(), 1);
}

#[test]
fn test_replay_reader_drains_unterminated_tail() {
    let stream = PhaseStream::new(RecordingSink::new());
    let (_sink, report, copied) = replay_reader("PHASE: A\nSAY: no newline".as_bytes(), stream);

    assert!(copied.is_ok());
    assert_eq!(report.utterances, vec!["no newline"]);
}

// ============================================================================
// Util Tests
// ============================================================================

#[cfg(unix)]
fn shell_status(script: &str) -> std::process::ExitStatus {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(script)
        .status()
        .unwrap()
}

#[cfg(unix)]
#[test]
fn test_exit_code_passes_through_child_code() {
    use thinkstream_cli::util::exit_code;
    assert_eq!(exit_code(shell_status("exit 0")), 0);
    assert_eq!(exit_code(shell_status("exit 3")), 3);
}

#[cfg(unix)]
#[test]
fn test_exit_code_for_signal_is_128_plus_signal() {
    use thinkstream_cli::util::exit_code;
    assert_eq!(exit_code(shell_status("kill -9 $$")), 137);
}

#[test]
fn test_panic_hook_logs_and_unwinds() {
    thinkstream_cli::util::init_tracing(false);
    thinkstream_cli::util::install_panic_hook();
    let result = std::panic::catch_unwind(|| {
        let broken = true;
        if broken {
            panic!("agent blew up");
        }
    });
    // back to the default hook for the rest of the suite
    let _ = std::panic::take_hook();
    assert!(result.is_err());
}

// ============================================================================
// Demo On Blocking Worker Tests
// ============================================================================

#[tokio::test]
async fn test_demo_agent_on_blocking_worker() {
    let captured = tokio::task::spawn_blocking(|| {
        capture(RecordingSink::new(), &CaptureConfig::default(), |_scope| {
            weather_agent("Any snow?", Duration::from_millis(1));
        })
    })
    .await
    .unwrap();

    assert_eq!(captured.report.phases.len(), 2);
    assert_eq!(captured.report.utterances.len(), 2);
    assert!(captured.sink.is_finished());
}
