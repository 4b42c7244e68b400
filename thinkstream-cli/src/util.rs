use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout belongs to the rendered output.
pub fn init_tracing(verbose: bool) {
    // RUST_LOG=thinkstream_core=debug,thinkstream_cli=debug
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .compact()
        .try_init();
}

/// Route panics through tracing so they land in the same stderr log as
/// everything else, tagged with the thread that panicked.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());

        let thread = std::thread::current();
        tracing::error!(
            target: "thinkstream",
            thread = thread.name().unwrap_or("<unnamed>"),
            %location,
            %payload,
            "agent runner panicked"
        );
    }));
}

/// Exit code for a finished agent: its own code, or 128+signal on unix.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
