//! Logging and tracing initialization.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "LIVEREC_LOG";

/// Filter directives, by precedence: `LIVEREC_LOG`, `RUST_LOG`, then the
/// configured level.
pub fn filter_directives(config: &LoggingConfig) -> String {
    [LOG_ENV, "RUST_LOG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| config.level.clone())
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let directives = filter_directives(config);
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {directives:?} ({e}), falling back to info");
        EnvFilter::new("info")
    })
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr, or are appended to `config.file` when set. A second
/// call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::fmt;

    let filter = build_filter(config);
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let file = config.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {e}", path.display()))
            .ok()
    });

    let installed = match (file, config.json) {
        (Some(file), true) => builder
            .json()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init(),
        (Some(file), false) => builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init(),
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
