//! Logging setup for the console binary
//!
//! Human-readable events go to stderr so they never interleave with answers
//! on stdout. A JSON file layer with daily rotation can be added for bug
//! reports. `RUST_LOG` overrides the default filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where JSON log files are written
    pub log_dir: PathBuf,

    /// Whether to write JSON logs to files
    pub enable_json_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            include_location: cfg!(debug_assertions),
            default_filter: "warn,sqlscribe=info,sqlscribe_core=info,sqlscribe_driver_postgres=info,sqlscribe_schema=info,sqlscribe_agent=info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.enable_json_logs = enabled;
        self
    }
}

/// Keeps the file writer alive; buffered lines are flushed when dropped
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Install the global subscriber. Call once, at the start of `main`.
pub fn init(config: LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone())
        .boxed();
    layers.push(console_layer);

    let mut file_writer = None;
    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "sqlscribe.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_writer = Some(guard);

        // NEW/CLOSE rather than ENTER: async spans re-enter on every poll
        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "logging initialized"
    );

    Ok(LoggingGuard {
        _file_writer: file_writer,
    })
}

/// Where JSON log files are written
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlscribe")
        .join("logs")
}
