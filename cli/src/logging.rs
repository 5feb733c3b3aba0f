//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/watermark/watermark.log` (or platform
//! equivalent) with 10 MB size-based rotation. Set `DEBUG_LOGGING=1` to
//! enable debug output for the watermark crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEBUG_DIRECTIVE: &str = "info,watermark=debug,watermark_core=debug,watermark_cli=debug";

/// Initialize logging to the log file and stderr.
///
/// The returned guard flushes buffered file output when dropped, so hold it
/// for the life of the program. Falls back to stderr only (and returns
/// `None`) when the log file cannot be created.
///
/// Stderr only shows warnings unless `DEBUG_LOGGING` is set, keeping the
/// REPL readable.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let log_dir = match dirs::config_dir() {
        Some(config) => config.join("watermark"),
        None => {
            init_stderr_only(debug_logging);
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Subscriber not installed yet
        eprintln!(
            "Failed to create log directory {:?}: {}, using stderr only",
            log_dir, e
        );
        init_stderr_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("watermark.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stderr_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(EnvFilter::new(file_directive(debug_logging)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(EnvFilter::new(stderr_directive(debug_logging)));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "watermark logging initialized");

    Some(guard)
}

fn init_stderr_only(debug_logging: bool) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(EnvFilter::new(stderr_directive(debug_logging)))
        .init();

    tracing::info!(debug_logging, "watermark logging initialized (stderr only)");
}

fn file_directive(debug_logging: bool) -> &'static str {
    if debug_logging { DEBUG_DIRECTIVE } else { "info" }
}

fn stderr_directive(debug_logging: bool) -> &'static str {
    if debug_logging { DEBUG_DIRECTIVE } else { "warn" }
}
