use std::path::Path;

use anyhow::Result;
use tracing::{level_filters::LevelFilter, subscriber::DefaultGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    EnvFilter, Layer,
};

pub const CLI_PREFIX: &str = "cli";
pub const TRACKER_PREFIX: &str = "tracker";

/// Logging context of the process. Everything logged on the current thread goes to the
/// configured sinks until this is dropped.
#[must_use = "logging is disabled as soon as the guard is dropped"]
pub struct LoggingGuard {
    _default: DefaultGuard,
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace("-", "_"),
    ))
}

/// Level of the debug stream. `RUST_LOG` only counts when it is a bare level such as `trace`,
/// since the filter is always scoped to this crate.
fn debug_level(log_level: Option<LevelFilter>, env: Option<&str>) -> LevelFilter {
    log_level
        .or_else(|| env.and_then(|v| v.trim().parse().ok()))
        .unwrap_or(LevelFilter::DEBUG)
}

fn rolling_appender(prefix: &str, log_dir: &Path) -> Result<RollingFileAppender> {
    Ok(tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?)
}

/// Sets up two rolling files in `log_dir`: `<prefix>-debug` receives everything at `log_level`
/// (or `RUST_LOG`, or debug), `<prefix>-general` only receives info and above. `show_std`
/// additionally mirrors the debug stream to stdout.
pub fn enable_logging(
    prefix: &str,
    log_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<LoggingGuard> {
    let level = debug_level(log_level, std::env::var("RUST_LOG").ok().as_deref()).to_string();

    let debug_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(rolling_appender(&format!("{prefix}-debug"), log_dir)?)
        .with_filter(crate_filter(&level));

    let general_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(rolling_appender(&format!("{prefix}-general"), log_dir)?)
        .with_filter(crate_filter("info"));

    let stdout_layer = show_std.then(|| {
        fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(crate_filter(&level))
    });

    let subscriber = tracing_subscriber::registry()
        .with(debug_layer)
        .with(general_layer)
        .with(stdout_layer);

    Ok(LoggingGuard {
        _default: tracing::subscriber::set_default(subscriber),
    })
}

/// Routes logs of the calling test into the test output.
#[cfg(test)]
pub fn test_logging() -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .finish();
    tracing::subscriber::set_default(subscriber)
}
