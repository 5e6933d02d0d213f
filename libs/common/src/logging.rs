//! Logging initialisation for registry services
//!
//! Console output always; an optional daily-rolling file under `log_dir`
//! named `{service}.log.YYYY-MM-DD`, either plain or JSON.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{Error, Result};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809Z [INFO] Connection created`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file writer flushing for the life of the process
static GUARD: OnceLock<Mutex<Option<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the default filter target and file prefix
    pub service_name: String,
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Directory for the rolling log file; `None` disables file output
    pub log_dir: Option<PathBuf>,
    /// Write the file layer as JSON lines
    pub enable_json: bool,
    /// Colored console output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "regsrv".to_string(),
            level: "info".to_string(),
            log_dir: None,
            enable_json: false,
            ansi: true,
        }
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise `{level},{service}=debug`
fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(env_str) = std::env::var("RUST_LOG") {
        return EnvFilter::try_new(&env_str)
            .map_err(|e| Error::Logging(format!("Invalid RUST_LOG '{}': {}", env_str, e)));
    }
    let directive = default_directive(config);
    EnvFilter::try_new(&directive)
        .map_err(|e| Error::Logging(format!("Invalid log level '{}': {}", directive, e)))
}

fn default_directive(config: &LogConfig) -> String {
    // Service names may contain '-', tracing targets use the crate name
    let target = config.service_name.replace('-', "_");
    format!("{},{}=debug", config.level, target)
}

/// Initialize logging system with configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(config: LogConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let slot = GUARD.get_or_init(|| Mutex::new(None));
            match slot.lock() {
                Ok(mut slot) => *slot = Some(guard),
                Err(poisoned) => *poisoned.into_inner() = Some(guard),
            }

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    match &config.log_dir {
        Some(dir) => tracing::info!("Logging: {} @ {}", config.service_name, dir.display()),
        None => tracing::debug!("Logging: {} (console only)", config.service_name),
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_uses_crate_target() {
        let config = LogConfig {
            service_name: "reg-srv".to_string(),
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(default_directive(&config), "warn,reg_srv=debug");
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }
}
