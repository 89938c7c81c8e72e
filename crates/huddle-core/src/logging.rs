//! Tracing subscriber setup.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "HUDDLE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";
const LOG_FILE_PREFIX: &str = "huddle.log";

/// Picks the filter: `HUDDLE_LOG`, then the configured level, then `warn`.
pub fn filter_for(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .ok()
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs a stderr layer and a daily-rolling file layer under `logs_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process. Installing twice is an error.
pub fn init(config: &Config, logs_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log dir {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter_for(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_used() {
        let config = Config {
            log_level: Some("debug".to_string()),
            ..Config::default()
        };
        // HUDDLE_LOG may be set in the environment running the tests.
        if std::env::var_os(LOG_ENV).is_none() {
            assert_eq!(filter_for(&config).to_string(), "debug");
        }
    }

    #[test]
    fn test_default_level_is_warn() {
        if std::env::var_os(LOG_ENV).is_none() {
            assert_eq!(filter_for(&Config::default()).to_string(), "warn");
        }
    }
}
