//! Subscriber setup shared by the server and the CLI.
//!
//! Human-readable events go to the console under an `EnvFilter`. Events on the
//! `errors` target are also written as JSON lines to a daily `errors.jsonl`
//! file when a log directory is configured.

use crate::config::TelemetryConfig;
use crate::telemetry::init_telemetry;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{
    filter::filter_fn, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Target for events that must land in `errors.jsonl`.
pub const ERRORS_TARGET: &str = "errors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    /// Keeps stdout free for machine-readable command output.
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
    pub log_dir: Option<PathBuf>,
    pub console: Console,
}

impl LogSettings {
    pub fn server() -> Self {
        Self {
            default_filter: "info".to_string(),
            log_dir: Some(PathBuf::from("logs")),
            console: Console::Stdout,
        }
    }

    pub fn cli() -> Self {
        Self {
            default_filter: "warn".to_string(),
            log_dir: None,
            console: Console::Stderr,
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Install the global subscriber. Returns `false` if one was already installed.
pub fn init_logging(settings: &LogSettings, telemetry: &TelemetryConfig) -> Result<bool> {
    let otel_layer = init_telemetry(telemetry)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.default_filter))
        .context("Invalid log filter")?;

    let console_layer = match settings.console {
        Console::Stdout => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_filter(env_filter)
            .boxed(),
        Console::Stderr => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    let errors_layer = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let errors_appender = tracing_appender::rolling::daily(dir, "errors.jsonl");
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(errors_appender)
                    .with_filter(filter_fn(|metadata| metadata.target() == ERRORS_TARGET)),
            )
        }
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(otel_layer)
        .with(console_layer)
        .with(errors_layer)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let server = LogSettings::server();
        assert_eq!(server.console, Console::Stdout);
        assert_eq!(server.log_dir, Some(PathBuf::from("logs")));

        let cli = LogSettings::cli().with_log_dir("/tmp/switchblade-logs");
        assert_eq!(cli.console, Console::Stderr);
        assert_eq!(cli.default_filter, "warn");
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/switchblade-logs")));
    }

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let settings = LogSettings::cli().with_log_dir(&log_dir);

        init_logging(&settings, &TelemetryConfig::default()).unwrap();
        assert!(log_dir.is_dir());
    }
}
