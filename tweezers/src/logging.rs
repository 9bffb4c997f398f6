//! Logging setup for programs using the crate.
//!
//! Library code only emits `tracing` events,
//! accuracy warnings go to the `tweezers::accuracy` target.
//! Binaries install a subscriber once at startup:
//!
//! ```rust,ignore
//! use tweezers::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi line, human readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include source location (file:line)
    pub source_location: bool,
    /// Module filter such as "tweezers=debug", overrides `level` and `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            source_location: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Only errors and accuracy warnings.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            ..Default::default()
        }
    }
}

/// Installs the global subscriber, subsequent calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let fallback = || EnvFilter::new(config.level.to_string());
    let filter = match &config.filter {
        Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
    };

    let result = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .pretty()
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            ),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .compact()
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            ),
        ),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already set");
    }
}

#[cfg(test)]
mod test {
    use super::{LogConfig, LogLevel};

    #[test]
    fn test_config() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogConfig::quiet().level, LogLevel::Warn);

        let json = r#"{"level":"debug","format":"pretty","source_location":true,"filter":null}"#;
        let config: LogConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.source_location);
    }
}
