//! Logging setup shared by the bridge, the runtime and the C API.
//!
//! Everything in nnrt logs through `tracing`. Installing a subscriber is up to
//! the host application; [`init_logging`] is a convenience for hosts that do
//! not bring their own, and tolerates being called more than once.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::error::CoreError;

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level shown when `RUST_LOG` is unset
    pub level: LogLevel,
    /// Prefix lines with a timestamp
    pub with_timestamps: bool,
    /// Include the emitting thread id; useful since completions fire on engine workers
    pub with_thread_ids: bool,
    /// Include file and line
    pub with_source_location: bool,
    /// Log span enter/close events
    pub with_span_events: bool,
    /// Emit JSON lines instead of text
    pub json_format: bool,
}

/// Minimum log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Lifecycle details
    Debug,
    /// Normal operation
    Info,
    /// Recoverable problems
    Warn,
    /// Failures only
    Error,
}

impl LogLevel {
    fn as_tracing(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Level for a numeric code, 0 (trace) to 4 (error).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(LogLevel::Trace),
            1 => Some(LogLevel::Debug),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Warn),
            4 => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(CoreError::InvalidArgument(format!("unknown log level '{}'", other))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamps: true,
            with_thread_ids: false,
            with_source_location: false,
            with_span_events: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Toggle timestamps.
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Toggle thread ids.
    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.with_thread_ids = enable;
        self
    }

    /// Toggle source locations.
    pub fn with_source_location(mut self, enable: bool) -> Self {
        self.with_source_location = enable;
        self
    }

    /// Toggle span events.
    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.with_span_events = enable;
        self
    }

    /// Toggle JSON output.
    pub fn with_json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.with_span_events {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let base = fmt::layer()
            .with_span_events(span_events)
            .with_thread_ids(self.with_thread_ids)
            .with_file(self.with_source_location)
            .with_line_number(self.with_source_location);

        match (self.json_format, self.with_timestamps) {
            (true, true) => base.json().with_current_span(true).boxed(),
            (true, false) => base.json().with_current_span(true).without_time().boxed(),
            (false, true) => base.with_target(self.with_source_location).boxed(),
            (false, false) => base
                .with_target(self.with_source_location)
                .without_time()
                .boxed(),
        }
    }
}

/// Install a global subscriber built from `config`.
///
/// `RUST_LOG` overrides the configured level. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_tracing().as_str()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(config.layer())
        .with(filter)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Logging initialized at level {:?}", config.level);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.with_timestamps);
        assert!(!config.json_format);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Trace)
            .with_timestamps(false)
            .with_json_format(true);
        assert_eq!(config.level, LogLevel::Trace);
        assert!(!config.with_timestamps);
        assert!(config.json_format);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::from_code(4), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_code(7), None);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let _ = init_logging(LoggingConfig::new().with_level(LogLevel::Warn));
        assert!(!init_logging(LoggingConfig::default()));
    }
}
