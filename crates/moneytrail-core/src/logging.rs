//! Structured Logging
//!
//! Initialises `tracing-subscriber` for investigation runs. Every stage logs
//! through `tracing` macros with structured fields (`analyzer`, counts,
//! truncation reasons); this module only decides how those events are
//! rendered.
//!
//! # Example
//!
//! ```rust,ignore
//! use moneytrail_core::logging::LogConfig;
//!
//! LogConfig::production().init()?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verbosity of investigation logs, mirrored onto `tracing::Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-cycle and per-iteration detail
    Trace,
    /// Stage internals
    Debug,
    /// Run and stage summaries
    #[default]
    Info,
    /// Degraded results
    Warn,
    /// Failures only
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        if level == tracing::Level::TRACE {
            Self::Trace
        } else if level == tracing::Level::DEBUG {
            Self::Debug
        } else if level == tracing::Level::INFO {
            Self::Info
        } else if level == tracing::Level::WARN {
            Self::Warn
        } else {
            Self::Error
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&tracing::Level::from(*self).as_str().to_ascii_lowercase())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    /// Accepts anything `tracing::Level` parses, plus `warning`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("warning") {
            return Ok(Self::Warn);
        }
        s.parse::<tracing::Level>()
            .map(Self::from)
            .map_err(|e| format!("Invalid log level {s:?}: {e}"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level
    pub level: LogLevel,
    /// Emit JSON lines instead of human-readable text
    pub structured: bool,
    /// Include caller location
    pub include_location: bool,
    /// Include thread IDs
    pub include_thread_ids: bool,
    /// Per-crate overrides, keyed by target (e.g. `moneytrail_graph`)
    pub target_levels: BTreeMap<String, LogLevel>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            structured: false,
            include_location: false,
            include_thread_ids: false,
            target_levels: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Development configuration
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            include_location: true,
            ..Default::default()
        }
    }

    /// Production configuration
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            structured: true,
            include_thread_ids: true,
            ..Default::default()
        }
    }

    /// Set log level for a specific target
    pub fn with_target_level(mut self, target: impl Into<String>, level: LogLevel) -> Self {
        self.target_levels.insert(target.into(), level);
        self
    }

    /// Filter directive string, e.g. `info,moneytrail_graph=debug`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.to_string();
        for (target, level) in &self.target_levels {
            directives.push(',');
            directives.push_str(target);
            directives.push('=');
            directives.push_str(&level.to_string());
        }
        directives
    }

    /// Initialize logging.
    ///
    /// `RUST_LOG` wins over the configured levels. Calling this twice is a
    /// no-op; the first subscriber stays installed.
    pub fn init(&self) -> crate::error::Result<()> {
        use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.directives()))
            .map_err(|e| crate::error::AnalysisError::config(format!("Invalid log filter: {}", e)))?;

        let subscriber = tracing_subscriber::registry().with(filter);

        if self.structured {
            let layer = fmt::layer()
                .json()
                .with_thread_ids(self.include_thread_ids)
                .with_file(self.include_location)
                .with_line_number(self.include_location);

            subscriber.with(layer).try_init().ok();
        } else {
            let layer = fmt::layer()
                .with_thread_ids(self.include_thread_ids)
                .with_file(self.include_location)
                .with_line_number(self.include_location);

            subscriber.with(layer).try_init().ok();
        }

        Ok(())
    }
}
