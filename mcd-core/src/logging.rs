//! Logging setup for the MCD beacon.
//!
//! One `tracing-subscriber` stack: an `EnvFilter` built from the configured
//! directive string (or `RUST_LOG` when that is set) and a single fmt layer
//! in JSON, pretty or compact form, written through a non-blocking appender.
//!
//! ```no_run
//! use mcd_core::logging::*;
//!
//! let _guard = LogConfig::new("mcd_beacon=debug,info")
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .unwrap();
//!
//! info!("beacon ready");
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, error, info, trace, warn};

/// Filter used when the configured one does not parse.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" | "text" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
        })
    }
}

/// Where log lines go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    #[default]
    Stdout,
    Stderr,
    /// Appended to, created if missing
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    filter: String,
    format: LogFormat,
    target: LogTarget,
    ansi: bool,
}

impl LogConfig {
    /// `filter` uses `EnvFilter` directive syntax, e.g. `"info"` or
    /// `"mcd_beacon=debug,warn"`.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            format: LogFormat::Json,
            target: LogTarget::Stdout,
            ansi: false,
        }
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Colored output for the pretty and compact formats.
    pub fn ansi(mut self, enable: bool) -> Self {
        self.ansi = enable;
        self
    }

    pub fn filter_directives(&self) -> &str {
        &self.filter
    }

    /// `RUST_LOG` wins when set; otherwise the configured directives, or
    /// [`DEFAULT_FILTER`] if they do not parse.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Install the global subscriber.
    ///
    /// Hold the returned guard for the life of the process; dropping it
    /// flushes and stops the background writer.
    pub fn init(self) -> io::Result<WorkerGuard> {
        let (writer, guard) = match &self.target {
            LogTarget::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogTarget::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogTarget::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
        };

        let layer = tfmt::layer().with_writer(writer);
        let layer = match self.format {
            LogFormat::Json => layer.json().with_current_span(false).boxed(),
            LogFormat::Pretty => layer.pretty().with_ansi(self.ansi).boxed(),
            LogFormat::Compact => layer.compact().with_ansi(self.ansi).boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()
            .map_err(io::Error::other)?;

        Ok(guard)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER)
    }
}
