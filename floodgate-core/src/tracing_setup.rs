//! Tracing setup for Floodgate
//!
//! Console output only. `RUST_LOG` takes precedence over the level passed in,
//! so a single run can be traced at `debug` without recompiling.

use std::fmt;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt};

/// Initialize tracing with console output at the given level.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If a global subscriber is already installed
pub fn init_tracing(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_tracing_level().to_string()));

    subscriber_fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()?;

    tracing::info!("Tracing initialized: level={}", level);
    Ok(())
}

/// Installs a test-friendly subscriber once per process.
///
/// Output goes through the libtest capture. Repeated calls are no-ops.
pub fn init_test_tracing() {
    let _ = subscriber_fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Per-event detail
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl LogLevel {
    /// Converts to the tracing level.
    ///
    /// # Examples
    /// ```
    /// use floodgate_core::tracing_setup::LogLevel;
    ///
    /// let level = LogLevel::Info.as_tracing_level();
    /// assert_eq!(level, tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
