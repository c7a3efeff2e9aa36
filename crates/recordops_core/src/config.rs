//! Host-facing configuration for the record layer.
//!
//! # Responsibility
//! - Collect logging, connection and filter settings in one value.
//! - Deserialize from whatever format the host already uses (serde).
//! - Validate logging settings before the logger backend sees them.
//!
//! # Invariants
//! - Every field has a default, so partial documents are accepted.

use crate::logging::init_logging;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Minimum severity written to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Default for LogLevel {
    /// `Debug` for debug builds, `Info` for release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options consumed by the filter evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// When `false` (default), `like` matches ASCII case-insensitively.
    pub case_sensitive_like: bool,
}

/// Top-level configuration for record access.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: LogLevel,
    /// Directory for rolling log files. Must be absolute; `None` disables
    /// file logging.
    pub log_dir: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    pub filter: FilterOptions,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            busy_timeout_ms: 5_000,
            filter: FilterOptions::default(),
        }
    }
}

impl CoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Validated log directory, or `None` when file logging is off.
    pub fn log_dir(&self) -> Result<Option<&Path>, ConfigError> {
        let Some(dir) = self.log_dir.as_deref() else {
            return Ok(None);
        };
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyLogDir);
        }
        if !dir.is_absolute() {
            return Err(ConfigError::RelativeLogDir(dir.to_path_buf()));
        }
        Ok(Some(dir))
    }

    /// Starts file logging when `log_dir` is set; no-op otherwise.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_dir()? {
            Some(dir) => init_logging(self.log_level, dir).map_err(ConfigError::Logging),
            None => Ok(()),
        }
    }
}

/// Invalid configuration, or a logger that refused to start from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyLogDir,
    RelativeLogDir(PathBuf),
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLogDir => write!(f, "log_dir cannot be empty"),
            Self::RelativeLogDir(dir) => write!(
                f,
                "log_dir must be an absolute path, got `{}`",
                dir.display()
            ),
            Self::Logging(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}
