//! Configuration loading and management
//!
//! Handles parsing of `.tm.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

pub const CONFIG_FILE: &str = ".tm.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task log configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Replay configuration
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Task rules
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Task log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file path, relative to the working directory unless absolute
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// How long a writer waits for the log lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("task_log.txt")
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// What replay does with a log line it cannot apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Stop at the first bad line and fail the command.
    #[default]
    Abort,
    /// Report the bad line and keep going.
    Skip,
}

/// Replay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub on_error: ReplayPolicy,
}

/// What `rename` does when the new name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameConflictPolicy {
    #[default]
    Reject,
    Overwrite,
}

/// Task rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub on_rename_conflict: RenameConflictPolicy,
}

impl Config {
    /// Load configuration from a `.tm.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a working directory.
    ///
    /// A missing `.tm.toml` means defaults. A present but invalid one is an
    /// error: falling back would silently change replay and rename policy.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&config_path)
    }

    /// Resolve the log path against the working directory.
    pub fn log_path(&self, dir: &Path) -> PathBuf {
        if self.log.path.is_absolute() {
            self.log.path.clone()
        } else {
            dir.join(&self.log.path)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.log.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("log.path cannot be empty".to_string()));
        }
        if self.log.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "log.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
