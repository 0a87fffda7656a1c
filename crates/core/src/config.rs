//! TOML-based configuration for gitmend.
//!
//! Every field is optional; a missing section falls back to its defaults.
//! Components receive their section explicitly at construction time rather
//! than reading a process-wide singleton.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Subprocess settings.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Size and context limits for conflict parsing.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Settings for invoking the external git binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Program name or path of the git binary.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Seconds before a running command is killed (default 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Per-stream cap on captured stdout/stderr bytes (default 512 KiB).
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

fn default_git_binary() -> String {
    "git".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_output() -> usize {
    512 * 1024
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            timeout_secs: default_timeout(),
            max_output_bytes: default_max_output(),
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Limits applied when reading and parsing conflicted files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Files larger than this are not parsed (default 1 MiB).
    #[serde(default = "default_max_file")]
    pub max_file_bytes: u64,

    /// Lines of context captured on each side of a hunk (default 3).
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

fn default_max_file() -> u64 {
    1024 * 1024
}
fn default_context_lines() -> usize {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file(),
            context_lines: default_context_lines(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all limits are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.git_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "executor.git_binary".into(),
                detail: "git binary must not be empty".into(),
            });
        }
        if self.executor.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.executor.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor.max_output_bytes".into(),
                detail: "output cap must be > 0".into(),
            });
        }
        if self.limits.max_file_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_file_bytes".into(),
                detail: "file size cap must be > 0".into(),
            });
        }
        if self.limits.context_lines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.context_lines".into(),
                detail: "context lines must be > 0".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                detail: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Commented default configuration written by `gitmend init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# gitmend configuration

[executor]
git_binary = "git"
timeout_secs = 30
max_output_bytes = 524288

[limits]
max_file_bytes = 1048576
context_lines = 3

[logging]
level = "warn"
"#;
