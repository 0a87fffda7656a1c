//! Error types for the gitmend core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them where both can occur, such as
//! building a service from a config file. The [`crate::tools`] boundary
//! converts every operation error into a structured failure response, so none
//! of these ever reach a UI caller as a raised fault.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from workspace detection, conflict parsing and resolution.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The path is not inside a git working tree.
    #[error("not a git workspace: {0}")]
    NotAWorkspace(String),

    /// The conflicted file does not exist or could not be read.
    #[error("file not found or unreadable: {0}")]
    FileNotFound(String),

    /// The file is not UTF-8 text and cannot be parsed for markers.
    #[error("file '{0}' is binary or not valid UTF-8")]
    BinaryFile(String),

    /// The file exceeds the configured size cap; parsing was skipped.
    #[error("file '{path}' is too large ({size} bytes, limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// `manual` strategy requested without replacement text.
    #[error("manual resolution requires replacement content")]
    MissingManualContent,

    /// Hunk index outside `[0, count)`.
    #[error("invalid hunk index {index}: file has {count} conflict(s)")]
    InvalidIndex { index: usize, count: usize },

    /// The hunk's recorded position no longer holds an opening marker.
    #[error("conflict at line {line} in '{path}' no longer matches the file; re-parse required")]
    HunkNotFound { path: String, line: usize },

    /// A subprocess exceeded its timeout and was killed.
    #[error("command timed out: git {0}")]
    CommandTimedOut(String),

    /// A subprocess exited non-zero.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The requested action does not apply to the current workspace state.
    #[error("{0}")]
    InvalidState(String),

    /// Request parameters were missing or malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Generic I/O wrapper.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConflictError {
    /// Stable machine-readable tag for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAWorkspace(_) => "NOT_A_WORKSPACE",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::BinaryFile(_) => "BINARY_FILE",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::MissingManualContent => "MISSING_REQUIRED_INPUT",
            Self::InvalidIndex { .. } => "INVALID_INDEX",
            Self::HunkNotFound { .. } => "HUNK_NOT_FOUND",
            Self::CommandTimedOut(_) => "SUBPROCESS_TIMEOUT",
            Self::CommandFailed { .. } => "SUBPROCESS_FAILURE",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Stable machine-readable tag for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conflict(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ConflictError::InvalidIndex { index: 4, count: 2 };
        assert_eq!(
            err.to_string(),
            "invalid hunk index 4: file has 2 conflict(s)"
        );

        let err = ConflictError::FileTooLarge {
            path: "big.txt".into(),
            size: 2048,
            limit: 1024,
        };
        assert!(err.to_string().contains("too large"));

        let err = ConflictError::CommandFailed {
            command: "add a.txt".into(),
            exit_code: 128,
            stderr: "fatal: bad".into(),
        };
        assert_eq!(err.to_string(), "git add a.txt failed (exit 128): fatal: bad");

        let err = ConflictError::BinaryFile("logo.png".into());
        assert_eq!(err.to_string(), "file 'logo.png' is binary or not valid UTF-8");
        assert_eq!(err.code(), "BINARY_FILE");
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = ConflictError::MissingManualContent.into();
        assert!(matches!(core_err, CoreError::Conflict(_)));
        assert_eq!(core_err.code(), "MISSING_REQUIRED_INPUT");

        let core_err: CoreError = ConfigError::ParseError("bad".into()).into();
        assert_eq!(core_err.code(), "CONFIG_ERROR");
    }
}
