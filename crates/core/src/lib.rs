//! gitmend core library.
//!
//! This crate provides the components for inspecting and resolving merge
//! conflicts in a git working tree: the subprocess executor, workspace state
//! detection, conflict marker parsing, hunk resolution, navigation and the
//! uniform tool surface that wraps them.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod models;
pub mod tools;
pub mod workspace;

// Re-exports for convenience.
pub use config::AppConfig;
pub use conflict::{ConflictNavigator, ConflictOrchestrator, ConflictParser, HunkResolver};
pub use errors::{ConfigError, ConflictError, CoreError};
pub use git::GitExecutor;
pub use tools::{ConflictService, ToolResponse};
pub use workspace::{WorkspaceDetector, WorkspaceOperations};
