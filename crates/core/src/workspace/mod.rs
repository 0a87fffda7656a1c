//! Workspace state detection and whole-workspace operations.

pub mod detector;
pub mod operations;

pub use detector::{git_dir, WorkspaceDetector};
pub use operations::WorkspaceOperations;
