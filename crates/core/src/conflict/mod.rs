//! Conflict marker parsing, resolution and navigation.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parsing** -- turning `<<<<<<<` / `|||||||` / `=======` / `>>>>>>>` blocks into hunks.
//! 2. **Resolving** -- rewriting one or all hunks of a file and staging it once clean.
//! 3. **Navigating** -- stepping through every hunk of every conflicted file.

pub mod fs;
pub mod navigator;
pub mod orchestrator;
pub mod parser;
pub mod resolver;
pub mod suggest;

pub use navigator::{ConflictLocation, ConflictNavigator};
pub use orchestrator::ConflictOrchestrator;
pub use parser::{has_conflict_markers, ConflictParser};
pub use resolver::HunkResolver;
pub use suggest::format_suggestion_prompt;
