//! Shared data models for conflict detection and resolution.
//!
//! These types are serialized with camelCase field names because they form
//! the `data` payload of the tool contract in [`crate::tools`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Conflict hunks and files
// ---------------------------------------------------------------------------

/// One conflict region inside one file.
///
/// Created fresh by every parse; a hunk is stale as soon as the file it came
/// from changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictHunk {
    /// File-scoped identifier, e.g. `src/lib.rs#2`.
    pub id: String,
    /// 1-indexed line of the `<<<<<<<` marker.
    pub start_line: usize,
    /// 1-indexed line of the `>>>>>>>` marker.
    pub end_line: usize,
    pub ours_content: String,
    pub theirs_content: String,
    /// Empty for two-way markers.
    pub base_content: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
    pub ours_branch: String,
    pub theirs_branch: String,
}

impl ConflictHunk {
    /// Whether the hunk carried a `|||||||` base section.
    pub fn is_three_way(&self) -> bool {
        !self.base_content.is_empty()
    }
}

/// A conflicted file together with its parsed hunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictFile {
    pub path: String,
    pub hunks: Vec<ConflictHunk>,
    pub is_binary: bool,
    pub conflict_count: usize,
}

impl ConflictFile {
    /// A text file; the conflict count is the number of hunks.
    pub fn text(path: impl Into<String>, hunks: Vec<ConflictHunk>) -> Self {
        let conflict_count = hunks.len();
        Self {
            path: path.into(),
            hunks,
            is_binary: false,
            conflict_count,
        }
    }

    /// A binary file. Content is never examined, so the count is a sentinel 1.
    pub fn binary(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunks: Vec::new(),
            is_binary: true,
            conflict_count: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Workspace state
// ---------------------------------------------------------------------------

/// The composite operation currently in progress in a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationType {
    Merge,
    Rebase,
    CherryPick,
    Revert,
    #[default]
    None,
}

impl OperationType {
    /// The git subcommand that drives this operation, if any.
    pub fn subcommand(&self) -> Option<&'static str> {
        match self {
            Self::Merge => Some("merge"),
            Self::Rebase => Some("rebase"),
            Self::CherryPick => Some("cherry-pick"),
            Self::Revert => Some("revert"),
            Self::None => None,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
            Self::CherryPick => write!(f, "cherry-pick"),
            Self::Revert => write!(f, "revert"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Workspace-wide merge state, recomputed on every detection call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeState {
    #[serde(rename = "type")]
    pub operation: OperationType,
    pub has_conflicts: bool,
    pub current_branch: String,
    pub incoming_ref: Option<String>,
    /// Unmerged paths in status-listing order.
    pub conflict_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How a hunk is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    Ours,
    Theirs,
    /// Ours followed by theirs.
    Both,
    /// Caller-supplied replacement text.
    Manual,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
            Self::Both => write!(f, "both"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            "both" => Ok(Self::Both),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "unknown strategy '{}': use ours, theirs, both or manual",
                other
            )),
        }
    }
}

/// Which side to take for a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ours,
    Theirs,
}

impl Side {
    pub fn checkout_flag(&self) -> &'static str {
        match self {
            Self::Ours => "--ours",
            Self::Theirs => "--theirs",
        }
    }
}

impl From<Side> for ResolutionStrategy {
    fn from(side: Side) -> Self {
        match side {
            Side::Ours => Self::Ours,
            Side::Theirs => Self::Theirs,
        }
    }
}

/// Outcome of a resolve operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub success: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk_id: Option<String>,
    pub strategy: ResolutionStrategy,
    pub remaining_conflicts: usize,
    /// Whether the file was staged because no conflicts remain.
    pub staged: bool,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Direction for stepping through conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

/// Result of one navigation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResult {
    pub has_more: bool,
    /// 1-indexed position in the flattened list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk: Option<ConflictHunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_state_serializes_type_field() {
        let state = MergeState {
            operation: OperationType::CherryPick,
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "cherry-pick");
        assert_eq!(json["hasConflicts"], false);
        assert!(json.get("currentStep").is_none());
    }

    #[test]
    fn test_binary_file_sentinel_count() {
        let file = ConflictFile::binary("logo.png");
        assert!(file.is_binary);
        assert!(file.hunks.is_empty());
        assert_eq!(file.conflict_count, 1);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Theirs".parse::<ResolutionStrategy>(), Ok(ResolutionStrategy::Theirs));
        assert!("mine".parse::<ResolutionStrategy>().is_err());
    }
}
