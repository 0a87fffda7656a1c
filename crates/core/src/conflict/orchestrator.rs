//! File-level resolution: one hunk or every hunk, then stage when clean.

use std::path::Path;

use tracing::{info, instrument, warn};

use super::fs::{read_capped, workspace_path, write_atomic};
use super::parser::ConflictParser;
use super::resolver::HunkResolver;
use crate::config::LimitsConfig;
use crate::errors::ConflictError;
use crate::git::GitExecutor;
use crate::models::{ConflictHunk, ResolutionResult, ResolutionStrategy};

/// Reads, rewrites and stages conflicted files.
///
/// There is no locking: a concurrent external edit between the read and the
/// write of a resolve call is overwritten.
#[derive(Debug, Clone)]
pub struct ConflictOrchestrator {
    executor: GitExecutor,
    parser: ConflictParser,
    max_file_bytes: u64,
}

impl ConflictOrchestrator {
    pub fn new(executor: GitExecutor, limits: &LimitsConfig) -> Self {
        Self {
            executor,
            parser: ConflictParser::new(limits.context_lines),
            max_file_bytes: limits.max_file_bytes,
        }
    }

    pub fn parser(&self) -> &ConflictParser {
        &self.parser
    }

    /// Read and parse one file.
    pub async fn parse_file(&self, root: &Path, path: &str) -> Result<Vec<ConflictHunk>, ConflictError> {
        let content = read_capped(root, path, self.max_file_bytes).await?;
        Ok(self.parser.parse(&content, path))
    }

    /// Resolve the hunk at `index` (0-based, parse order).
    #[instrument(skip(self, root, manual_content), fields(root = %root.display()))]
    pub async fn resolve_hunk(
        &self,
        root: &Path,
        path: &str,
        index: usize,
        strategy: ResolutionStrategy,
        manual_content: Option<&str>,
    ) -> Result<ResolutionResult, ConflictError> {
        let content = read_capped(root, path, self.max_file_bytes).await?;
        let hunks = self.parser.parse(&content, path);

        let hunk = hunks.get(index).ok_or(ConflictError::InvalidIndex {
            index,
            count: hunks.len(),
        })?;

        let updated = HunkResolver::resolve(&content, hunk, strategy, manual_content, path)?;
        info!(path, hunk = %hunk.id, %strategy, "resolved conflict hunk");

        self.commit_content(root, path, &updated, Some(hunk.id.clone()), strategy)
            .await
    }

    /// Resolve every hunk in the file with one strategy.
    ///
    /// All replacements come from a single parse and are applied in one pass,
    /// then the file is written once.
    #[instrument(skip(self, root, manual_content), fields(root = %root.display()))]
    pub async fn resolve_all(
        &self,
        root: &Path,
        path: &str,
        strategy: ResolutionStrategy,
        manual_content: Option<&str>,
    ) -> Result<ResolutionResult, ConflictError> {
        let content = read_capped(root, path, self.max_file_bytes).await?;
        let hunks = self.parser.parse(&content, path);
        if hunks.is_empty() {
            return Err(ConflictError::InvalidState(format!(
                "no conflict markers found in '{}'",
                path
            )));
        }

        let replacements = hunks
            .iter()
            .map(|h| HunkResolver::resolved_content(h, strategy, manual_content).map(|text| (h, text)))
            .collect::<Result<Vec<_>, _>>()?;

        let updated = HunkResolver::apply(&content, &replacements, path)?;
        info!(path, count = hunks.len(), %strategy, "resolved all conflict hunks");

        self.commit_content(root, path, &updated, None, strategy).await
    }

    /// Write `updated`, count what is left, and stage the file once clean.
    async fn commit_content(
        &self,
        root: &Path,
        path: &str,
        updated: &str,
        hunk_id: Option<String>,
        strategy: ResolutionStrategy,
    ) -> Result<ResolutionResult, ConflictError> {
        let full = workspace_path(root, path)?;
        write_atomic(full, updated.to_string()).await?;

        let remaining = self.parser.parse(updated, path).len();
        let staged = if remaining == 0 {
            self.stage(root, path).await
        } else {
            false
        };

        Ok(ResolutionResult {
            success: true,
            file_path: path.to_string(),
            hunk_id,
            strategy,
            remaining_conflicts: remaining,
            staged,
        })
    }

    async fn stage(&self, root: &Path, path: &str) -> bool {
        match self.executor.run_checked(&["add", "--", path], Some(root)).await {
            Ok(_) => {
                info!(path, "file fully resolved, staged");
                true
            }
            Err(e) => {
                warn!(path, error = %e, "file resolved but staging failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;

    const TWO_HUNKS: &str = "\
head
<<<<<<< HEAD
a
=======
b
>>>>>>> feature
middle
<<<<<<< HEAD
c
=======
d
>>>>>>> feature
tail
";

    fn orchestrator() -> ConflictOrchestrator {
        // A binary that does not exist: staging fails softly, which keeps
        // these tests independent of a git installation.
        let exec = GitExecutor::new(&ExecutorConfig {
            git_binary: "gitmend-test-no-git".into(),
            ..Default::default()
        });
        ConflictOrchestrator::new(exec, &LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_resolve_single_hunk_leaves_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), TWO_HUNKS).unwrap();

        let result = orchestrator()
            .resolve_hunk(dir.path(), "f.txt", 1, ResolutionStrategy::Theirs, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.hunk_id.as_deref(), Some("f.txt#1"));
        assert_eq!(result.remaining_conflicts, 1);
        assert!(!result.staged);

        let content = std::fs::read_to_string(dir.path().join("f.txt")).unwrap();
        assert_eq!(
            content,
            "head\n<<<<<<< HEAD\na\n=======\nb\n>>>>>>> feature\nmiddle\nd\ntail\n"
        );
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), TWO_HUNKS).unwrap();

        let result = orchestrator()
            .resolve_all(dir.path(), "f.txt", ResolutionStrategy::Both, None)
            .await
            .unwrap();

        assert_eq!(result.remaining_conflicts, 0);
        assert!(result.hunk_id.is_none());
        let content = std::fs::read_to_string(dir.path().join("f.txt")).unwrap();
        assert_eq!(content, "head\na\nb\nmiddle\nc\nd\ntail\n");
    }

    #[tokio::test]
    async fn test_invalid_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), TWO_HUNKS).unwrap();

        let err = orchestrator()
            .resolve_hunk(dir.path(), "f.txt", 2, ResolutionStrategy::Ours, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::InvalidIndex { index: 2, count: 2 }));
    }

    #[tokio::test]
    async fn test_manual_without_content_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), TWO_HUNKS).unwrap();

        let orch = orchestrator();
        let err = orch
            .resolve_hunk(dir.path(), "f.txt", 0, ResolutionStrategy::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::MissingManualContent));

        let err = orch
            .resolve_all(dir.path(), "f.txt", ResolutionStrategy::Manual, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::MissingManualContent));

        let content = std::fs::read_to_string(dir.path().join("f.txt")).unwrap();
        assert_eq!(content, TWO_HUNKS);
    }

    #[tokio::test]
    async fn test_resolve_all_without_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clean.txt"), "nothing here\n").unwrap();

        let err = orchestrator()
            .resolve_all(dir.path(), "clean.txt", ResolutionStrategy::Ours, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_too_large_file_is_not_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), TWO_HUNKS).unwrap();

        let limits = LimitsConfig {
            max_file_bytes: 8,
            ..Default::default()
        };
        let orch = ConflictOrchestrator::new(orchestrator().executor, &limits);
        let err = orch.parse_file(dir.path(), "f.txt").await.unwrap_err();
        assert!(matches!(err, ConflictError::FileTooLarge { .. }));
    }
}
