//! Workspace-level actions: take a whole side, stage, commit, continue, abort.

use std::path::Path;

use tracing::{info, instrument};

use crate::conflict::fs::workspace_path;
use crate::conflict::parser::has_conflict_markers;
use crate::errors::ConflictError;
use crate::git::GitExecutor;
use crate::models::{MergeState, OperationType, ResolutionResult, Side};

/// Drives git for the operations that move a conflicted workspace forward.
///
/// Every command runs with `GIT_EDITOR=true` so continue, commit and abort
/// never wait on an interactive editor.
#[derive(Debug, Clone)]
pub struct WorkspaceOperations {
    executor: GitExecutor,
}

impl WorkspaceOperations {
    pub fn new(executor: GitExecutor) -> Self {
        Self {
            executor: executor.with_env("GIT_EDITOR", "true"),
        }
    }

    /// Replace the whole file with one side's version and stage it.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn accept_side(
        &self,
        root: &Path,
        path: &str,
        side: Side,
    ) -> Result<ResolutionResult, ConflictError> {
        workspace_path(root, path)?;
        self.executor
            .run_checked(&["checkout", side.checkout_flag(), "--", path], Some(root))
            .await?;
        self.executor
            .run_checked(&["add", "--", path], Some(root))
            .await?;
        info!(path, ?side, "accepted whole side");

        Ok(ResolutionResult {
            success: true,
            file_path: path.to_string(),
            hunk_id: None,
            strategy: side.into(),
            remaining_conflicts: 0,
            staged: true,
        })
    }

    /// Stage a file the user resolved by hand. Refused while markers remain.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn stage_file(&self, root: &Path, path: &str) -> Result<(), ConflictError> {
        let full = workspace_path(root, path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => {
                if has_conflict_markers(&String::from_utf8_lossy(&bytes)) {
                    return Err(ConflictError::InvalidState(format!(
                        "'{}' still contains conflict markers",
                        path
                    )));
                }
            }
            // A deleted path is staged as a removal.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.executor
            .run_checked(&["add", "--", path], Some(root))
            .await?;
        info!(path, "staged");
        Ok(())
    }

    /// Create the merge commit once every conflict is resolved.
    ///
    /// Without a message the prepared merge message is used as-is.
    #[instrument(skip(self, root, state), fields(root = %root.display()))]
    pub async fn commit_merge(
        &self,
        root: &Path,
        state: &MergeState,
        message: Option<&str>,
    ) -> Result<String, ConflictError> {
        ensure_no_conflicts(state)?;
        let args: Vec<&str> = match message {
            Some(msg) => vec!["commit", "-m", msg],
            None => vec!["commit", "--no-edit"],
        };
        self.executor.run_checked(&args, Some(root)).await?;
        let sha = self
            .executor
            .run_checked(&["rev-parse", "HEAD"], Some(root))
            .await?;
        info!(%sha, "merge committed");
        Ok(sha)
    }

    /// Continue the operation in progress.
    ///
    /// A merge has no `--continue` step here; it is concluded by committing.
    #[instrument(skip(self, root, state), fields(root = %root.display(), operation = %state.operation))]
    pub async fn continue_operation(
        &self,
        root: &Path,
        state: &MergeState,
    ) -> Result<String, ConflictError> {
        ensure_no_conflicts(state)?;
        let args: [&str; 2] = match (state.operation, state.operation.subcommand()) {
            (OperationType::Merge, _) => ["commit", "--no-edit"],
            (_, Some(sub)) => [sub, "--continue"],
            (_, None) => {
                return Err(ConflictError::InvalidState(
                    "no merge, rebase, cherry-pick or revert is in progress".into(),
                ))
            }
        };
        let output = self.executor.run_checked(&args, Some(root)).await?;
        info!("operation continued");
        Ok(output)
    }

    /// Abort the operation in progress, restoring the pre-operation state.
    #[instrument(skip(self, root, state), fields(root = %root.display(), operation = %state.operation))]
    pub async fn abort_operation(
        &self,
        root: &Path,
        state: &MergeState,
    ) -> Result<String, ConflictError> {
        let sub = state
            .operation
            .subcommand()
            .ok_or_else(|| ConflictError::InvalidState("nothing to abort".into()))?;
        let output = self
            .executor
            .run_checked(&[sub, "--abort"], Some(root))
            .await?;
        info!("operation aborted");
        Ok(output)
    }
}

fn ensure_no_conflicts(state: &MergeState) -> Result<(), ConflictError> {
    if state.has_conflicts {
        return Err(ConflictError::InvalidState(format!(
            "{} file(s) still have unresolved conflicts",
            state.conflict_files.len()
        )));
    }
    Ok(())
}
