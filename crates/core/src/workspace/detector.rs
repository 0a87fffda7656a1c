//! Workspace state detection.
//!
//! Combines several independent signals (pseudo-refs, rebase state
//! directories, the porcelain status listing) into one [`MergeState`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::config::LimitsConfig;
use crate::conflict::fs::read_capped;
use crate::conflict::parser::ConflictParser;
use crate::errors::ConflictError;
use crate::git::GitExecutor;
use crate::models::{ConflictFile, MergeState, OperationType};

const REBASE_DIRS: [&str; 2] = ["rebase-merge", "rebase-apply"];

/// Inspects a workspace for in-progress operations and conflicted files.
#[derive(Debug, Clone)]
pub struct WorkspaceDetector {
    executor: GitExecutor,
    parser: ConflictParser,
    max_file_bytes: u64,
}

impl WorkspaceDetector {
    pub fn new(executor: GitExecutor, limits: &LimitsConfig) -> Self {
        Self {
            executor,
            parser: ConflictParser::new(limits.context_lines),
            max_file_bytes: limits.max_file_bytes,
        }
    }

    /// Resolve the top-level directory of the working tree containing `path`.
    pub async fn workspace_root(&self, path: &Path) -> Result<PathBuf, ConflictError> {
        let inside = self
            .executor
            .run(&["rev-parse", "--is-inside-work-tree"], Some(path))
            .await;
        if !inside.success || inside.stdout != "true" {
            return Err(ConflictError::NotAWorkspace(path.display().to_string()));
        }
        let top = self
            .executor
            .run_checked(&["rev-parse", "--show-toplevel"], Some(path))
            .await?;
        Ok(PathBuf::from(top))
    }

    /// Detect the operation in progress and the unmerged paths.
    ///
    /// The four operation checks all run, in the order merge, rebase,
    /// cherry-pick, revert, and each successful check overwrites the type
    /// and incoming ref set by earlier ones. When several signals coexist the
    /// last one wins; callers route continue/abort on that outcome.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn detect(&self, root: &Path) -> Result<MergeState, ConflictError> {
        let git_dir = git_dir(root).await;
        let mut state = MergeState {
            current_branch: self.current_branch(root).await,
            ..Default::default()
        };

        if let Some(sha) = self.verify_ref(root, "MERGE_HEAD").await {
            state.operation = OperationType::Merge;
            state.incoming_ref = Some(self.describe(root, &sha).await);
        }

        if let Some(dir) = rebase_dir(&git_dir).await {
            state.operation = OperationType::Rebase;
            state.incoming_ref = self.rebase_target(root, &dir).await;
            let (step, total) = read_rebase_progress(&dir).await;
            state.current_step = step;
            state.total_steps = total;
            if state.current_branch.is_empty() {
                if let Some(name) = read_trimmed(&dir.join("head-name")).await {
                    state.current_branch = name.trim_start_matches("refs/heads/").to_string();
                }
            }
        }

        if let Some(sha) = self.verify_ref(root, "CHERRY_PICK_HEAD").await {
            state.operation = OperationType::CherryPick;
            state.incoming_ref = Some(self.describe(root, &sha).await);
        }

        if let Some(sha) = self.verify_ref(root, "REVERT_HEAD").await {
            state.operation = OperationType::Revert;
            state.incoming_ref = Some(self.describe(root, &sha).await);
        }

        if state.current_branch.is_empty() {
            state.current_branch = "HEAD".to_string();
        }
        if state.operation != OperationType::None {
            state.merge_message = read_trimmed(&git_dir.join("MERGE_MSG")).await;
        }

        let status = self
            .executor
            .run_checked(&["status", "--porcelain=v2"], Some(root))
            .await?;
        state.conflict_files = parse_unmerged_paths(&status);
        state.has_conflicts = !state.conflict_files.is_empty();

        info!(
            operation = %state.operation,
            conflicts = state.conflict_files.len(),
            "workspace state detected"
        );
        Ok(state)
    }

    /// Load every conflicted file listed in `state`.
    ///
    /// A file that cannot be read or is over the size cap is logged and
    /// reported with no hunks; it never aborts the whole listing.
    pub async fn conflict_files(&self, root: &Path, state: &MergeState) -> Vec<ConflictFile> {
        let mut files = Vec::with_capacity(state.conflict_files.len());
        for path in &state.conflict_files {
            files.push(self.load_conflict_file(root, path).await);
        }
        files
    }

    /// Classify and parse one conflicted file.
    pub async fn load_conflict_file(&self, root: &Path, path: &str) -> ConflictFile {
        if self.is_binary(root, path).await {
            debug!(path, "binary conflict");
            return ConflictFile::binary(path);
        }
        match read_capped(root, path, self.max_file_bytes).await {
            Ok(content) => ConflictFile::text(path, self.parser.parse(&content, path)),
            Err(ConflictError::BinaryFile(_)) => {
                debug!(path, "conflicted file is not UTF-8, treating as binary");
                ConflictFile::binary(path)
            }
            Err(e) => {
                warn!(path, error = %e, "could not read conflicted file");
                ConflictFile::text(path, Vec::new())
            }
        }
    }

    /// Only catches binaries git still diffs as such. For an unmerged path
    /// `diff --numstat` prints `0\t0\t<path>` instead of `-\t-`, so a real
    /// binary conflict slips past this check and is caught by the UTF-8 read
    /// in [`Self::load_conflict_file`].
    async fn is_binary(&self, root: &Path, path: &str) -> bool {
        let out = self
            .executor
            .run(&["diff", "--numstat", "--", path], Some(root))
            .await;
        out.success && numstat_is_binary(&out.stdout)
    }

    async fn current_branch(&self, root: &Path) -> String {
        let out = self
            .executor
            .run(&["branch", "--show-current"], Some(root))
            .await;
        if out.success {
            out.stdout
        } else {
            String::new()
        }
    }

    async fn verify_ref(&self, root: &Path, name: &str) -> Option<String> {
        let out = self
            .executor
            .run(&["rev-parse", "--verify", "--quiet", name], Some(root))
            .await;
        if out.success && !out.stdout.is_empty() {
            debug!(name, sha = %out.stdout, "ref present");
            Some(out.stdout)
        } else {
            None
        }
    }

    /// Human-readable name for a commit, falling back to the sha itself.
    async fn describe(&self, root: &Path, sha: &str) -> String {
        let out = self
            .executor
            .run(&["name-rev", "--name-only", sha], Some(root))
            .await;
        if out.success && !out.stdout.is_empty() && out.stdout != "undefined" {
            out.stdout
        } else {
            sha.to_string()
        }
    }

    async fn rebase_target(&self, root: &Path, dir: &Path) -> Option<String> {
        if let Some(onto) = read_trimmed(&dir.join("onto")).await {
            return Some(self.describe(root, &onto).await);
        }
        match self.verify_ref(root, "REBASE_HEAD").await {
            Some(sha) => Some(self.describe(root, &sha).await),
            None => None,
        }
    }
}

/// Locate the git directory for a working tree root, following a
/// `gitdir: <path>` pointer file as used by linked worktrees.
pub async fn git_dir(root: &Path) -> PathBuf {
    let dot_git = root.join(".git");
    if let Ok(text) = tokio::fs::read_to_string(&dot_git).await {
        if let Some(target) = text.trim().strip_prefix("gitdir:") {
            let target = PathBuf::from(target.trim());
            return if target.is_absolute() {
                target
            } else {
                root.join(target)
            };
        }
    }
    dot_git
}

async fn rebase_dir(git_dir: &Path) -> Option<PathBuf> {
    for name in REBASE_DIRS {
        let dir = git_dir.join(name);
        if tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            debug!(dir = %dir.display(), "rebase in progress");
            return Some(dir);
        }
    }
    None
}

/// Progress counters; `rebase-merge` uses msgnum/end, `rebase-apply` next/last.
async fn read_rebase_progress(dir: &Path) -> (Option<u32>, Option<u32>) {
    let step = match read_number(&dir.join("msgnum")).await {
        Some(n) => Some(n),
        None => read_number(&dir.join("next")).await,
    };
    let total = match read_number(&dir.join("end")).await {
        Some(n) => Some(n),
        None => read_number(&dir.join("last")).await,
    };
    (step, total)
}

async fn read_number(path: &Path) -> Option<u32> {
    read_trimmed(path).await.and_then(|s| s.parse().ok())
}

async fn read_trimmed(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "state file not readable");
            None
        }
    }
}

/// Extract unmerged paths from `git status --porcelain=v2` output.
///
/// Unmerged records look like
/// `u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>`; the path is the
/// last tab-separated field when a tab is present, otherwise everything after
/// the tenth space.
pub fn parse_unmerged_paths(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| line.starts_with("u "))
        .filter_map(|line| {
            let raw = match line.rsplit_once('\t') {
                Some((_, path)) => path,
                None => line.splitn(11, ' ').nth(10)?,
            };
            Some(unquote_path(raw))
        })
        .collect()
}

/// Undo git's C-style quoting of unusual paths.
fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `diff --numstat` reports `-\t-\t<path>` for binary content.
pub fn numstat_is_binary(numstat: &str) -> bool {
    numstat.lines().next().is_some_and(|line| {
        let mut fields = line.split('\t');
        fields.next() == Some("-") && fields.next() == Some("-")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unmerged_paths() {
        let status = "\
# branch.oid 1234
# branch.head main
1 .M N... 100644 100644 100644 aaa bbb src/clean.rs
u UU N... 100644 100644 100644 100644 h1 h2 h3 src/lib.rs
u AA N... 000000 100644 100644 100644 h1 h2 h3 docs/with space.md
? untracked.txt
";
        assert_eq!(
            parse_unmerged_paths(status),
            vec!["src/lib.rs".to_string(), "docs/with space.md".to_string()]
        );
    }

    #[test]
    fn test_parse_unmerged_paths_tab_and_quotes() {
        let status = "u UU N... 1 2 3 4 h1 h2 h3 ignored\treal/path.txt\n\
                      u UU N... 1 2 3 4 h1 h2 h3 \"we\\\"ird.txt\"\n";
        assert_eq!(
            parse_unmerged_paths(status),
            vec!["real/path.txt".to_string(), "we\"ird.txt".to_string()]
        );
    }

    #[test]
    fn test_parse_unmerged_paths_empty() {
        assert!(parse_unmerged_paths("").is_empty());
        assert!(parse_unmerged_paths("1 .M N... 1 2 3 a b file").is_empty());
    }

    #[test]
    fn test_numstat_binary_heuristic() {
        assert!(numstat_is_binary("-\t-\timage.png"));
        assert!(!numstat_is_binary("3\t1\tsrc/lib.rs"));
        assert!(!numstat_is_binary(""));
    }

    #[tokio::test]
    async fn test_non_utf8_conflict_file_is_binary() {
        use crate::config::ExecutorConfig;

        let exec = GitExecutor::new(&ExecutorConfig {
            git_binary: "gitmend-test-no-git".into(),
            ..Default::default()
        });
        let detector = WorkspaceDetector::new(exec, &LimitsConfig::default());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.bin"), [0x00, 0x9f, 0x92, 0x96]).unwrap();
        std::fs::write(
            dir.path().join("a.txt"),
            "<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> t\n",
        )
        .unwrap();

        let file = detector.load_conflict_file(dir.path(), "b.bin").await;
        assert!(file.is_binary);
        assert_eq!(file.conflict_count, 1);
        assert!(file.hunks.is_empty());

        let file = detector.load_conflict_file(dir.path(), "a.txt").await;
        assert!(!file.is_binary);
        assert_eq!(file.hunks.len(), 1);
    }

    #[tokio::test]
    async fn test_git_dir_follows_pointer_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(git_dir(dir.path()).await, dir.path().join(".git"));

        std::fs::write(dir.path().join(".git"), "gitdir: ../main/.git/worktrees/wt\n").unwrap();
        assert_eq!(
            git_dir(dir.path()).await,
            dir.path().join("../main/.git/worktrees/wt")
        );
    }

    #[tokio::test]
    async fn test_rebase_progress_from_either_layout() {
        let dir = tempfile::tempdir().unwrap();
        let merge_dir = dir.path().join("rebase-merge");
        std::fs::create_dir(&merge_dir).unwrap();
        std::fs::write(merge_dir.join("msgnum"), "2\n").unwrap();
        std::fs::write(merge_dir.join("end"), "5\n").unwrap();
        assert_eq!(read_rebase_progress(&merge_dir).await, (Some(2), Some(5)));

        let apply_dir = dir.path().join("rebase-apply");
        std::fs::create_dir(&apply_dir).unwrap();
        std::fs::write(apply_dir.join("next"), "1").unwrap();
        std::fs::write(apply_dir.join("last"), "garbage").unwrap();
        assert_eq!(read_rebase_progress(&apply_dir).await, (Some(1), None));

        assert_eq!(rebase_dir(dir.path()).await, Some(merge_dir));
    }
}
