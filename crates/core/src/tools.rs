//! Uniform request/response surface over the conflict engine.
//!
//! Every operation takes a parameter struct (camelCase keys) and returns a
//! discriminated [`ToolResponse`]. Faults never escape this layer: every
//! [`ConflictError`] is turned into `{ "success": false, "error", "code" }`.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::conflict::{format_suggestion_prompt, ConflictNavigator, ConflictOrchestrator};
use crate::errors::{ConflictError, CoreError};
use crate::git::GitExecutor;
use crate::models::{
    ConflictFile, ConflictHunk, Direction, MergeState, NavigationResult, OperationType,
    ResolutionResult, ResolutionStrategy, Side,
};
use crate::workspace::{WorkspaceDetector, WorkspaceOperations};

/// Names accepted by [`ConflictService::dispatch`].
pub const TOOL_NAMES: &[&str] = &[
    "merge_state",
    "list_conflicts",
    "show_conflicts",
    "resolve_conflict",
    "resolve_file",
    "accept_side",
    "navigate",
    "suggest_resolution",
    "stage_file",
    "commit_merge",
    "continue_operation",
    "abort_operation",
];

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Discriminated result returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(err: &ConflictError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveHunkParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub file_path: String,
    pub hunk_index: usize,
    pub strategy: ResolutionStrategy,
    #[serde(default)]
    pub manual_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveFileParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub file_path: String,
    pub strategy: ResolutionStrategy,
    #[serde(default)]
    pub manual_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptSideParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub file_path: String,
    pub side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub direction: Direction,
    /// Current position; both fields must be present to be used.
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub hunk_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    pub file_path: String,
    #[serde(default)]
    pub hunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitParams {
    #[serde(default = "default_workspace")]
    pub workspace_path: PathBuf,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Result payloads
// ---------------------------------------------------------------------------

/// Prompt rendered for one hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub file_path: String,
    pub hunk_index: usize,
    pub hunk: ConflictHunk,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub file_path: String,
    pub staged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub operation: OperationType,
    pub output: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Entry point for callers: owns the configured components and exposes each
/// operation both as a typed method and through [`ConflictService::dispatch`].
#[derive(Debug, Clone)]
pub struct ConflictService {
    config: AppConfig,
    detector: WorkspaceDetector,
    orchestrator: ConflictOrchestrator,
    operations: WorkspaceOperations,
}

impl ConflictService {
    pub fn new(config: AppConfig) -> Self {
        let executor = GitExecutor::new(&config.executor);
        Self {
            detector: WorkspaceDetector::new(executor.clone(), &config.limits),
            orchestrator: ConflictOrchestrator::new(executor.clone(), &config.limits),
            operations: WorkspaceOperations::new(executor),
            config,
        }
    }

    /// Load and validate a TOML configuration, then build the service from it.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let config = AppConfig::load_and_validate(path)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Route a named tool call. Never fails; errors become failure responses.
    pub async fn dispatch(&self, name: &str, params: Value) -> ToolResponse {
        debug!(tool = name, "dispatching tool call");
        match self.route(name, params).await {
            Ok(data) => ToolResponse::ok(data),
            Err(e) => {
                warn!(tool = name, code = e.code(), error = %e, "tool call failed");
                ToolResponse::failure(&e)
            }
        }
    }

    async fn route(&self, name: &str, params: Value) -> Result<Value, ConflictError> {
        match name {
            "merge_state" => to_data(self.merge_state(&parse(params)?).await?),
            "list_conflicts" => to_data(self.list_conflicts(&parse(params)?).await?),
            "show_conflicts" => to_data(self.show_conflicts(&parse(params)?).await?),
            "resolve_conflict" => to_data(self.resolve_conflict(&parse(params)?).await?),
            "resolve_file" => to_data(self.resolve_file(&parse(params)?).await?),
            "accept_side" => to_data(self.accept_side(&parse(params)?).await?),
            "navigate" => to_data(self.navigate(&parse(params)?).await?),
            "suggest_resolution" => to_data(self.suggest_resolution(&parse(params)?).await?),
            "stage_file" => to_data(self.stage_file(&parse(params)?).await?),
            "commit_merge" => to_data(self.commit_merge(&parse(params)?).await?),
            "continue_operation" => to_data(self.continue_operation(&parse(params)?).await?),
            "abort_operation" => to_data(self.abort_operation(&parse(params)?).await?),
            other => Err(ConflictError::InvalidParams(format!(
                "unknown tool '{}'; expected one of: {}",
                other,
                TOOL_NAMES.join(", ")
            ))),
        }
    }

    /// Workspace root; every operation checks this first.
    async fn root(&self, workspace: &Path) -> Result<PathBuf, ConflictError> {
        self.detector.workspace_root(workspace).await
    }

    pub async fn merge_state(&self, p: &WorkspaceParams) -> Result<MergeState, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        self.detector.detect(&root).await
    }

    pub async fn list_conflicts(
        &self,
        p: &WorkspaceParams,
    ) -> Result<Vec<ConflictFile>, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let state = self.detector.detect(&root).await?;
        Ok(self.detector.conflict_files(&root, &state).await)
    }

    pub async fn show_conflicts(&self, p: &FileParams) -> Result<ConflictFile, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let hunks = self.orchestrator.parse_file(&root, &p.file_path).await?;
        Ok(ConflictFile::text(p.file_path.clone(), hunks))
    }

    pub async fn resolve_conflict(
        &self,
        p: &ResolveHunkParams,
    ) -> Result<ResolutionResult, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        self.orchestrator
            .resolve_hunk(
                &root,
                &p.file_path,
                p.hunk_index,
                p.strategy,
                p.manual_content.as_deref(),
            )
            .await
    }

    pub async fn resolve_file(
        &self,
        p: &ResolveFileParams,
    ) -> Result<ResolutionResult, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        self.orchestrator
            .resolve_all(&root, &p.file_path, p.strategy, p.manual_content.as_deref())
            .await
    }

    pub async fn accept_side(
        &self,
        p: &AcceptSideParams,
    ) -> Result<ResolutionResult, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        self.operations.accept_side(&root, &p.file_path, p.side).await
    }

    pub async fn navigate(&self, p: &NavigateParams) -> Result<NavigationResult, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let state = self.detector.detect(&root).await?;
        let files = self.detector.conflict_files(&root, &state).await;
        let current = match (&p.file_path, p.hunk_index) {
            (Some(path), Some(index)) => Some((path.as_str(), index)),
            _ => None,
        };
        Ok(ConflictNavigator::new(&files).step(current, p.direction))
    }

    pub async fn suggest_resolution(&self, p: &SuggestParams) -> Result<Suggestion, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let hunks = self.orchestrator.parse_file(&root, &p.file_path).await?;
        let count = hunks.len();
        let hunk = hunks
            .into_iter()
            .nth(p.hunk_index)
            .ok_or(ConflictError::InvalidIndex {
                index: p.hunk_index,
                count,
            })?;
        let extension = Path::new(&p.file_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let prompt = format_suggestion_prompt(&hunk, &p.file_path, extension);
        Ok(Suggestion {
            file_path: p.file_path.clone(),
            hunk_index: p.hunk_index,
            hunk,
            prompt,
        })
    }

    pub async fn stage_file(&self, p: &FileParams) -> Result<StageOutcome, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        self.operations.stage_file(&root, &p.file_path).await?;
        Ok(StageOutcome {
            file_path: p.file_path.clone(),
            staged: true,
        })
    }

    pub async fn commit_merge(&self, p: &CommitParams) -> Result<CommitOutcome, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let state = self.detector.detect(&root).await?;
        let commit = self
            .operations
            .commit_merge(&root, &state, p.message.as_deref())
            .await?;
        Ok(CommitOutcome { commit })
    }

    pub async fn continue_operation(
        &self,
        p: &WorkspaceParams,
    ) -> Result<OperationOutcome, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let state = self.detector.detect(&root).await?;
        let output = self.operations.continue_operation(&root, &state).await?;
        Ok(OperationOutcome {
            operation: state.operation,
            output,
        })
    }

    pub async fn abort_operation(
        &self,
        p: &WorkspaceParams,
    ) -> Result<OperationOutcome, ConflictError> {
        let root = self.root(&p.workspace_path).await?;
        let state = self.detector.detect(&root).await?;
        let output = self.operations.abort_operation(&root, &state).await?;
        Ok(OperationOutcome {
            operation: state.operation,
            output,
        })
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, ConflictError> {
    // A missing bag is treated as an empty object so defaults apply.
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ConflictError::InvalidParams(e.to_string()))
}

fn to_data<T: Serialize>(value: T) -> Result<Value, ConflictError> {
    serde_json::to_value(value)
        .map_err(|e| ConflictError::InvalidState(format!("could not encode result: {}", e)))
}
