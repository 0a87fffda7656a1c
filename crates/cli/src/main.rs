//! gitmend command-line conflict resolution tool.
//!
//! A thin surface over the core tool contract: every subcommand builds a
//! parameter bag, dispatches it through [`ConflictService`], and renders the
//! response either for humans or, with `--json`, verbatim.

mod render;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitmend_core::config::{AppConfig, DEFAULT_CONFIG_TOML};
use gitmend_core::models::{ConflictFile, ResolutionStrategy};
use gitmend_core::CoreError;
use gitmend_core::tools::{ConflictService, ToolResponse, TOOL_NAMES};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// gitmend command-line conflict resolution tool.
#[derive(Parser, Debug)]
#[command(
    name = "gitmend",
    version,
    about = "Inspect and resolve merge conflicts in a git workspace"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the raw tool response as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Run as if started in this directory.
    #[arg(short = 'C', global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the operation in progress and the conflicted files.
    Status,

    /// List conflicted files with their hunks.
    List,

    /// Show every conflict in one file.
    Show {
        /// File path relative to the workspace root.
        file: String,
    },

    /// Resolve one hunk, or every hunk in a file.
    Resolve {
        /// File path relative to the workspace root.
        file: String,

        /// Resolution: ours, theirs, both or manual.
        #[arg(short, long)]
        strategy: ResolutionStrategy,

        /// Resolve only this hunk (0-based). Omit to resolve the whole file.
        #[arg(long)]
        hunk: Option<usize>,

        /// Replacement text for the manual strategy.
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read replacement text for the manual strategy from a file.
        #[arg(long)]
        content_file: Option<PathBuf>,
    },

    /// Take one side's version of a whole file and stage it.
    Accept {
        /// File path relative to the workspace root.
        file: String,

        /// Side to keep.
        #[arg(value_enum)]
        side: SideArg,
    },

    /// Jump to the next conflict.
    Next {
        #[command(flatten)]
        position: PositionArgs,
    },

    /// Jump to the previous conflict.
    Prev {
        #[command(flatten)]
        position: PositionArgs,
    },

    /// Print a resolution prompt for one hunk.
    Suggest {
        /// File path relative to the workspace root.
        file: String,

        /// Hunk index (0-based).
        #[arg(long, default_value = "0")]
        hunk: usize,
    },

    /// Stage a file resolved by hand.
    Stage {
        /// File path relative to the workspace root.
        file: String,
    },

    /// Commit the merge once every conflict is resolved.
    Commit {
        /// Commit message. Defaults to the prepared merge message.
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Continue the merge, rebase, cherry-pick or revert in progress.
    Continue,

    /// Abort the merge, rebase, cherry-pick or revert in progress.
    Abort,

    /// Invoke a tool by name with a JSON parameter object.
    Call {
        /// Tool name, e.g. list_conflicts.
        tool: String,

        /// JSON parameters. `workspacePath` defaults to the -C directory.
        params: Option<String>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(clap::Args, Debug)]
struct PositionArgs {
    /// Current file, as printed by a previous step.
    #[arg(long, requires = "hunk")]
    file: Option<String>,

    /// Current hunk index within --file.
    #[arg(long, requires = "file")]
    hunk: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Ours,
    Theirs,
}

impl SideArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ours => "ours",
            Self::Theirs => "theirs",
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // init and validate must run even when the configured file is broken.
    let standalone = matches!(cli.command, Commands::Init { .. } | Commands::Validate);
    let service = if standalone {
        ConflictService::new(AppConfig::default())
    } else {
        match load_service(cli.config.as_deref()) {
            Ok(service) => service,
            Err(e) => {
                match e.downcast_ref::<CoreError>() {
                    Some(core) => eprintln!("Error [{}]: {:#}", core.code(), e),
                    None => eprintln!("Error: {:#}", e),
                }
                return ExitCode::FAILURE;
            }
        }
    };

    // Logs go to stderr so --json output stays machine-readable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&service.config().logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli, service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, service: ConflictService) -> Result<()> {
    let ws = cli.workspace.display().to_string();

    match cli.command {
        Commands::Init { output, force } => cmd_init(output, force),
        Commands::Validate => cmd_validate(cli.config.as_deref()),
        Commands::Status => {
            let params = json!({ "workspacePath": ws });
            if let Some(data) = call(&service, cli.json, "merge_state", params).await? {
                render::merge_state(&decode(data)?);
            }
            Ok(())
        }
        Commands::List => {
            let params = json!({ "workspacePath": ws });
            if let Some(data) = call(&service, cli.json, "list_conflicts", params).await? {
                render::conflict_list(&decode::<Vec<ConflictFile>>(data)?);
            }
            Ok(())
        }
        Commands::Show { file } => {
            let params = json!({ "workspacePath": ws, "filePath": file });
            if let Some(data) = call(&service, cli.json, "show_conflicts", params).await? {
                render::conflict_file(&decode(data)?);
            }
            Ok(())
        }
        Commands::Resolve {
            file,
            strategy,
            hunk,
            content,
            content_file,
        } => {
            let manual = match (content, content_file) {
                (Some(text), _) => Some(text),
                (None, Some(path)) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                (None, None) => None,
            };
            let (tool, params) = match hunk {
                Some(index) => (
                    "resolve_conflict",
                    json!({
                        "workspacePath": ws,
                        "filePath": file,
                        "hunkIndex": index,
                        "strategy": strategy,
                        "manualContent": manual,
                    }),
                ),
                None => (
                    "resolve_file",
                    json!({
                        "workspacePath": ws,
                        "filePath": file,
                        "strategy": strategy,
                        "manualContent": manual,
                    }),
                ),
            };
            if let Some(data) = call(&service, cli.json, tool, params).await? {
                render::resolution(&decode(data)?);
            }
            Ok(())
        }
        Commands::Accept { file, side } => {
            let params = json!({ "workspacePath": ws, "filePath": file, "side": side.as_str() });
            if let Some(data) = call(&service, cli.json, "accept_side", params).await? {
                render::resolution(&decode(data)?);
            }
            Ok(())
        }
        Commands::Next { position } => cmd_navigate(&service, cli.json, &ws, "next", position).await,
        Commands::Prev { position } => {
            cmd_navigate(&service, cli.json, &ws, "previous", position).await
        }
        Commands::Suggest { file, hunk } => {
            let params = json!({ "workspacePath": ws, "filePath": file, "hunkIndex": hunk });
            if let Some(data) = call(&service, cli.json, "suggest_resolution", params).await? {
                render::suggestion(&decode(data)?);
            }
            Ok(())
        }
        Commands::Stage { file } => {
            let params = json!({ "workspacePath": ws, "filePath": file });
            if let Some(data) = call(&service, cli.json, "stage_file", params).await? {
                render::staged(&decode(data)?);
            }
            Ok(())
        }
        Commands::Commit { message } => {
            let params = json!({ "workspacePath": ws, "message": message });
            if let Some(data) = call(&service, cli.json, "commit_merge", params).await? {
                render::committed(&decode(data)?);
            }
            Ok(())
        }
        Commands::Continue => {
            let params = json!({ "workspacePath": ws });
            if let Some(data) = call(&service, cli.json, "continue_operation", params).await? {
                render::operation("continued", &decode(data)?);
            }
            Ok(())
        }
        Commands::Abort => {
            let params = json!({ "workspacePath": ws });
            if let Some(data) = call(&service, cli.json, "abort_operation", params).await? {
                render::operation("aborted", &decode(data)?);
            }
            Ok(())
        }
        Commands::Call { tool, params } => cmd_call(&service, &ws, &tool, params.as_deref()).await,
    }
}

// ---------------------------------------------------------------------------
// Dispatch helpers
// ---------------------------------------------------------------------------

/// Dispatch a tool call. With `--json` the response is printed and `None`
/// returned; otherwise failures become errors and the data is handed back.
async fn call(
    service: &ConflictService,
    as_json: bool,
    tool: &str,
    params: Value,
) -> Result<Option<Value>> {
    debug!(tool, "calling tool");
    let response = service.dispatch(tool, params).await;

    if as_json {
        print_json(&response)?;
        if !response.success {
            anyhow::bail!("{} failed", tool);
        }
        return Ok(None);
    }

    into_data(response).map(Some)
}

fn into_data(response: ToolResponse) -> Result<Value> {
    if response.success {
        return Ok(response.data.unwrap_or(Value::Null));
    }
    let message = response.error.unwrap_or_else(|| "unknown error".into());
    match response.code {
        Some(code) => anyhow::bail!("{} [{}]", message, code),
        None => anyhow::bail!("{}", message),
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).context("unexpected response shape")
}

fn print_json(response: &ToolResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(response).context("failed to encode response")?;
    println!("{}", text);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_navigate(
    service: &ConflictService,
    as_json: bool,
    ws: &str,
    direction: &str,
    position: PositionArgs,
) -> Result<()> {
    let params = json!({
        "workspacePath": ws,
        "direction": direction,
        "filePath": position.file,
        "hunkIndex": position.hunk,
    });
    if let Some(data) = call(service, as_json, "navigate", params).await? {
        render::navigation(&decode(data)?);
    }
    Ok(())
}

async fn cmd_call(
    service: &ConflictService,
    ws: &str,
    tool: &str,
    params: Option<&str>,
) -> Result<()> {
    if !TOOL_NAMES.contains(&tool) {
        anyhow::bail!(
            "unknown tool '{}'. Available: {}",
            tool,
            TOOL_NAMES.join(", ")
        );
    }

    let mut params: Value = match params {
        Some(text) => serde_json::from_str(text).context("parameters are not valid JSON")?,
        None => json!({}),
    };
    if let Value::Object(map) = &mut params {
        map.entry("workspacePath").or_insert_with(|| json!(ws));
    }

    let response = service.dispatch(tool, params).await;
    print_json(&response)?;
    if !response.success {
        anyhow::bail!("{} failed", tool);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitmend").join("config.toml"))
}

/// Explicit path must exist; the per-user default is optional.
fn load_service(explicit: Option<&Path>) -> Result<ConflictService> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(ConflictService::new(AppConfig::default())),
        },
    };
    ConflictService::from_config_file(&path)
        .with_context(|| format!("failed to load configuration {}", path.display()))
}

fn cmd_init(output: Option<PathBuf>, force: bool) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => default_config_path().context("could not determine a config directory; pass --output")?,
    };

    if output.exists() && !force {
        anyhow::bail!(
            "file already exists: {}. Use --force or a different path.",
            output.display()
        );
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(&output, DEFAULT_CONFIG_TOML).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Adjust limits or the git binary path if needed");
    println!("  2. Validate with: gitmend validate --config {}", output.display());

    Ok(())
}

fn cmd_validate(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("could not determine a config directory; pass --config")?,
    };
    println!("Validating configuration: {}", path.display());
    println!();

    let config = AppConfig::load_from_file(&path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All values are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Git binary    : {}", config.executor.git_binary);
    println!("  Timeout       : {}s", config.executor.timeout_secs);
    println!("  Output cap    : {} bytes", config.executor.max_output_bytes);
    println!("  File size cap : {} bytes", config.limits.max_file_bytes);
    println!("  Context lines : {}", config.limits.context_lines);
    println!("  Log level     : {}", config.logging.level);
    println!();
    println!("Configuration is valid.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from([
            "gitmend", "-C", "/repo", "resolve", "src/lib.rs", "--strategy", "both", "--hunk", "2",
        ])
        .unwrap();
        assert_eq!(cli.workspace, PathBuf::from("/repo"));
        match cli.command {
            Commands::Resolve {
                file,
                strategy,
                hunk,
                ..
            } => {
                assert_eq!(file, "src/lib.rs");
                assert_eq!(strategy, ResolutionStrategy::Both);
                assert_eq!(hunk, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["gitmend", "resolve", "a", "--strategy", "mine"]).is_err());
    }

    #[test]
    fn test_navigation_position_requires_both_flags() {
        assert!(Cli::try_parse_from(["gitmend", "next", "--file", "a.txt"]).is_err());
        assert!(Cli::try_parse_from(["gitmend", "next", "--file", "a.txt", "--hunk", "0"]).is_ok());
    }

    #[test]
    fn test_failed_response_becomes_error() {
        let response = ToolResponse {
            success: false,
            data: None,
            error: Some("boom".into()),
            code: Some("INVALID_STATE".into()),
        };
        let err = into_data(response).unwrap_err();
        assert_eq!(err.to_string(), "boom [INVALID_STATE]");
    }

    #[test]
    fn test_config_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_service(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        let core = err.downcast_ref::<CoreError>().expect("config error kept in chain");
        assert_eq!(core.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_config_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitmend.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let service = load_service(Some(path.as_path())).unwrap();
        assert_eq!(service.config().logging.level, "debug");
    }
}
