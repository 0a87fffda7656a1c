//! Bounded subprocess execution of the git CLI.
//!
//! Every git invocation in gitmend goes through [`GitExecutor::run`]. The
//! call never fails: launch errors, timeouts and non-zero exits all come back
//! as a [`CommandOutput`] with `success == false`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::ExecutorConfig;
use crate::errors::ConflictError;

pub const TIMEOUT_MESSAGE: &str = "Command timed out";

/// Structured outcome of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Trimmed, possibly truncated stdout.
    pub stdout: String,
    /// Trimmed, possibly truncated stderr.
    pub stderr: String,
    /// Process exit code; -1 on launch failure, timeout or signal.
    pub exit_code: i32,
}

impl CommandOutput {
    fn failure(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: -1,
        }
    }

    pub fn timed_out(&self) -> bool {
        !self.success && self.exit_code == -1 && self.stderr == TIMEOUT_MESSAGE
    }
}

/// Runs the git binary with a timeout and capped output capture.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    binary: String,
    timeout: Duration,
    max_output_bytes: usize,
    envs: Vec<(String, String)>,
}

impl GitExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            binary: config.git_binary.clone(),
            timeout: config.timeout(),
            max_output_bytes: config.max_output_bytes,
            envs: Vec::new(),
        }
    }

    /// Return a copy that sets an extra environment variable on every command.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run `git <args>` in `cwd` and capture its output.
    #[instrument(skip(self), fields(binary = %self.binary))]
    pub async fn run(&self, args: &[&str], cwd: Option<&Path>) -> CommandOutput {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(cmd = %format!("git {}", args.join(" ")), "running git command");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "failed to launch git");
                return CommandOutput::failure(e.to_string());
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;

        let outcome = tokio::time::timeout(self.timeout, async {
            tokio::join!(
                read_bounded(stdout, limit),
                read_bounded(stderr, limit),
                child.wait()
            )
        })
        .await;

        match outcome {
            Ok((out, err, Ok(status))) => {
                let exit_code = status.code().unwrap_or(-1);
                let output = CommandOutput {
                    success: status.success(),
                    stdout: String::from_utf8_lossy(&out).trim().to_string(),
                    stderr: String::from_utf8_lossy(&err).trim().to_string(),
                    exit_code,
                };
                if !output.success {
                    debug!(exit_code, stderr = %output.stderr, "git command failed");
                }
                output
            }
            Ok((_, _, Err(e))) => {
                warn!(error = %e, "failed to wait for git");
                CommandOutput::failure(e.to_string())
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "git command timed out");
                let _ = child.start_kill();
                CommandOutput::failure(TIMEOUT_MESSAGE)
            }
        }
    }

    /// Run a command and map any failure into a [`ConflictError`].
    pub async fn run_checked(&self, args: &[&str], cwd: Option<&Path>) -> Result<String, ConflictError> {
        let output = self.run(args, cwd).await;
        if output.success {
            return Ok(output.stdout);
        }
        let command = args.join(" ");
        if output.timed_out() {
            return Err(ConflictError::CommandTimedOut(command));
        }
        Err(ConflictError::CommandFailed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }
}

/// Drain `reader` to EOF, keeping at most `limit` bytes.
///
/// Reading continues past the limit so the child never blocks on a full pipe.
async fn read_bounded<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> Vec<u8> {
    let Some(mut reader) = reader else {
        return Vec::new();
    };
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    buf
}
