//! One-shot command execution with timeout and output capture.
//!
//! Every approved command runs in a fresh, non-interactive child process.
//! Nothing (working directory, variables) carries over between commands.
//! [`execute`] never fails: spawn problems and timeouts are reported through
//! [`ExecutionStatus`] so the session can keep going.

mod noise;
mod process;
mod render;

use serde::Serialize;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::shell::{CommandInvocation, Dialect};
use process::{run_invocation, ProcessExit};

pub use render::{format_duration, parse_duration};

/// Exit code reported when no real exit status exists (timeout, spawn error).
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// How an execution ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    TimedOut,
    SpawnError,
}

/// Result of running one [`CommandInvocation`]. Immutable once returned.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Real exit status for `Completed`; [`UNKNOWN_EXIT_CODE`] otherwise.
    pub exit_code: i32,
    pub status: ExecutionStatus,
    pub duration: Duration,
    /// Output exceeded the capture cap and was cut.
    pub truncated: bool,
}

impl ExecutionResult {
    fn spawn_error(message: String, duration: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            exit_code: UNKNOWN_EXIT_CODE,
            status: ExecutionStatus::SpawnError,
            duration,
            truncated: false,
        }
    }

    /// Completed with exit code zero.
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Completed && self.exit_code == 0
    }

    /// Output is incomplete because the command was killed.
    pub fn is_partial(&self) -> bool {
        self.status == ExecutionStatus::TimedOut
    }

    /// Either stream carries non-whitespace text.
    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty() || !self.stderr.trim().is_empty()
    }
}

/// Per-command slot a caller holds while a command is proposed or running.
///
/// Keeps "not run yet" apart from "ran and printed nothing".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ExecutionOutcome {
    #[default]
    Pending,
    Finished(ExecutionResult),
}

impl ExecutionOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Pending => None,
            Self::Finished(result) => Some(result),
        }
    }
}

impl From<ExecutionResult> for ExecutionOutcome {
    fn from(result: ExecutionResult) -> Self {
        Self::Finished(result)
    }
}

/// Run `invocation` and wait at most `limit` for it.
///
/// Returns within `limit` plus a small bounded cleanup window. On timeout the
/// child's process tree is killed and whatever output was already produced
/// is returned, marked partial.
pub async fn execute(invocation: &CommandInvocation, limit: Duration) -> ExecutionResult {
    let started = Instant::now();
    info!(
        dialect = %invocation.dialect(),
        program = invocation.program(),
        command = invocation.raw_command(),
        timeout = %format_duration(limit),
        "executing command"
    );

    let output = match run_invocation(invocation, limit).await {
        Ok(output) => output,
        Err(err) => {
            warn!(program = invocation.program(), error = %err, "failed to start command");
            return ExecutionResult::spawn_error(
                format!("failed to start `{}`: {err}", invocation.program()),
                started.elapsed(),
            );
        }
    };

    let stdout = decode_output(&output.stdout);
    let mut stderr = decode_output(&output.stderr);
    if invocation.dialect() == Dialect::PowerShell {
        stderr = noise::strip_powershell_noise(&stderr);
    }

    let duration = started.elapsed();
    let result = match output.exit {
        ProcessExit::Exited(code) => ExecutionResult {
            stdout,
            stderr,
            exit_code: code,
            status: ExecutionStatus::Completed,
            duration,
            truncated: output.truncated,
        },
        ProcessExit::TimedOut => {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "command timed out after {}; output is partial",
                format_duration(limit)
            ));
            ExecutionResult {
                stdout,
                stderr,
                exit_code: UNKNOWN_EXIT_CODE,
                status: ExecutionStatus::TimedOut,
                duration,
                truncated: output.truncated,
            }
        }
    };
    info!(
        status = ?result.status,
        exit_code = result.exit_code,
        stdout_len = result.stdout.len(),
        stderr_len = result.stderr.len(),
        elapsed = %format_duration(duration),
        "command finished"
    );
    result
}

/// Lossy UTF-8 decode with BOM removal.
fn decode_output(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
