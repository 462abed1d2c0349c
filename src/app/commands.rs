//! Subcommand implementations.

use askterm::approval::ApprovalDecision;
use askterm::config::Config;
use askterm::context::{capture_with, CaptureRequest};
use askterm::exec::{execute, ExecutionResult, ExecutionStatus};
use askterm::shell::{resolve_with_override, translate, ShellDescriptor};
use crossterm::style::{Color, Stylize};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{info, warn};

use super::approval::{approval_prompt_actor, prompt_for_approval};

/// Exit code when the command was not run (rejected or prompt closed).
const EXIT_NOT_RUN: i32 = 1;
/// Same convention as coreutils `timeout`.
const EXIT_TIMED_OUT: i32 = 124;
/// Same convention shells use for "command not found".
const EXIT_SPAWN_ERROR: i32 = 127;
/// 128 + SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

pub(crate) struct RunOptions {
    pub(crate) timeout: Duration,
    pub(crate) skip_approval: bool,
    pub(crate) json: bool,
    pub(crate) color: bool,
}

fn resolve_shell(config: &Config) -> ShellDescriptor {
    resolve_with_override(config.shell.shell_override.as_deref())
}

/// `askterm shell`
pub(crate) fn show_shell(config: &Config, json: bool) -> i32 {
    let descriptor = resolve_shell(config);
    if json {
        return print_json(&descriptor);
    }
    println!("{descriptor}");
    0
}

/// `askterm context`
pub(crate) async fn show_context(
    config: &Config,
    lines: Option<usize>,
    max_commands: Option<usize>,
    json: bool,
) -> i32 {
    let descriptor = resolve_shell(config);
    let request = CaptureRequest::new(
        lines.unwrap_or(config.context.max_lines),
        std::env::args(),
    )
    .with_max_commands(max_commands.unwrap_or(config.context.max_commands))
    .with_shell_name(descriptor.shell_name());
    let snapshot = capture_with(&request).await;
    if json {
        return print_json(&snapshot);
    }
    print!("{}", snapshot.to_model_text());
    0
}

#[derive(Serialize)]
struct RunReport<'a> {
    command: &'a str,
    shell: &'a ShellDescriptor,
    result: &'a ExecutionResult,
}

/// `askterm run`
pub(crate) async fn run_command(config: &Config, raw_command: &str, options: &RunOptions) -> i32 {
    let descriptor = resolve_shell(config);

    let decision = if options.skip_approval {
        ApprovalDecision::Approve
    } else {
        let actor = approval_prompt_actor(&descriptor);
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stderr();
        match prompt_for_approval(&mut input, &mut out, &actor, raw_command, options.color) {
            Ok(decision) => decision,
            Err(err) => {
                eprintln!("error: approval prompt failed: {err}");
                return EXIT_NOT_RUN;
            }
        }
    };
    let Some(command) = decision.resolve(raw_command) else {
        info!(command = raw_command, "command rejected");
        eprintln!("command not run");
        return EXIT_NOT_RUN;
    };

    let invocation = translate(&command, &descriptor);
    let result = tokio::select! {
        result = execute(&invocation, options.timeout) => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the execution future kills the child's process tree.
            warn!(command = %command, "interrupted; command killed");
            eprintln!("interrupted");
            return EXIT_INTERRUPTED;
        }
    };

    if options.json {
        let report = RunReport {
            command: &command,
            shell: &descriptor,
            result: &result,
        };
        let code = print_json(&report);
        if code != 0 {
            return code;
        }
    } else {
        print_result(&result, config.execution.max_output_bytes, options.color);
    }
    exit_code_for(&result)
}

fn print_result(result: &ExecutionResult, max_bytes: usize, color: bool) {
    let text = result.to_model_text(max_bytes);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
    if !result.succeeded() {
        let label = match result.status {
            ExecutionStatus::Completed => format!("exited with {}", result.exit_code),
            ExecutionStatus::TimedOut => "timed out".to_string(),
            ExecutionStatus::SpawnError => "failed to start".to_string(),
        };
        if color {
            eprintln!("{} {}", "•".with(Color::DarkGrey), label.with(Color::Red));
        } else {
            eprintln!("• {label}");
        }
    }
}

/// Mirror the command's exit status in the process exit status.
fn exit_code_for(result: &ExecutionResult) -> i32 {
    match result.status {
        ExecutionStatus::Completed => result.exit_code,
        ExecutionStatus::TimedOut => EXIT_TIMED_OUT,
        ExecutionStatus::SpawnError => EXIT_SPAWN_ERROR,
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(err) => {
            eprintln!("error: failed to encode JSON: {err}");
            1
        }
    }
}
