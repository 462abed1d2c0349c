//! Binary-local orchestration for the CLI subcommands.
//!
//! The library exposes the pipelines; this module wires configuration,
//! approval and output formatting around them.

pub(crate) mod approval;
pub(crate) mod commands;

use askterm::config::Config;

use crate::cli::Command;

/// Run one subcommand and return the process exit code.
pub(crate) async fn run(command: Command, config: &Config, color: bool) -> i32 {
    match command {
        Command::Shell { json } => commands::show_shell(config, json),
        Command::Context {
            lines,
            commands: max_commands,
            json,
        } => commands::show_context(config, lines, max_commands, json).await,
        Command::Run {
            timeout,
            yes,
            json,
            command,
        } => {
            let options = commands::RunOptions {
                timeout: timeout.unwrap_or_else(|| config.execution.timeout()),
                skip_approval: yes,
                json,
                color,
            };
            commands::run_command(config, &command.join(" "), &options).await
        }
    }
}
