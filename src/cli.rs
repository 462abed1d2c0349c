//! CLI argument parsing via clap.

use askterm::exec::parse_duration;
use clap::{ArgAction, Parser, Subcommand};
use std::time::Duration;

/// Run assistant-proposed shell commands and capture terminal context.
#[derive(Debug, Parser)]
#[command(name = "askterm", disable_version_flag = true)]
pub struct Args {
    /// Path to config file (default: ./askterm.toml or ~/.config/askterm/askterm.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug). `ASKTERM_LOG` wins.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print version, commit and build time.
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved shell dialect and executable.
    Shell {
        /// Emit JSON instead of text.
        #[arg(long = "json")]
        json: bool,
    },
    /// Print a snapshot of recent terminal activity.
    Context {
        /// Scrollback lines to request from tmux.
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
        /// History entries to keep when falling back to shell history.
        #[arg(long = "commands")]
        commands: Option<usize>,
        /// Emit JSON instead of text.
        #[arg(long = "json")]
        json: bool,
    },
    /// Ask for approval, then run a command in the resolved shell.
    Run {
        /// Timeout such as `30`, `30s`, `2m` or `500ms`.
        #[arg(short = 't', long = "timeout", value_parser = parse_timeout_arg)]
        timeout: Option<Duration>,
        /// Skip the approval prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
        /// Emit JSON instead of text.
        #[arg(long = "json")]
        json: bool,
        /// Command to run; words are joined with single spaces.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn parse_timeout_arg(raw: &str) -> Result<Duration, String> {
    match parse_duration(raw) {
        Some(duration) if !duration.is_zero() => Ok(duration),
        _ => Err("invalid timeout; use forms like 30, 30s, 10m, 1h, 500ms".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn run_collects_trailing_command_words() {
        let args = Args::parse_from(["askterm", "run", "-t", "10s", "ls", "-la", "/tmp"]);
        match args.command {
            Some(Command::Run {
                timeout,
                yes,
                json,
                command,
            }) => {
                assert_eq!(timeout, Some(Duration::from_secs(10)));
                assert!(!yes);
                assert!(!json);
                assert_eq!(command, vec!["ls", "-la", "/tmp"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Args::try_parse_from(["askterm", "run"]).is_err());
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        assert!(Args::try_parse_from(["askterm", "run", "--timeout", "0", "ls"]).is_err());
        assert!(Args::try_parse_from(["askterm", "run", "--timeout", "soon", "ls"]).is_err());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = Args::parse_from(["askterm", "context", "-vv", "--no-color", "--lines", "40"]);
        assert_eq!(args.verbose, 2);
        assert!(args.no_color);
        match args.command {
            Some(Command::Context { lines, .. }) => assert_eq!(lines, Some(40)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn version_flag_parses_without_subcommand() {
        let args = Args::parse_from(["askterm", "--version"]);
        assert!(args.version);
        assert!(args.command.is_none());
    }
}
