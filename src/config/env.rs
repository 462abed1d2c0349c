//! Environment overrides applied after the config file.

use std::str::FromStr;

use crate::error::ConfigError;

use super::Config;

pub(super) const ENV_TIMEOUT_SECS: &str = "ASKTERM_TIMEOUT_SECS";
pub(super) const ENV_CONTEXT_LINES: &str = "ASKTERM_CONTEXT_LINES";
pub(super) const ENV_HISTORY_COMMANDS: &str = "ASKTERM_HISTORY_COMMANDS";
pub(super) const ENV_SHELL: &str = "ASKTERM_SHELL";

pub(super) fn apply_env_overrides<FEnv>(config: &mut Config, env_lookup: &FEnv) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(secs) = parse_env::<u64, _>(env_lookup, ENV_TIMEOUT_SECS)? {
        config.execution.timeout_secs = secs;
    }
    if let Some(lines) = parse_env::<usize, _>(env_lookup, ENV_CONTEXT_LINES)? {
        config.context.max_lines = lines;
    }
    if let Some(commands) = parse_env::<usize, _>(env_lookup, ENV_HISTORY_COMMANDS)? {
        config.context.max_commands = commands;
    }
    if let Some(shell) = env_lookup(ENV_SHELL).filter(|value| !value.trim().is_empty()) {
        config.shell.shell_override = Some(shell.trim().to_string());
    }
    Ok(())
}

/// Parse a positive integer variable; unset or blank means "no override".
fn parse_env<T, FEnv>(env_lookup: &FEnv, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    FEnv: Fn(&str) -> Option<String>,
{
    let Some(raw) = env_lookup(name).filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim().parse::<T>().map(Some).map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected a positive integer"
        ))
    })
}
