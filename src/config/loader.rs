//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

use super::env::apply_env_overrides;
use super::sources::{config_root_dir, read_config_text_with_sources};
use super::{Config, LoadedConfig};

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from `--config`).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_source(path_override)?.config)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

pub(super) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&config_text)?;
    apply_env_overrides(&mut config, &env_lookup)?;
    clamp_limits(&mut config);
    debug!(%source, "loaded configuration");
    Ok(LoadedConfig { config, source })
}

/// Zero limits would disable timeouts or capture entirely.
fn clamp_limits(config: &mut Config) {
    config.execution.timeout_secs = config.execution.timeout_secs.max(1);
    config.context.max_lines = config.context.max_lines.max(1);
    config.context.max_commands = config.context.max_commands.max(1);
    if config
        .shell
        .shell_override
        .as_deref()
        .is_some_and(|value| value.trim().is_empty())
    {
        config.shell.shell_override = None;
    }
}
