//! Configuration data model.
//!
//! Every section is `#[serde(default)]`, so any subset of keys (or an empty
//! file) deserializes into a complete [`Config`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::{
    DEFAULT_CONTEXT_LINES, DEFAULT_HISTORY_COMMANDS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_TIMEOUT_SECS,
};
use super::sources::ConfigSource;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub context: ContextConfig,
    pub shell: ShellConfig,
    pub logging: LoggingConfig,
}

/// `[execution]`: per-command limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-command timeout in seconds; clamped to at least 1.
    pub timeout_secs: u64,
    /// Bytes of stdout/stderr kept in rendered result blocks.
    pub max_output_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// `[context]`: how much terminal context to capture.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Scrollback lines requested from tmux.
    pub max_lines: usize,
    /// History entries kept for shallow snapshots.
    pub max_commands: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_CONTEXT_LINES,
            max_commands: DEFAULT_HISTORY_COMMANDS,
        }
    }
}

/// `[shell]`: explicit shell selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell name or path that wins over `SHELL` (e.g. `pwsh`, `/bin/zsh`).
    #[serde(rename = "override")]
    pub shell_override: Option<String>,
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when neither `ASKTERM_LOG` nor `-v`
    /// is given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
}
