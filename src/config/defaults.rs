//! Default configuration values.

/// Per-command timeout.
pub(super) const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Bytes of each output stream kept in rendered result blocks.
pub(super) const DEFAULT_MAX_OUTPUT_BYTES: usize = 16_000;
/// Scrollback depth requested from tmux.
pub(super) const DEFAULT_CONTEXT_LINES: usize = 500;
/// History entries kept for a shallow snapshot.
pub(super) const DEFAULT_HISTORY_COMMANDS: usize = crate::context::DEFAULT_MAX_COMMANDS;
pub(super) const DEFAULT_LOG_LEVEL: &str = "warn";

/// Local config file name, looked up in the working directory.
pub(super) const LOCAL_CONFIG_FILE: &str = "askterm.toml";
/// Directory under the platform config root holding the global file.
pub(super) const GLOBAL_CONFIG_DIR: &str = "askterm";
