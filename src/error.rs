//! Error types for configuration, context capture and approval prompts.
//!
//! Command execution itself never returns an error: spawn failures and
//! timeouts are reported through `ExecutionStatus` so one bad command cannot
//! take down the session.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Failures from an individual context source.
///
/// These never escape `context::capture`; they decide whether the next
/// source is tried and are logged.
#[derive(Debug)]
pub enum CaptureError {
    /// The source does not apply here (no tmux session, no history file).
    Unavailable(String),
    /// Reading a history file failed.
    Io(std::io::Error),
    /// An external probe (tmux, wsl) failed or timed out.
    Probe(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "unavailable: {msg}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Probe(msg) => write!(f, "probe failed: {msg}"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// ApprovalError
// ---------------------------------------------------------------------------

/// Errors from the interactive approval prompt.
#[derive(Debug)]
pub enum ApprovalError {
    Io(std::io::Error),
    /// Stdin reached EOF before a decision was entered.
    Closed,
}

impl fmt::Display for ApprovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Closed => write!(f, "input closed before a decision was made"),
        }
    }
}

impl std::error::Error for ApprovalError {}

impl From<std::io::Error> for ApprovalError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
