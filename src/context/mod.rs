//! Terminal context capture.
//!
//! A snapshot comes from tmux scrollback when available (deep: commands and
//! their output), otherwise from the shell's history file (shallow: commands
//! only). The line that launched this very process, and everything after
//! it, is removed before the snapshot is returned. Capture never fails: with
//! no usable source the result is an empty shallow snapshot.

mod history;
mod invocation;
mod tmux;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;
use tracing::{debug, info};

use crate::error::CaptureError;

pub use history::{history_candidates, parse_history, HistoryFile, HistoryFormat, HistorySource};
pub use invocation::InvocationPattern;
pub use tmux::TmuxSource;

/// History entries kept for a shallow snapshot unless configured otherwise.
pub const DEFAULT_MAX_COMMANDS: usize = 50;

/// How much a snapshot can tell the model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDepth {
    /// Scrollback: commands and their output.
    Deep,
    /// History file: commands only.
    Shallow,
}

impl fmt::Display for ContextDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deep => write!(f, "deep"),
            Self::Shallow => write!(f, "shallow"),
        }
    }
}

/// Recent terminal activity, already stripped of the current invocation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TerminalSnapshot {
    pub text: String,
    pub depth: ContextDepth,
    #[serde(with = "http_date")]
    pub captured_at: SystemTime,
}

impl TerminalSnapshot {
    /// Snapshot used when no context source produced anything.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            depth: ContextDepth::Shallow,
            captured_at: SystemTime::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Render the snapshot as the text block handed to the model client.
    pub fn to_model_text(&self) -> String {
        let captured = httpdate::fmt_http_date(self.captured_at);
        if self.is_empty() {
            return format!("No terminal context available (captured {captured}).\n");
        }
        let header = match self.depth {
            ContextDepth::Deep => "Terminal scrollback (deep context: commands and their output)",
            ContextDepth::Shallow => "Shell history (shallow context: commands only, no output)",
        };
        let mut out = format!("{header}, captured {captured}:\n{}", self.text);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

mod http_date {
    use serde::Serializer;
    use std::time::SystemTime;

    pub(super) fn serialize<S: Serializer>(time: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&httpdate::fmt_http_date(*time))
    }
}

/// Parameters for one capture.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureRequest {
    /// Scrollback lines requested from the multiplexer.
    pub max_lines: usize,
    /// History entries kept for a shallow snapshot.
    pub max_commands: usize,
    /// Argument vector of the invoking process, program first.
    pub invoking_argv: Vec<String>,
    /// Normalized shell name (`zsh`, `pwsh`, ...) selecting the history
    /// format. Resolved from the environment when absent.
    pub shell_name: Option<String>,
}

impl CaptureRequest {
    pub fn new<S: Into<String>>(max_lines: usize, invoking_argv: impl IntoIterator<Item = S>) -> Self {
        Self {
            max_lines: max_lines.max(1),
            max_commands: DEFAULT_MAX_COMMANDS,
            invoking_argv: invoking_argv.into_iter().map(Into::into).collect(),
            shell_name: None,
        }
    }

    pub fn with_max_commands(mut self, max_commands: usize) -> Self {
        self.max_commands = max_commands.max(1);
        self
    }

    pub fn with_shell_name(mut self, shell_name: impl Into<String>) -> Self {
        self.shell_name = Some(shell_name.into());
        self
    }
}

/// Unfiltered material produced by a source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawContext {
    Scrollback(String),
    /// Commands, oldest first.
    History(Vec<String>),
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// One place terminal context can come from.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    fn depth(&self) -> ContextDepth;

    /// Fetch raw context. `Err` means "try the next source".
    async fn acquire(&self, request: &CaptureRequest) -> Result<RawContext, CaptureError>;
}

/// Capture with default history size and the shell resolved from the
/// environment.
pub async fn capture(max_lines: usize, invoking_argv: &[String]) -> TerminalSnapshot {
    capture_with(&CaptureRequest::new(max_lines, invoking_argv.iter().cloned())).await
}

/// Capture using tmux when inside a session, then shell history.
pub async fn capture_with(request: &CaptureRequest) -> TerminalSnapshot {
    let shell_name = match &request.shell_name {
        Some(name) => name.clone(),
        None => crate::shell::resolve().shell_name().to_string(),
    };
    let mut sources: Vec<Box<dyn ContextSource>> = Vec::new();
    if let Some(tmux) = TmuxSource::detect().await {
        sources.push(Box::new(tmux));
    }
    sources.push(Box::new(HistorySource::for_shell(&shell_name)));
    capture_from(&sources, request).await
}

/// Try `sources` in order; the first that yields non-empty text after
/// self-invocation filtering wins.
pub async fn capture_from(sources: &[Box<dyn ContextSource>], request: &CaptureRequest) -> TerminalSnapshot {
    let pattern = InvocationPattern::from_argv(request.invoking_argv.as_slice());
    match &pattern {
        Some(pattern) => debug!(invocation = pattern.as_str(), "excluding invocation from context"),
        None => debug!("no invocation arguments to exclude from context"),
    }

    for source in sources {
        let raw = match source.acquire(request).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!(source = source.name(), error = %err, "context source unavailable");
                continue;
            }
        };
        let text = match raw {
            RawContext::Scrollback(text) => filter_scrollback(&text, pattern.as_ref()),
            RawContext::History(commands) => {
                render_history(&filter_history(commands, pattern.as_ref()))
            }
        };
        if text.trim().is_empty() {
            debug!(source = source.name(), "context source produced no usable text");
            continue;
        }
        info!(source = source.name(), depth = %source.depth(), chars = text.len(), "captured terminal context");
        return TerminalSnapshot {
            text,
            depth: source.depth(),
            captured_at: SystemTime::now(),
        };
    }

    info!("no terminal context available");
    TerminalSnapshot::empty()
}

/// Cut scrollback at the last line echoing the invocation.
pub(crate) fn filter_scrollback(text: &str, pattern: Option<&InvocationPattern>) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(pattern) = pattern else {
        return lines.join("\n");
    };
    match lines.iter().rposition(|line| pattern.matches(line)) {
        Some(index) => {
            info!(
                line = index,
                removed = lines.len() - index,
                "removed invocation and following lines from scrollback"
            );
            lines[..index].join("\n")
        }
        None => {
            debug!("invocation not found in scrollback");
            lines.join("\n")
        }
    }
}

/// Entries from the end of history searched for the invocation. Shells
/// sharing one history file (zsh `SHARE_HISTORY`) can append other
/// terminals' commands after it.
const HISTORY_INVOCATION_WINDOW: usize = 5;

/// Drop the invocation and anything recorded after it from recent history.
pub(crate) fn filter_history(mut commands: Vec<String>, pattern: Option<&InvocationPattern>) -> Vec<String> {
    let Some(pattern) = pattern else {
        return commands;
    };
    let window_start = commands.len().saturating_sub(HISTORY_INVOCATION_WINDOW);
    let found = commands[window_start..]
        .iter()
        .rposition(|command| pattern.matches(command))
        .map(|offset| window_start + offset);
    if let Some(index) = found {
        let removed = commands.len() - index;
        commands.truncate(index);
        info!(removed, remaining = commands.len(), "removed invocation from history");
    }
    commands
}

/// Numbered, chronological history block.
pub(crate) fn render_history(commands: &[String]) -> String {
    if commands.is_empty() {
        return String::new();
    }
    let mut out = String::from("Recent command history:\n");
    for (i, command) in commands.iter().enumerate() {
        out.push_str(&format!("{}. {command}\n", i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct FixedSource {
        depth: ContextDepth,
        result: Result<RawContext, &'static str>,
    }

    #[async_trait]
    impl ContextSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn depth(&self) -> ContextDepth {
            self.depth
        }

        async fn acquire(&self, _request: &CaptureRequest) -> Result<RawContext, CaptureError> {
            self.result
                .clone()
                .map_err(|msg| CaptureError::Unavailable(msg.to_string()))
        }
    }

    fn scrollback(text: &str) -> Box<dyn ContextSource> {
        Box::new(FixedSource {
            depth: ContextDepth::Deep,
            result: Ok(RawContext::Scrollback(text.to_string())),
        })
    }

    fn history(commands: &[&str]) -> Box<dyn ContextSource> {
        Box::new(FixedSource {
            depth: ContextDepth::Shallow,
            result: Ok(RawContext::History(
                commands.iter().map(|c| c.to_string()).collect(),
            )),
        })
    }

    fn unavailable(depth: ContextDepth) -> Box<dyn ContextSource> {
        Box::new(FixedSource {
            depth,
            result: Err("nope"),
        })
    }

    fn request(argv: &[&str]) -> CaptureRequest {
        CaptureRequest::new(500, argv.iter().copied())
    }

    #[tokio::test]
    async fn deep_source_wins_and_invocation_is_cut() {
        let sources = vec![
            scrollback("$ ls\na.txt\n$ tool find-files\n[INFO] thinking\n"),
            history(&["ls"]),
        ];
        let snapshot = capture_from(&sources, &request(&["tool", "find-files"])).await;
        assert_eq!(snapshot.depth, ContextDepth::Deep);
        assert_eq!(snapshot.text, "$ ls\na.txt");
    }

    #[tokio::test]
    async fn last_occurrence_is_the_one_removed() {
        let sources = vec![scrollback(
            "$ tool find-files\nold answer\n$ pwd\n/home\n$ tool find-files\n",
        )];
        let snapshot = capture_from(&sources, &request(&["tool", "find-files"])).await;
        assert_eq!(snapshot.text, "$ tool find-files\nold answer\n$ pwd\n/home");
    }

    #[tokio::test]
    async fn empty_scrollback_after_filtering_falls_back_to_history() {
        let sources = vec![
            scrollback("$ tool find-files\n"),
            history(&["git status", "tool find-files"]),
        ];
        let snapshot = capture_from(&sources, &request(&["tool", "find-files"])).await;
        assert_eq!(snapshot.depth, ContextDepth::Shallow);
        assert_eq!(snapshot.text, "Recent command history:\n1. git status\n");
    }

    #[tokio::test]
    async fn unavailable_sources_yield_empty_shallow_snapshot() {
        let sources = vec![
            unavailable(ContextDepth::Deep),
            unavailable(ContextDepth::Shallow),
        ];
        let snapshot = capture_from(&sources, &request(&["tool", "x"])).await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.depth, ContextDepth::Shallow);
    }

    #[test]
    fn history_keeps_non_matching_last_entry() {
        let pattern = InvocationPattern::from_argv(&["tool", "find-files"]);
        let kept = filter_history(vec!["ls".into(), "make".into()], pattern.as_ref());
        assert_eq!(kept, vec!["ls", "make"]);
    }

    #[test]
    fn history_invocation_followed_by_shared_entries_is_cut() {
        let pattern = InvocationPattern::from_argv(&["tool", "find-files"]);
        let commands = ["ls", "tool find-files", "git pull", "make"]
            .map(String::from)
            .to_vec();
        assert_eq!(filter_history(commands, pattern.as_ref()), vec!["ls"]);
    }

    #[test]
    fn history_invocation_outside_recent_window_is_kept() {
        let pattern = InvocationPattern::from_argv(&["tool", "find-files"]);
        let mut commands = vec!["tool find-files".to_string()];
        commands.extend((0..HISTORY_INVOCATION_WINDOW).map(|i| format!("echo {i}")));
        let kept = filter_history(commands.clone(), pattern.as_ref());
        assert_eq!(kept, commands);
    }

    #[test]
    fn render_history_numbers_chronologically() {
        let text = render_history(&["a".into(), "b".into()]);
        assert_eq!(text, "Recent command history:\n1. a\n2. b\n");
        assert_eq!(render_history(&[]), "");
    }

    #[test]
    fn model_text_states_depth() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let deep = TerminalSnapshot {
            text: "$ ls".into(),
            depth: ContextDepth::Deep,
            captured_at: at,
        };
        assert_eq!(
            deep.to_model_text(),
            "Terminal scrollback (deep context: commands and their output), captured Tue, 14 Nov 2023 22:13:20 GMT:\n$ ls\n"
        );

        let shallow = TerminalSnapshot {
            text: "Recent command history:\n1. ls\n".into(),
            depth: ContextDepth::Shallow,
            captured_at: at,
        };
        assert!(shallow.to_model_text().starts_with("Shell history (shallow context"));

        let empty = TerminalSnapshot {
            captured_at: at,
            ..TerminalSnapshot::empty()
        };
        assert!(empty.to_model_text().starts_with("No terminal context available"));
    }

    #[test]
    fn snapshot_serializes_with_http_date() {
        let snapshot = TerminalSnapshot {
            text: "x".into(),
            depth: ContextDepth::Deep,
            captured_at: SystemTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&snapshot).expect("json");
        assert_eq!(json["depth"], "deep");
        assert_eq!(json["captured_at"], "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
