//! tmux scrollback as a deep context source.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::{CaptureRequest, ContextDepth, ContextSource, RawContext};
use crate::error::CaptureError;
use crate::shell::wsl_bridge_available;
use crate::textutil::{strip_terminal_controls, tail_lines};

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Captures the current pane's scrollback through `tmux capture-pane`.
#[derive(Clone, Debug, Default)]
pub struct TmuxSource {
    /// Run tmux through `wsl` (Windows host, tmux inside the subsystem).
    via_wsl: bool,
}

impl TmuxSource {
    /// Return a source when this process runs inside a tmux session.
    pub async fn detect() -> Option<Self> {
        Self::detect_with(&|name| std::env::var(name).ok()).await
    }

    pub async fn detect_with<F>(env_lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if env_lookup("TMUX").filter(|value| !value.is_empty()).is_none() {
            debug!("not inside a tmux session");
            return None;
        }
        Some(Self {
            via_wsl: wsl_bridge_available().await,
        })
    }
}

#[async_trait]
impl ContextSource for TmuxSource {
    fn name(&self) -> &'static str {
        "tmux"
    }

    fn depth(&self) -> ContextDepth {
        ContextDepth::Deep
    }

    async fn acquire(&self, request: &CaptureRequest) -> Result<RawContext, CaptureError> {
        let (program, args) = build_capture_command(request.max_lines, self.via_wsl);
        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = match timeout(CAPTURE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(CaptureError::Probe(format!("{program}: {err}"))),
            Err(_) => return Err(CaptureError::Probe("tmux capture-pane timed out".into())),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::Unavailable(format!(
                "tmux capture-pane failed: {}",
                stderr.trim()
            )));
        }
        let text = normalize_scrollback(&String::from_utf8_lossy(&output.stdout), request.max_lines);
        info!(
            via_wsl = self.via_wsl,
            chars = text.len(),
            "captured tmux scrollback"
        );
        Ok(RawContext::Scrollback(text))
    }
}

/// `tmux capture-pane` argv for a fixed scrollback depth.
///
/// `-S -N` asks for history lines, not the viewport, so the result does not
/// depend on the terminal's current size. `-J` joins wrapped lines.
pub(crate) fn build_capture_command(max_lines: usize, via_wsl: bool) -> (&'static str, Vec<String>) {
    let mut args: Vec<String> = ["capture-pane", "-p", "-J", "-S"]
        .into_iter()
        .map(str::to_string)
        .collect();
    args.push(format!("-{max_lines}"));
    if via_wsl {
        args.insert(0, "tmux".to_string());
        ("wsl", args)
    } else {
        ("tmux", args)
    }
}

/// Strip control sequences, drop trailing blank lines and cap the line count.
pub(crate) fn normalize_scrollback(raw: &str, max_lines: usize) -> String {
    let cleaned = strip_terminal_controls(raw);
    let lines: Vec<&str> = cleaned.lines().map(str::trim_end).collect();
    let used = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |last| last + 1);
    tail_lines(&lines[..used].join("\n"), max_lines)
}
