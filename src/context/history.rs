//! Shell history files as a shallow context source.
//!
//! Entries are returned oldest first. Each parser works record by record:
//! a malformed record (bad extended header, no decodable text) is skipped
//! and logged, never fatal for the rest of the file. Stray invalid UTF-8
//! bytes are dropped from an otherwise readable line.

use async_trait::async_trait;
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{CaptureRequest, ContextDepth, ContextSource, RawContext};
use crate::error::CaptureError;

/// On-disk history layouts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HistoryFormat {
    /// `: <epoch>:<duration>;<command>` records, or plain lines when
    /// extended history is off. Embedded newlines are stored as `\` + newline.
    Zsh,
    /// One command per line with optional `#<epoch>` comments.
    Bash,
    /// YAML-ish `- cmd: <command>` records.
    Fish,
    /// PSReadLine `ConsoleHost_history.txt`; backtick continues a line.
    PsReadLine,
}

/// A history file candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HistoryFile {
    pub path: PathBuf,
    pub format: HistoryFormat,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>, format: HistoryFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

/// Reads the first usable history file out of an ordered candidate list.
#[derive(Clone, Debug)]
pub struct HistorySource {
    candidates: Vec<HistoryFile>,
}

impl HistorySource {
    /// Candidates for `shell_name`, located through the process environment.
    pub fn for_shell(shell_name: &str) -> Self {
        Self::for_shell_with(shell_name, &|name| std::env::var(name).ok(), dirs::home_dir())
    }

    pub fn for_shell_with<F>(shell_name: &str, env_lookup: &F, home: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            candidates: history_candidates(shell_name, env_lookup, home.as_deref()),
        }
    }

    pub fn from_files(candidates: Vec<HistoryFile>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[HistoryFile] {
        &self.candidates
    }
}

#[async_trait]
impl ContextSource for HistorySource {
    fn name(&self) -> &'static str {
        "history"
    }

    fn depth(&self) -> ContextDepth {
        ContextDepth::Shallow
    }

    async fn acquire(&self, request: &CaptureRequest) -> Result<RawContext, CaptureError> {
        for candidate in &self.candidates {
            let bytes = match tokio::fs::read(&candidate.path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(path = %candidate.path.display(), "history file not found");
                    continue;
                }
                Err(err) => {
                    debug!(path = %candidate.path.display(), error = %err, "history file unreadable");
                    continue;
                }
            };
            let mut commands = parse_history(&bytes, candidate.format);
            if commands.is_empty() {
                debug!(path = %candidate.path.display(), "history file has no commands");
                continue;
            }
            let keep_from = commands.len().saturating_sub(request.max_commands);
            commands.drain(..keep_from);
            info!(
                path = %candidate.path.display(),
                format = ?candidate.format,
                commands = commands.len(),
                "read shell history"
            );
            return Ok(RawContext::History(commands));
        }
        Err(CaptureError::Unavailable("no readable shell history".into()))
    }
}

/// Ordered history file candidates for a normalized shell name.
///
/// Unknown shells fall back to the zsh file, then the bash file.
pub fn history_candidates<F>(shell_name: &str, env_lookup: &F, home: Option<&Path>) -> Vec<HistoryFile>
where
    F: Fn(&str) -> Option<String>,
{
    let histfile = env_lookup("HISTFILE")
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    let home_file = |relative: &str| home.map(|home| home.join(relative));

    let mut out = Vec::new();
    match shell_name {
        "zsh" => {
            out.extend(histfile.map(|path| HistoryFile::new(path, HistoryFormat::Zsh)));
            out.extend(home_file(".zsh_history").map(|p| HistoryFile::new(p, HistoryFormat::Zsh)));
        }
        "bash" => {
            out.extend(histfile.map(|path| HistoryFile::new(path, HistoryFormat::Bash)));
            out.extend(home_file(".bash_history").map(|p| HistoryFile::new(p, HistoryFormat::Bash)));
        }
        "fish" => {
            let data_dir = env_lookup("XDG_DATA_HOME")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .or_else(|| home_file(".local/share"));
            out.extend(
                data_dir.map(|dir| HistoryFile::new(dir.join("fish/fish_history"), HistoryFormat::Fish)),
            );
        }
        "pwsh" | "powershell" => {
            out.extend(psreadline_candidates(env_lookup, home));
        }
        _ => {
            out.extend(home_file(".zsh_history").map(|p| HistoryFile::new(p, HistoryFormat::Zsh)));
            out.extend(home_file(".bash_history").map(|p| HistoryFile::new(p, HistoryFormat::Bash)));
        }
    }
    out
}

/// PSReadLine keeps one file per host; Windows PowerShell and PowerShell 7
/// use different directories under `%APPDATA%`, and PowerShell 7 on unix
/// follows XDG.
fn psreadline_candidates<F>(env_lookup: &F, home: Option<&Path>) -> Vec<HistoryFile>
where
    F: Fn(&str) -> Option<String>,
{
    const FILE: &str = "ConsoleHost_history.txt";
    let mut out = Vec::new();
    if let Some(appdata) = env_lookup("APPDATA").filter(|value| !value.trim().is_empty()) {
        let appdata = PathBuf::from(appdata);
        out.push(HistoryFile::new(
            appdata
                .join("Microsoft")
                .join("Windows")
                .join("PowerShell")
                .join("PSReadLine")
                .join(FILE),
            HistoryFormat::PsReadLine,
        ));
        out.push(HistoryFile::new(
            appdata
                .join("Microsoft")
                .join("PowerShell")
                .join("PSReadLine")
                .join(FILE),
            HistoryFormat::PsReadLine,
        ));
    }
    if let Some(home) = home {
        out.push(HistoryFile::new(
            home.join(".local/share/powershell/PSReadLine").join(FILE),
            HistoryFormat::PsReadLine,
        ));
    }
    out
}

/// Parse raw history bytes into commands, oldest first.
pub fn parse_history(bytes: &[u8], format: HistoryFormat) -> Vec<String> {
    let bytes = match format {
        HistoryFormat::Zsh => unmetafy_zsh(bytes),
        _ => Cow::Borrowed(bytes),
    };
    let decoded = decoded_lines(&bytes);
    let lines: Vec<Option<&str>> = decoded.iter().map(|line| line.as_deref()).collect();
    match format {
        HistoryFormat::Zsh => parse_zsh(&lines),
        HistoryFormat::Bash => parse_bash(&lines),
        HistoryFormat::Fish => parse_fish(&lines),
        HistoryFormat::PsReadLine => parse_psreadline(&lines),
    }
}

/// zsh marks bytes it treats specially.
const ZSH_META: u8 = 0x83;

/// Undo zsh's "metafied" storage: `0x83 b` stands for `b ^ 0x20`.
///
/// Multi-byte UTF-8 (emoji, most CJK) routinely contains bytes in the
/// escaped range, so these lines are not valid UTF-8 until restored.
fn unmetafy_zsh(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.contains(&ZSH_META) {
        return Cow::Borrowed(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(byte) = iter.next() {
        if byte == ZSH_META {
            match iter.next() {
                Some(escaped) => out.push(escaped ^ 0x20),
                None => break,
            }
        } else {
            out.push(byte);
        }
    }
    Cow::Owned(out)
}

/// Split into lines, dropping invalid UTF-8 sequences.
///
/// A line with no decodable text at all becomes `None` so continuation
/// logic does not glue unrelated records together across it.
fn decoded_lines(bytes: &[u8]) -> Vec<Option<Cow<'_, str>>> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(index, raw)| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if let Ok(line) = std::str::from_utf8(raw) {
                return Some(Cow::Borrowed(line));
            }
            let mut kept = String::with_capacity(raw.len());
            for chunk in raw.utf8_chunks() {
                kept.push_str(chunk.valid());
            }
            if kept.trim().is_empty() {
                debug!(line = index + 1, "skipping undecodable history line");
                None
            } else {
                debug!(line = index + 1, "dropped invalid UTF-8 bytes from history line");
                Some(Cow::Owned(kept))
            }
        })
        .collect()
}

/// Collects records that may continue over several physical lines.
struct Continued {
    commands: Vec<String>,
    pending: Option<String>,
}

impl Continued {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
            pending: None,
        }
    }

    /// Feed one logical fragment. `continues` means the record goes on.
    fn push(&mut self, fragment: &str, continues: bool) {
        let text = match self.pending.take() {
            Some(mut prior) => {
                prior.push('\n');
                prior.push_str(fragment);
                prior
            }
            None => fragment.to_string(),
        };
        if continues {
            self.pending = Some(text);
        } else {
            self.finish_record(text);
        }
    }

    /// A malformed line ends any pending record.
    fn break_record(&mut self) {
        if let Some(text) = self.pending.take() {
            self.finish_record(text);
        }
    }

    fn is_continuing(&self) -> bool {
        self.pending.is_some()
    }

    fn finish_record(&mut self, text: String) {
        if !text.trim().is_empty() {
            self.commands.push(text);
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.break_record();
        self.commands
    }
}

fn parse_zsh(lines: &[Option<&str>]) -> Vec<String> {
    let mut records = Continued::new();
    for (index, line) in lines.iter().enumerate() {
        let Some(line) = line else {
            records.break_record();
            continue;
        };
        let body = if records.is_continuing() {
            *line
        } else if let Some(header) = line.strip_prefix(": ") {
            match parse_zsh_extended(header) {
                Some(command) => command,
                None => {
                    debug!(line = index + 1, "skipping malformed zsh history record");
                    continue;
                }
            }
        } else {
            *line
        };
        match body.strip_suffix('\\') {
            Some(head) => records.push(head, true),
            None => records.push(body, false),
        }
    }
    records.finish()
}

/// `<epoch>:<duration>;<command>` after the leading `: `.
fn parse_zsh_extended(header: &str) -> Option<&str> {
    let (meta, command) = header.split_once(';')?;
    let (epoch, duration) = meta.split_once(':')?;
    let numeric = |s: &str| !s.trim().is_empty() && s.trim().chars().all(|c| c.is_ascii_digit());
    (numeric(epoch) && numeric(duration)).then_some(command)
}

fn parse_bash(lines: &[Option<&str>]) -> Vec<String> {
    lines
        .iter()
        .flatten()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_bash_timestamp(line))
        .map(|line| line.to_string())
        .collect()
}

fn is_bash_timestamp(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn parse_fish(lines: &[Option<&str>]) -> Vec<String> {
    let mut commands = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let Some(line) = line else {
            continue;
        };
        if let Some(command) = line.strip_prefix("- cmd: ") {
            commands.push(unescape_fish(command));
        } else if line.starts_with("- ") {
            debug!(line = index + 1, "skipping malformed fish history record");
        }
    }
    commands
        .into_iter()
        .filter(|command| !command.trim().is_empty())
        .collect()
}

/// Fish stores newlines as `\n` and backslashes as `\\`.
fn unescape_fish(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_psreadline(lines: &[Option<&str>]) -> Vec<String> {
    let mut records = Continued::new();
    for line in lines {
        let Some(line) = line else {
            records.break_record();
            continue;
        };
        match line.strip_suffix('`') {
            Some(head) => records.push(head, true),
            None => records.push(line, false),
        }
    }
    records
        .finish()
        .into_iter()
        .map(|command| collapse_doubled_backslashes(&command))
        .collect()
}

/// `C:\\Temp` (and longer runs) become `C:\Temp`.
fn collapse_doubled_backslashes(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut previous_backslash = false;
    for c in command.chars() {
        if c == '\\' && previous_backslash {
            continue;
        }
        previous_backslash = c == '\\';
        out.push(c);
    }
    out
}
