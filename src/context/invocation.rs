//! Recognizing this program's own invocation inside captured context.
//!
//! The shell echoes the command line differently from how the argument
//! vector arrives (quotes removed, whitespace collapsed, prompt prefixed), so
//! both sides are normalized before comparison. Log output that merely
//! mentions the same tokens is never treated as a match.

use std::path::Path;

const LOG_LEVELS: &[&str] = &[
    "TRACE", "DEBUG", "INFO", "WARN", "WARNING", "ERROR", "CRITICAL",
];

/// Normalized form of the invoking command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvocationPattern {
    normalized: String,
}

impl InvocationPattern {
    /// Build the pattern from a process argument vector.
    ///
    /// The program is reduced to its file stem (`/usr/local/bin/tool.exe`
    /// becomes `tool`). Returns `None` when there are no arguments after the
    /// program, since a bare program name is too ambiguous to filter on.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if args.is_empty() {
            return None;
        }
        let program = program.as_ref();
        let name = program
            .rsplit(['/', '\\'])
            .next()
            .map(|base| {
                Path::new(base)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(base)
            })
            .unwrap_or(program);
        let mut line = name.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg.as_ref());
        }
        let normalized = normalize(&line);
        (!normalized.is_empty()).then_some(Self { normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Whether `line` looks like the echoed invocation.
    pub fn matches(&self, line: &str) -> bool {
        if is_log_line(line) {
            return false;
        }
        let candidate = normalize(line);
        let needle = self.normalized.as_str();
        if candidate == needle {
            return true;
        }

        let mut from = 0;
        while let Some(offset) = candidate[from..].find(needle) {
            let start = from + offset;
            let end = start + needle.len();
            let before = &candidate[..start];
            let after = &candidate[end..];
            let ends_cleanly = after.is_empty() || after.starts_with(' ');
            if ends_cleanly && starts_cleanly(before) {
                return true;
            }
            // Step past the first char of this occurrence.
            from = start + candidate[start..].chars().next().map_or(1, char::len_utf8);
        }
        false
    }
}

/// Whether the text preceding a needle occurrence leaves it as the command.
fn starts_cleanly(before: &str) -> bool {
    if before.is_empty() || before.ends_with(' ') || before.chars().all(is_prompt_char) {
        return true;
    }
    // Launched by path (`./target/debug/tool`, `.\bin\tool`): the directory
    // part must be the first word after the prompt.
    if !before.ends_with(['/', '\\']) {
        return false;
    }
    match before.rfind(' ') {
        None => true,
        Some(space) => {
            let prompt = before[..space].trim_end();
            prompt.is_empty() || prompt.ends_with(['$', '#', '%', '>', '❯'])
        }
    }
}

/// Collapse whitespace runs and strip paired quotes around words.
fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_paired_quotes(&strip_paired_quotes(&collapsed, '"'), '\'')
}

/// Remove `quote ... quote` pairs with non-empty content, keeping the content.
///
/// An unmatched quote (as in `don't`) is left alone.
fn strip_paired_quotes(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(quote) {
        let after_open = &rest[open + quote.len_utf8()..];
        match after_open.find(quote) {
            Some(close) if close > 0 => {
                out.push_str(&rest[..open]);
                out.push_str(&after_open[..close]);
                rest = &after_open[close + quote.len_utf8()..];
            }
            _ => {
                out.push_str(&rest[..open + quote.len_utf8()]);
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_prompt_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '$' | ':' | '/' | '-' | '.' | '~' | '#' | '%' | '>')
}

/// Detect structured log lines (`[INFO] ...`, `WARN ...`, or
/// `2026-01-02T03:04:05Z  DEBUG ...`).
pub(crate) fn is_log_line(line: &str) -> bool {
    let mut rest = line.trim_start();
    // Date and time may be one token or two.
    for _ in 0..2 {
        match rest.split_whitespace().next() {
            Some(first) if looks_like_timestamp(first) => {
                rest = rest[first.len()..].trim_start();
            }
            _ => break,
        }
    }
    let token = match rest.strip_prefix('[') {
        Some(inner) => match inner.find(']') {
            Some(close) => &inner[..close],
            None => return false,
        },
        None => rest
            .split(|c: char| c.is_whitespace() || c == ':')
            .next()
            .unwrap_or(""),
    };
    LOG_LEVELS.contains(&token)
}

fn looks_like_timestamp(token: &str) -> bool {
    token.len() >= 8
        && token.starts_with(|c: char| c.is_ascii_digit())
        && (token.contains('-') || token.contains(':'))
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | 'Z' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(argv: &[&str]) -> InvocationPattern {
        InvocationPattern::from_argv(argv).expect("pattern")
    }

    #[test]
    fn argv_program_is_reduced_to_stem() {
        assert_eq!(
            pattern(&["/usr/local/bin/tool", "find-files"]).as_str(),
            "tool find-files"
        );
        assert_eq!(
            pattern(&[r"C:\tools\tool.exe", "find-files"]).as_str(),
            "tool find-files"
        );
    }

    #[test]
    fn bare_program_yields_no_pattern() {
        assert!(InvocationPattern::from_argv(&["tool"]).is_none());
        assert!(InvocationPattern::from_argv::<&str>(&[]).is_none());
    }

    #[test]
    fn prompt_prefixed_line_matches() {
        let p = pattern(&["tool", "find-files"]);
        assert!(p.matches("$ tool find-files"));
        assert!(p.matches("user@host:~/src$ tool find-files"));
        assert!(p.matches("PS C:\\work> tool  find-files"));
        assert!(p.matches("tool find-files"));
    }

    #[test]
    fn path_launched_invocation_matches() {
        let relative = pattern(&["./target/debug/tool", "find-files"]);
        assert!(relative.matches("$ ./target/debug/tool find-files"));
        let absolute = pattern(&["/usr/local/bin/tool", "find-files"]);
        assert!(absolute.matches("user@h:~$ /usr/local/bin/tool find-files"));
        assert!(absolute.matches("/usr/local/bin/tool find-files"));
        let windows = pattern(&[r".\bin\tool", "find-files"]);
        assert!(windows.matches(r"PS C:\work> .\bin\tool find-files"));
    }

    #[test]
    fn path_argument_to_another_command_does_not_match() {
        let p = pattern(&["tool", "find-files"]);
        assert!(!p.matches("$ cat ~/notes/tool find-files"));
        assert!(!p.matches("$ ls /opt/mytool find-files"));
    }

    #[test]
    fn quoting_differences_are_ignored() {
        let p = pattern(&["tool", "why is this slow", "-v"]);
        assert!(p.matches("$ tool \"why is this slow\" -v"));
        assert!(p.matches("$ tool 'why is this slow' -v"));
    }

    #[test]
    fn substrings_of_other_words_do_not_match() {
        let p = pattern(&["tool", "find"]);
        assert!(!p.matches("$ tooling find"));
        assert!(!p.matches("$ tool finder"));
        assert!(!p.matches("$ mytool find"));
    }

    #[test]
    fn log_lines_never_match() {
        let p = pattern(&["tool", "find-files"]);
        assert!(!p.matches("[INFO] will exclude tool find-files from context"));
        assert!(!p.matches("DEBUG capture: tool find-files"));
        assert!(!p.matches(
            "2026-10-18T09:12:44.120Z  INFO askterm::context: invocation=tool find-files"
        ));
    }

    #[test]
    fn is_log_line_recognizes_level_markers() {
        assert!(is_log_line("  [WARN] something"));
        assert!(is_log_line("ERROR: boom"));
        assert!(is_log_line("2026-10-18 12:00:00 WARNING disk"));
        assert!(!is_log_line("$ echo INFO"));
        assert!(!is_log_line("INFORMATION only"));
    }

    #[test]
    fn unmatched_quote_is_preserved() {
        assert_eq!(normalize("don't  stop"), "don't stop");
        assert_eq!(normalize("say \"hi there\" 'x'"), "say hi there x");
    }
}
