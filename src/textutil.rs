//! UTF-8-safe truncation and terminal-text cleanup helpers.
//!
//! Output and scrollback reach the model as plain text, so both need cutting
//! to a byte budget without splitting a code point, and scrollback needs
//! escape sequences removed.

/// Return a UTF-8-safe prefix whose byte length is at most `max_bytes`.
pub fn safe_prefix_by_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Truncate by bytes and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_bytes(text: &str, max_bytes: usize, suffix: &str) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let prefix = safe_prefix_by_bytes(text, max_bytes);
    format!("{prefix}{suffix}")
}

/// Keep at most the last `max_lines` lines of `text`.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Remove terminal control sequences from captured scrollback.
///
/// CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL|ST`) and two-byte escapes
/// are dropped. Backspace erases the previous character. Other control
/// characters except newline and tab are removed.
pub fn strip_terminal_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.next() {
                Some('[') => {
                    // Parameters and intermediates, then one final byte in @..~.
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    while let Some(next) = chars.next() {
                        if next == '\u{7}' {
                            break;
                        }
                        if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\u{8}' => {
                out.pop();
            }
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_prefix_by_bytes_keeps_full_ascii_when_short() {
        assert_eq!(safe_prefix_by_bytes("hello", 10), "hello");
    }

    #[test]
    fn safe_prefix_by_bytes_avoids_mid_codepoint_cut() {
        let s = "a\u{e9}\u{1F642}";
        assert_eq!(safe_prefix_by_bytes(s, 2), "a");
        assert_eq!(safe_prefix_by_bytes(s, 3), "a\u{e9}");
    }

    #[test]
    fn truncate_with_suffix_by_bytes_handles_unicode() {
        let s = "\u{1F642}\u{1F642}\u{1F642}";
        let out = truncate_with_suffix_by_bytes(s, 5, "...[truncated]");
        assert_eq!(out, "\u{1F642}...[truncated]");
    }

    #[test]
    fn tail_lines_keeps_most_recent() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail_lines("a\nb", 10), "a\nb");
        assert_eq!(tail_lines("", 3), "");
    }

    #[test]
    fn strip_terminal_controls_removes_colors_and_titles() {
        let raw = "\u{1b}]0;user@host: ~\u{7}\u{1b}[1;32m$\u{1b}[0m ls\r\nfile.txt\n";
        assert_eq!(strip_terminal_controls(raw), "$ ls\nfile.txt\n");
    }

    #[test]
    fn strip_terminal_controls_applies_backspace() {
        assert_eq!(strip_terminal_controls("lss\u{8} -la"), "ls -la");
    }

    #[test]
    fn strip_terminal_controls_handles_st_terminated_osc() {
        let raw = "\u{1b}]8;;http://x\u{1b}\\link\u{1b}]8;;\u{1b}\\ done";
        assert_eq!(strip_terminal_controls(raw), "link done");
    }
}
