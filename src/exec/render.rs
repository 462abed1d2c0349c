//! Plain-text rendering of execution results and duration helpers.

use tokio::time::Duration;

use super::{ExecutionResult, ExecutionStatus};
use crate::textutil::truncate_with_suffix_by_bytes;

const TRUNCATION_SUFFIX: &str = "...[truncated]";
pub(crate) const EMPTY_SUCCESS_NOTE: &str = "(command succeeded with no output)";

impl ExecutionResult {
    /// Render the result as the text block handed to the model client.
    ///
    /// Each stream is cut to at most `max_bytes` (UTF-8 safe).
    pub fn to_model_text(&self, max_bytes: usize) -> String {
        let status = match self.status {
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::TimedOut => "timed out (partial output)",
            ExecutionStatus::SpawnError => "failed to start",
        };
        let mut out = format!(
            "status: {status}\nexit code: {}\nduration: {}\n",
            self.exit_code,
            format_duration(self.duration)
        );
        if self.succeeded() && !self.has_output() {
            out.push_str(EMPTY_SUCCESS_NOTE);
            out.push('\n');
            return out;
        }
        let stdout = truncate_with_suffix_by_bytes(&self.stdout, max_bytes, TRUNCATION_SUFFIX);
        let stderr = truncate_with_suffix_by_bytes(&self.stderr, max_bytes, TRUNCATION_SUFFIX);
        out.push_str(&format!("stdout:\n{stdout}"));
        if !stdout.is_empty() && !stdout.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("stderr:\n{stderr}"));
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            out.push('\n');
        }
        if self.truncated {
            out.push_str("note: output exceeded the capture limit and was cut\n");
        }
        out
    }
}

/// Human-oriented duration formatting used in logs and result blocks.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if secs == 0 {
        return format!("{millis}ms");
    }
    if millis == 0 {
        if secs % 3600 == 0 {
            return format!("{}h", secs / 3600);
        }
        if secs % 60 == 0 {
            return format!("{}m", secs / 60);
        }
        return format!("{secs}s");
    }
    format!("{secs}.{millis:03}s")
}

/// Parse `30s`, `10m`, `1h`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }

    let (digits, unit) = if let Some(digits) = s.strip_suffix("ms") {
        (digits, "ms")
    } else if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        (&s[..s.len() - 1], &s[s.len() - 1..])
    } else {
        (s.as_str(), "s")
    };
    let value = digits.parse::<u64>().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
