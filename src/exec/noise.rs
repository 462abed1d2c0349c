//! PowerShell stderr cleanup.
//!
//! A non-interactive PowerShell writes a `#< CLIXML` envelope to stderr the
//! first time it loads modules (progress records serialized as XML). It has
//! nothing to do with whether the command succeeded, so it is removed before
//! results reach the caller. Real error records embedded in the envelope
//! are kept as plain text.

const CLIXML_MARKER: &str = "#< CLIXML";

/// Strip CLIXML diagnostic envelopes from PowerShell stderr.
pub(crate) fn strip_powershell_noise(stderr: &str) -> String {
    if !stderr.contains(CLIXML_MARKER) {
        return stderr.to_string();
    }

    let mut kept: Vec<String> = Vec::new();
    let mut in_envelope = false;
    for line in stderr.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(CLIXML_MARKER) {
            in_envelope = true;
            // The XML sometimes follows the marker on the same line.
            let rest = trimmed[CLIXML_MARKER.len()..].trim_start();
            if !rest.is_empty() {
                kept.extend(clixml_error_lines(rest));
                in_envelope = !rest.contains("</Objs>");
            }
            continue;
        }
        if in_envelope && trimmed.starts_with('<') {
            kept.extend(clixml_error_lines(trimmed));
            if trimmed.contains("</Objs>") {
                in_envelope = false;
            }
            continue;
        }
        in_envelope = false;
        kept.push(line.to_string());
    }

    let mut out = kept.join("\n");
    if !out.is_empty() && stderr.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Extract `<S S="Error">...</S>` payloads from one CLIXML fragment.
fn clixml_error_lines(xml: &str) -> Vec<String> {
    const OPEN: &str = "<S S=\"Error\">";
    const CLOSE: &str = "</S>";

    let mut text = String::new();
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        text.push_str(&decode_clixml_text(&after[..end]));
        rest = &after[end + CLOSE.len()..];
    }

    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_clixml_text(raw: &str) -> String {
    raw.replace("_x000D__x000A_", "\n")
        .replace("_x000A_", "\n")
        .replace("_x000D_", "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
