//! Raw command string to non-interactive process invocation.
//!
//! Translation is total and deterministic. Each dialect gets exactly one
//! strategy:
//! - posix: `<shell> -c <command>`
//! - cmd: `cmd.exe /d /s /c "<command>"` with cross-drive `cd` rewriting
//! - PowerShell: the command is wrapped so formatting cmdlets materialize
//!   into strings, then sent as a UTF-16LE base64 `-EncodedCommand`. Nothing
//!   is ever written to an interactive stdin, and no state survives between
//!   commands.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::{Dialect, Platform, ShellDescriptor};

/// Column width for `Out-String`; wide enough that tables are not wrapped.
const POWERSHELL_OUTPUT_WIDTH: u32 = 4096;

/// A fully translated, ready-to-spawn command.
///
/// Built fresh for every execution and never mutated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    raw_command: String,
    descriptor: ShellDescriptor,
    program: String,
    args: Vec<String>,
    /// Final argument passed without MSVC-style re-quoting (cmd.exe only).
    verbatim_tail: Option<String>,
    /// PowerShell script before encoding, kept for diagnostics.
    script: Option<String>,
}

impl CommandInvocation {
    /// The command exactly as proposed/approved, for display.
    pub fn raw_command(&self) -> &str {
        &self.raw_command
    }

    /// Text shown to the user when the command is proposed.
    pub fn display(&self) -> &str {
        &self.raw_command
    }

    pub fn dialect(&self) -> Dialect {
        self.descriptor.dialect()
    }

    pub fn descriptor(&self) -> &ShellDescriptor {
        &self.descriptor
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments that go through normal argument quoting.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn verbatim_tail(&self) -> Option<&str> {
        self.verbatim_tail.as_deref()
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// Complete argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        if let Some(tail) = &self.verbatim_tail {
            argv.push(tail.clone());
        }
        argv
    }
}

/// Translate `raw_command` for the dialect in `descriptor`.
pub fn translate(raw_command: &str, descriptor: &ShellDescriptor) -> CommandInvocation {
    let program = descriptor.executable_path().to_string();
    let (args, verbatim_tail, script) = match descriptor.dialect() {
        Dialect::Posix => (vec!["-c".to_string(), raw_command.to_string()], None, None),
        Dialect::LegacyCmd => {
            let command = rewrite_cmd_directory_change(raw_command);
            (
                vec!["/d".to_string(), "/s".to_string(), "/c".to_string()],
                Some(format!("\"{command}\"")),
                None,
            )
        }
        Dialect::PowerShell => {
            let script = build_powershell_script(raw_command);
            let mut args = vec![
                "-NoProfile".to_string(),
                "-NoLogo".to_string(),
                "-NonInteractive".to_string(),
            ];
            if descriptor.platform() == Platform::Windows {
                args.push("-ExecutionPolicy".to_string());
                args.push("Bypass".to_string());
            }
            args.push("-EncodedCommand".to_string());
            args.push(encode_script_for_powershell(&script));
            (args, None, Some(script))
        }
    };

    CommandInvocation {
        raw_command: raw_command.to_string(),
        descriptor: descriptor.clone(),
        program,
        args,
        verbatim_tail,
        script,
    }
}

/// Wrap a PowerShell command so its output is fully materialized.
///
/// Piping through `Out-String` forces `Format-Table` and friends to render
/// immediately instead of waiting on a console width that never arrives.
/// Progress records are silenced and stdout is forced to UTF-8 so the
/// captured bytes decode predictably.
pub(crate) fn build_powershell_script(raw_command: &str) -> String {
    format!(
        "$ProgressPreference = 'SilentlyContinue'\n\
         [Console]::OutputEncoding = [System.Text.Encoding]::UTF8\n\
         $global:LASTEXITCODE = 0\n\
         & {{\n{raw_command}\n}} | Out-String -Width {POWERSHELL_OUTPUT_WIDTH}\n\
         exit $LASTEXITCODE\n"
    )
}

/// Encode a script the way `-EncodedCommand` expects: UTF-16LE, base64.
pub(crate) fn encode_script_for_powershell(script: &str) -> String {
    let mut wide: Vec<u8> = Vec::with_capacity((script.len() + 1) * 2);
    for unit in script.encode_utf16() {
        wide.extend_from_slice(&unit.to_le_bytes());
    }
    BASE64.encode(wide)
}

/// Rewrite `cd <dir>` to `cd /d <dir>` so drive changes are honored.
fn rewrite_cmd_directory_change(raw_command: &str) -> String {
    let trimmed = raw_command.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let Some(rest) = ["cd ", "chdir "]
        .iter()
        .find_map(|prefix| lowered.starts_with(prefix).then(|| &trimmed[prefix.len()..]))
    else {
        return raw_command.to_string();
    };
    let target = rest.trim_start();
    if target.is_empty() || target.to_ascii_lowercase().starts_with("/d") {
        return raw_command.to_string();
    }
    format!("cd /d {target}")
}
