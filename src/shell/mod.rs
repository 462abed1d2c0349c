//! Shell dialect model, resolution and command translation.
//!
//! A dialect is selected once per process by [`resolve`] and every proposed
//! command is turned into a [`CommandInvocation`] by [`translate`]. The
//! invocation carries the descriptor it was built from, so the executor can
//! never run it against a different dialect.

mod resolve;
mod translate;

use serde::Serialize;
use std::fmt;
use std::path::Path;

pub use resolve::{resolve, resolve_with_override, wsl_bridge_available};
pub use translate::{translate, CommandInvocation};

#[cfg(test)]
pub(crate) use resolve::resolve_with;

/// Shell family with its own invocation and quoting rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Posix,
    PowerShell,
    LegacyCmd,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posix => write!(f, "posix"),
            Self::PowerShell => write!(f, "powershell"),
            Self::LegacyCmd => write!(f, "cmd"),
        }
    }
}

/// Operating-system family the process is running on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Resolved target shell. Immutable once built.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ShellDescriptor {
    dialect: Dialect,
    executable_path: String,
    platform: Platform,
    shell_name: String,
}

impl ShellDescriptor {
    pub fn new(
        dialect: Dialect,
        executable_path: impl Into<String>,
        platform: Platform,
        shell_name: impl Into<String>,
    ) -> Self {
        Self {
            dialect,
            executable_path: executable_path.into(),
            platform,
            shell_name: shell_name.into(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn executable_path(&self) -> &str {
        &self.executable_path
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Normalized shell name (`zsh`, `bash`, `pwsh`, `cmd`, ...).
    ///
    /// History capture uses this to pick a file format; it is finer grained
    /// than the dialect because zsh and bash share one.
    pub fn shell_name(&self) -> &str {
        &self.shell_name
    }
}

impl fmt::Display for ShellDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} dialect) via {} on {}",
            self.shell_name, self.dialect, self.executable_path, self.platform
        )
    }
}

/// Map a shell name or path to its dialect and canonical name.
///
/// Accepts bare names (`zsh`), full paths (`/usr/local/bin/zsh`) and Windows
/// executables (`C:\...\pwsh.exe`). Unknown shells return `None`.
pub fn normalize_shell_name(raw: &str) -> Option<(Dialect, &'static str)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Windows paths arrive with backslashes even when inspected on unix in tests.
    let last = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    let stem = Path::new(last)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(last)
        .to_ascii_lowercase();
    let known = match stem.as_str() {
        "sh" => (Dialect::Posix, "sh"),
        "bash" => (Dialect::Posix, "bash"),
        "zsh" => (Dialect::Posix, "zsh"),
        "dash" => (Dialect::Posix, "dash"),
        "ksh" => (Dialect::Posix, "ksh"),
        "fish" => (Dialect::Posix, "fish"),
        "pwsh" | "pwsh-preview" => (Dialect::PowerShell, "pwsh"),
        "powershell" | "powershell_ise" => (Dialect::PowerShell, "powershell"),
        "cmd" => (Dialect::LegacyCmd, "cmd"),
        _ => return None,
    };
    Some(known)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_unix_paths() {
        assert_eq!(
            normalize_shell_name("/usr/bin/zsh"),
            Some((Dialect::Posix, "zsh"))
        );
        assert_eq!(normalize_shell_name("bash"), Some((Dialect::Posix, "bash")));
    }

    #[test]
    fn normalizes_both_powershell_variants_to_one_dialect() {
        assert_eq!(
            normalize_shell_name(r"C:\Program Files\PowerShell\7\pwsh.exe"),
            Some((Dialect::PowerShell, "pwsh"))
        );
        assert_eq!(
            normalize_shell_name("PowerShell.exe"),
            Some((Dialect::PowerShell, "powershell"))
        );
    }

    #[test]
    fn normalizes_cmd() {
        assert_eq!(
            normalize_shell_name(r"C:\Windows\System32\cmd.exe"),
            Some((Dialect::LegacyCmd, "cmd"))
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(normalize_shell_name("nushell"), None);
        assert_eq!(normalize_shell_name("   "), None);
    }

    #[test]
    fn descriptor_display_mentions_dialect_and_path() {
        let desc = ShellDescriptor::new(Dialect::Posix, "/bin/zsh", Platform::Unix, "zsh");
        assert_eq!(desc.to_string(), "zsh (posix dialect) via /bin/zsh on unix");
    }
}
