//! Shell descriptor resolution from the process environment.
//!
//! Resolution never fails. Unknown or missing shell names degrade to the
//! platform default (`/bin/sh` on unix, `cmd.exe` on Windows).

use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::{normalize_shell_name, Dialect, Platform, ShellDescriptor};

/// Upper bound for the `wsl --status` probe.
const WSL_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const POSIX_FALLBACK_SHELL: &str = "/bin/sh";

static WSL_BRIDGE: OnceCell<bool> = OnceCell::const_new();

/// Resolve the target shell from the current environment.
pub fn resolve() -> ShellDescriptor {
    resolve_with_override(None)
}

/// Resolve the target shell, preferring an explicit shell name when given
/// (from `[shell] override` or `ASKTERM_SHELL`).
pub fn resolve_with_override(shell_override: Option<&str>) -> ShellDescriptor {
    resolve_with(
        shell_override,
        Platform::current(),
        &|name| std::env::var(name).ok(),
        &|program| {
            which::which(program)
                .ok()
                .map(|path| path.display().to_string())
        },
    )
}

pub(crate) fn resolve_with<FEnv, FWhich>(
    shell_override: Option<&str>,
    platform: Platform,
    env_lookup: &FEnv,
    find_program: &FWhich,
) -> ShellDescriptor
where
    FEnv: Fn(&str) -> Option<String>,
    FWhich: Fn(&str) -> Option<String>,
{
    let shell_env = env_lookup("SHELL");
    let candidates = [
        ("override", shell_override.map(str::to_string)),
        ("SHELL", shell_env),
    ];

    for (source, raw) in candidates {
        let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        match normalize_shell_name(&raw) {
            Some((dialect, name)) => {
                let descriptor =
                    build_descriptor(dialect, name, Some(raw.trim()), platform, env_lookup, find_program);
                debug!(source, shell = %descriptor, "resolved shell");
                return descriptor;
            }
            None => debug!(source, value = %raw, "unrecognized shell name; ignoring"),
        }
    }

    if platform == Platform::Windows && env_lookup("PSModulePath").is_some() {
        let descriptor = build_descriptor(
            Dialect::PowerShell,
            "pwsh",
            None,
            platform,
            env_lookup,
            find_program,
        );
        debug!(shell = %descriptor, "resolved shell from PSModulePath");
        return descriptor;
    }

    let descriptor = platform_default(platform, env_lookup);
    debug!(shell = %descriptor, "falling back to platform default shell");
    descriptor
}

fn platform_default<FEnv>(platform: Platform, env_lookup: &FEnv) -> ShellDescriptor
where
    FEnv: Fn(&str) -> Option<String>,
{
    match platform {
        Platform::Unix => {
            ShellDescriptor::new(Dialect::Posix, POSIX_FALLBACK_SHELL, platform, "sh")
        }
        Platform::Windows => {
            ShellDescriptor::new(Dialect::LegacyCmd, comspec(env_lookup), platform, "cmd")
        }
    }
}

fn build_descriptor<FEnv, FWhich>(
    dialect: Dialect,
    name: &'static str,
    raw: Option<&str>,
    platform: Platform,
    env_lookup: &FEnv,
    find_program: &FWhich,
) -> ShellDescriptor
where
    FEnv: Fn(&str) -> Option<String>,
    FWhich: Fn(&str) -> Option<String>,
{
    // A value that already names a path is used as-is.
    let explicit_path = raw.filter(|value| value.contains(['/', '\\']));
    let executable = match dialect {
        Dialect::Posix => explicit_path
            .map(str::to_string)
            .or_else(|| find_program(name))
            .unwrap_or_else(|| format!("/bin/{name}")),
        Dialect::PowerShell => explicit_path
            .map(str::to_string)
            // PowerShell 7 is preferred even when the legacy name was given.
            .or_else(|| find_program("pwsh"))
            .or_else(|| find_program("powershell"))
            .unwrap_or_else(|| match platform {
                Platform::Windows => "powershell.exe".to_string(),
                Platform::Unix => "pwsh".to_string(),
            }),
        Dialect::LegacyCmd => explicit_path
            .map(str::to_string)
            .unwrap_or_else(|| comspec(env_lookup)),
    };
    ShellDescriptor::new(dialect, executable, platform, name)
}

fn comspec<FEnv>(env_lookup: &FEnv) -> String
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup("COMSPEC")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "cmd.exe".to_string())
}

/// Whether tmux can be reached through a Windows-subsystem-for-Linux bridge.
///
/// Always `false` off Windows. The probe runs at most once per process.
pub async fn wsl_bridge_available() -> bool {
    if Platform::current() != Platform::Windows {
        return false;
    }
    *WSL_BRIDGE.get_or_init(probe_wsl_bridge).await
}

async fn probe_wsl_bridge() -> bool {
    let mut cmd = Command::new("wsl");
    cmd.arg("--status")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    match timeout(WSL_PROBE_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) => {
            debug!(success = status.success(), "wsl bridge probe finished");
            status.success()
        }
        Ok(Err(err)) => {
            debug!(error = %err, "wsl bridge probe could not start");
            false
        }
        Err(_) => {
            debug!("wsl bridge probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::env_from;

    fn no_programs(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn shell_env_selects_posix_with_its_path() {
        let env = env_from(&[("SHELL", "/usr/bin/zsh")]);
        let desc = resolve_with(None, Platform::Unix, &env, &no_programs);
        assert_eq!(desc.dialect(), Dialect::Posix);
        assert_eq!(desc.executable_path(), "/usr/bin/zsh");
        assert_eq!(desc.shell_name(), "zsh");
    }

    #[test]
    fn unset_shell_on_unix_defaults_to_sh() {
        let env = env_from(&[]);
        let desc = resolve_with(None, Platform::Unix, &env, &no_programs);
        assert_eq!(desc.dialect(), Dialect::Posix);
        assert_eq!(desc.executable_path(), "/bin/sh");
    }

    #[test]
    fn unknown_shell_degrades_to_platform_default() {
        let env = env_from(&[("SHELL", "/opt/bin/xonsh")]);
        let unix = resolve_with(None, Platform::Unix, &env, &no_programs);
        assert_eq!(unix.dialect(), Dialect::Posix);
        assert_eq!(unix.executable_path(), "/bin/sh");

        let windows = resolve_with(None, Platform::Windows, &env, &no_programs);
        assert_eq!(windows.dialect(), Dialect::LegacyCmd);
        assert_eq!(windows.executable_path(), "cmd.exe");
    }

    #[test]
    fn windows_without_markers_uses_comspec() {
        let env = env_from(&[("COMSPEC", r"C:\Windows\System32\cmd.exe")]);
        let desc = resolve_with(None, Platform::Windows, &env, &no_programs);
        assert_eq!(desc.dialect(), Dialect::LegacyCmd);
        assert_eq!(desc.executable_path(), r"C:\Windows\System32\cmd.exe");
    }

    #[test]
    fn windows_psmodulepath_selects_powershell() {
        let env = env_from(&[("PSModulePath", r"C:\some\path")]);
        let desc = resolve_with(None, Platform::Windows, &env, &no_programs);
        assert_eq!(desc.dialect(), Dialect::PowerShell);
        assert_eq!(desc.executable_path(), "powershell.exe");
    }

    #[test]
    fn powershell_prefers_pwsh_when_installed() {
        let env = env_from(&[]);
        let find = |program: &str| {
            (program == "pwsh").then(|| r"C:\Program Files\PowerShell\7\pwsh.exe".to_string())
        };
        let desc = resolve_with(Some("powershell"), Platform::Windows, &env, &find);
        assert_eq!(desc.dialect(), Dialect::PowerShell);
        assert_eq!(
            desc.executable_path(),
            r"C:\Program Files\PowerShell\7\pwsh.exe"
        );
        assert_eq!(desc.shell_name(), "powershell");
    }

    #[test]
    fn powershell_falls_back_to_legacy_binary() {
        let env = env_from(&[]);
        let find = |program: &str| {
            (program == "powershell").then(|| {
                r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe".to_string()
            })
        };
        let desc = resolve_with(Some("pwsh"), Platform::Windows, &env, &find);
        assert_eq!(
            desc.executable_path(),
            r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe"
        );
    }

    #[test]
    fn override_beats_shell_env() {
        let env = env_from(&[("SHELL", "/bin/bash")]);
        let desc = resolve_with(Some("pwsh"), Platform::Unix, &env, &no_programs);
        assert_eq!(desc.dialect(), Dialect::PowerShell);
        assert_eq!(desc.executable_path(), "pwsh");
    }

    #[test]
    fn unrecognized_override_falls_through_to_shell_env() {
        let env = env_from(&[("SHELL", "/bin/bash")]);
        let desc = resolve_with(Some("elvish"), Platform::Unix, &env, &no_programs);
        assert_eq!(desc.executable_path(), "/bin/bash");
    }

    #[test]
    fn bare_override_uses_path_lookup() {
        let env = env_from(&[]);
        let find = |program: &str| (program == "zsh").then(|| "/usr/local/bin/zsh".to_string());
        let desc = resolve_with(Some("zsh"), Platform::Unix, &env, &find);
        assert_eq!(desc.executable_path(), "/usr/local/bin/zsh");
    }

    #[tokio::test]
    async fn wsl_bridge_is_never_available_off_windows() {
        if Platform::current() == Platform::Unix {
            assert!(!wsl_bridge_available().await);
        }
    }
}
