//! Embeds the commit and build time shown by `askterm --version`.
//!
//! Both values can be pinned through the environment for reproducible
//! builds; otherwise they are probed, and "unknown" is used when probing
//! fails.

use std::env;
use std::fs;
use std::process::Command;
use std::time::SystemTime;

const GIT_HASH_VAR: &str = "ASKTERM_BUILD_GIT_HASH";
const TIMESTAMP_VAR: &str = "ASKTERM_BUILD_TIMESTAMP";

fn main() {
    watch_git_head();

    let metadata: [(&str, fn() -> String); 2] =
        [(GIT_HASH_VAR, probe_git_hash), (TIMESTAMP_VAR, probe_build_time)];
    for (var, probe) in metadata {
        println!("cargo:rerun-if-env-changed={var}");
        let value = env::var(var)
            .ok()
            .filter(|pinned| !pinned.trim().is_empty())
            .unwrap_or_else(probe);
        println!("cargo:rustc-env={var}={value}");
    }
}

/// Rebuild when HEAD moves, including commits on the checked-out branch.
fn watch_git_head() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    let branch_ref = fs::read_to_string(".git/HEAD")
        .ok()
        .and_then(|head| head.trim().strip_prefix("ref: ").map(str::to_owned));
    if let Some(branch_ref) = branch_ref {
        println!("cargo:rerun-if-changed=.git/{branch_ref}");
    }
}

fn probe_git_hash() -> String {
    command_stdout("git", &["rev-parse", "--short=12", "HEAD"])
        .unwrap_or_else(|| "unknown".to_owned())
}

fn probe_build_time() -> String {
    httpdate::fmt_http_date(SystemTime::now())
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_owned()).filter(|text| !text.is_empty())
}
