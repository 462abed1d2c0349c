//! Version and build provenance for `askterm --version`.

/// Package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short commit hash, or `unknown` outside a git checkout.
pub const GIT_COMMIT: &str = env!("ASKTERM_BUILD_GIT_HASH");

/// HTTP-date formatted build time.
pub const BUILD_TIMESTAMP: &str = env!("ASKTERM_BUILD_TIMESTAMP");

pub fn cli_version_text() -> String {
    format!("askterm {VERSION}\n  commit {GIT_COMMIT}\n  built  {BUILD_TIMESTAMP}")
}
