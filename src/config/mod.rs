//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`ASKTERM_TIMEOUT_SECS`, `ASKTERM_CONTEXT_LINES`,
//!    `ASKTERM_HISTORY_COMMANDS`, `ASKTERM_SHELL`)
//! 2. TOML file given with `--config`
//! 3. `./askterm.toml` in the current directory
//! 4. `$XDG_CONFIG_HOME/askterm/askterm.toml` (or the platform config dir)
//! 5. Built-in defaults
//!
//! Only the binary reads configuration. Library entry points take their
//! limits as explicit parameters.

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_source};
pub use sources::{config_root_dir, ConfigSource};
pub use types::{Config, ContextConfig, ExecutionConfig, LoadedConfig, LoggingConfig, ShellConfig};

#[cfg(test)]
mod tests {
    use super::loader::load_config_from_sources;
    use super::*;
    use crate::error::ConfigError;
    use crate::testsupport::env_from;
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn files(pairs: &[(&str, &str)]) -> impl Fn(&Path) -> Result<String, io::Error> {
        let map: HashMap<PathBuf, String> = pairs
            .iter()
            .map(|(p, text)| (PathBuf::from(p), text.to_string()))
            .collect();
        move |path| {
            map.get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    fn root() -> Option<PathBuf> {
        Some(PathBuf::from("/cfg"))
    }

    #[test]
    fn defaults_are_sensible() {
        let c = Config::default();
        assert_eq!(c.execution.timeout_secs, 60);
        assert_eq!(c.execution.timeout(), Duration::from_secs(60));
        assert_eq!(c.execution.max_output_bytes, 16_000);
        assert_eq!(c.context.max_lines, 500);
        assert_eq!(c.context.max_commands, 50);
        assert_eq!(c.shell.shell_override, None);
        assert_eq!(c.logging.level, "warn");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let loaded =
            load_config_from_sources(None, files(&[]), env_from(&[]), root).expect("config");
        assert_eq!(loaded.source, ConfigSource::BuiltInDefaults);
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn parse_partial_toml() {
        let read = files(&[(
            "askterm.toml",
            "[execution]\ntimeout_secs = 5\n\n[shell]\noverride = \"pwsh\"\n",
        )]);
        let loaded = load_config_from_sources(None, read, env_from(&[]), root).expect("config");
        assert_eq!(loaded.source, ConfigSource::Local);
        assert_eq!(loaded.config.execution.timeout_secs, 5);
        assert_eq!(loaded.config.execution.max_output_bytes, 16_000);
        assert_eq!(loaded.config.shell.shell_override.as_deref(), Some("pwsh"));
        assert_eq!(loaded.config.context.max_lines, 500);
    }

    #[test]
    fn local_file_beats_global_and_explicit_beats_both() {
        let read = files(&[
            ("askterm.toml", "[context]\nmax_lines = 10\n"),
            ("/cfg/askterm/askterm.toml", "[context]\nmax_lines = 20\n"),
            ("/tmp/custom.toml", "[context]\nmax_lines = 30\n"),
        ]);
        let local = load_config_from_sources(None, &read, env_from(&[]), root).expect("local");
        assert_eq!(local.config.context.max_lines, 10);

        let explicit =
            load_config_from_sources(Some("/tmp/custom.toml"), &read, env_from(&[]), root)
                .expect("explicit");
        assert_eq!(explicit.config.context.max_lines, 30);
        assert_eq!(
            explicit.source,
            ConfigSource::Explicit(PathBuf::from("/tmp/custom.toml"))
        );
    }

    #[test]
    fn global_file_is_used_when_no_local_file() {
        let read = files(&[("/cfg/askterm/askterm.toml", "[logging]\nlevel = \"debug\"\n")]);
        let loaded = load_config_from_sources(None, read, env_from(&[]), root).expect("config");
        assert_eq!(
            loaded.source,
            ConfigSource::Global(PathBuf::from("/cfg/askterm/askterm.toml"))
        );
        assert_eq!(loaded.config.logging.level, "debug");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_from_sources(Some("/nope.toml"), files(&[]), env_from(&[]), root)
            .expect_err("explicit path must exist");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let read = files(&[("askterm.toml", "[execution]\ntimeout_secs = 5\n")]);
        let env = env_from(&[
            ("ASKTERM_TIMEOUT_SECS", "9"),
            ("ASKTERM_CONTEXT_LINES", "42"),
            ("ASKTERM_HISTORY_COMMANDS", "7"),
            ("ASKTERM_SHELL", " zsh "),
        ]);
        let c = load_config_from_sources(None, read, env, root).expect("config").config;
        assert_eq!(c.execution.timeout_secs, 9);
        assert_eq!(c.context.max_lines, 42);
        assert_eq!(c.context.max_commands, 7);
        assert_eq!(c.shell.shell_override.as_deref(), Some("zsh"));
    }

    #[test]
    fn non_integer_env_value_names_the_variable() {
        let env = env_from(&[("ASKTERM_CONTEXT_LINES", "lots")]);
        let err = load_config_from_sources(None, files(&[]), env, root).expect_err("invalid");
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("ASKTERM_CONTEXT_LINES"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_limits_are_clamped() {
        let read = files(&[(
            "askterm.toml",
            "[execution]\ntimeout_secs = 0\n[context]\nmax_lines = 0\nmax_commands = 0\n[shell]\noverride = \"  \"\n",
        )]);
        let c = load_config_from_sources(None, read, env_from(&[]), root).expect("config").config;
        assert_eq!(c.execution.timeout_secs, 1);
        assert_eq!(c.context.max_lines, 1);
        assert_eq!(c.context.max_commands, 1);
        assert_eq!(c.shell.shell_override, None);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let read = files(&[("askterm.toml", "[execution\n")]);
        let err = load_config_from_sources(None, read, env_from(&[]), root).expect_err("toml");
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
