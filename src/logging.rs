//! Process-wide `tracing` subscriber setup.
//!
//! Library modules only emit events; the binary calls [`init`] once.
//! Filter precedence: `ASKTERM_LOG` > `-v` count > `[logging] level` > warn.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a full `tracing` filter directive.
pub const LOG_ENV: &str = "ASKTERM_LOG";

/// Pick the filter directive from the available inputs.
pub fn filter_directive(env_value: Option<&str>, verbosity: u8, config_level: &str) -> String {
    if let Some(value) = env_value.map(str::trim).filter(|value| !value.is_empty()) {
        return value.to_string();
    }
    match verbosity {
        0 => {
            let level = config_level.trim();
            if level.is_empty() {
                "warn".to_string()
            } else {
                level.to_string()
            }
        }
        1 => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Install the stderr subscriber. Later calls are ignored.
pub fn init(verbosity: u8, config_level: &str, ansi: bool) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), verbosity, config_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(true)
        .try_init();
}
