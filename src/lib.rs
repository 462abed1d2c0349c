//! askterm: run assistant-proposed shell commands and capture terminal context.
//!
//! The crate has two independent pipelines:
//! - [`shell`] resolves the target dialect and translates a raw command,
//!   and [`exec`] runs it one-shot with a timeout.
//! - [`context`] snapshots recent terminal activity from tmux scrollback or
//!   shell history, minus the line that launched the current process.
//!
//! # Quick start
//!
//! ```no_run
//! use askterm::{exec, shell};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let descriptor = shell::resolve();
//! let invocation = shell::translate("echo hello", &descriptor);
//! let result = exec::execute(&invocation, Duration::from_secs(5)).await;
//! println!("{}", result.to_model_text(16_000));
//! # }
//! ```

pub mod approval;
pub mod build_info;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod shell;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
