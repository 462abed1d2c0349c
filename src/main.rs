//! CLI entry point for askterm.

mod app;
mod cli;

use askterm::build_info::cli_version_text;
use askterm::config::load_config_with_source;
use askterm::logging;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    if args.version {
        println!("{}", cli_version_text());
        return;
    }

    let loaded = match load_config_with_source(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let color = !args.no_color && std::io::stderr().is_terminal();
    logging::init(args.verbose, &loaded.config.logging.level, color);
    debug!(source = %loaded.source, "configuration ready");

    let Some(command) = args.command else {
        let _ = cli::Args::command().print_help();
        std::process::exit(2);
    };

    let code = app::run(command, &loaded.config, color).await;
    std::process::exit(code);
}
