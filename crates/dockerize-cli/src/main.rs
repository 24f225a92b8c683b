//! # dockerize: container test harness CLI
//!
//! Runs a compiled test binary inside a throwaway container that can see the
//! host's processes, cgroups and engine socket, then exits with the test's
//! own status.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(err) = commands::execute(cli) {
        let code = output::exit_code(&err);
        if !output::is_test_failure(&err) {
            eprintln!("error: {err:#}");
        }
        std::process::exit(code);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
