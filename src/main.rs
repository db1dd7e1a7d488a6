extern crate clap;

use crate::clap::Parser;
use gauss_ledger::cli::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().run()
}
