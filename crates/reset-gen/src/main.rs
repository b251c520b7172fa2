//! CLI entrypoint for `reset`.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use reset_gen::{GenerateError, Generator, Gofmt, Summary};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, FormatterKind};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(&args) {
        Ok(summary) => {
            info!(files = summary.files.len(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Summary, GenerateError> {
    let mut generator = Generator::new();
    if args.formatter == FormatterKind::Gofmt {
        generator.with_formatter(Gofmt::with_program(&args.gofmt));
    }
    generator.run(&args.dir)
}

/// `-v` wins over `RUST_LOG`; without either only warnings are shown.
fn init_tracing(args: &Args) {
    let filter = match args.log_level() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
