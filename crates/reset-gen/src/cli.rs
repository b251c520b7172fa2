//! Command-line arguments for the `reset` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Generate nil-safe `Reset()` methods for Go structs annotated with
/// `// generate:reset`.
#[derive(Debug, Parser)]
#[command(name = "reset", version, about, long_about = None)]
pub struct Args {
    /// Root directory scanned for Go packages.
    #[arg(short, long, env = "RESET_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Formatter applied to generated files.
    #[arg(long, value_enum, env = "RESET_FORMATTER", default_value_t = FormatterKind::Builtin)]
    pub formatter: FormatterKind,

    /// gofmt executable used by `--formatter gofmt`.
    #[arg(long, env = "GOFMT", default_value = "gofmt")]
    pub gofmt: PathBuf,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatterKind {
    /// Built-in indentation and blank-line normalization.
    Builtin,
    /// External gofmt.
    Gofmt,
}

impl Args {
    /// Log filter directive implied by `-v`, if any.
    pub fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            _ => Some("debug"),
        }
    }
}
