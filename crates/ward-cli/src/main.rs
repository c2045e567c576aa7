//! CLI entrypoint for Ward.
//!
//! The binary delegates to [`ward_cli::run_with_signals`], which loads
//! configuration, registers the built-in plugins, and executes the requested
//! command with SIGINT and SIGTERM cancelling the run.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    ward_cli::run_with_signals(std::env::args_os(), &mut stdout, &mut stderr)
}
