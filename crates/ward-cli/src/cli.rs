//! Command-line argument definitions for `ward`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Runs configuration runbooks through Ward's built-in plugins.
#[derive(Parser, Debug)]
#[command(
    name = "ward",
    version,
    disable_help_subcommand = true,
    after_help = "Configuration flags go before the command: --config-path <PATH>, \
                  --log-filter <FILTER>, --log-format <json|compact>, \
                  --call-timeout-secs <SECONDS>. Each also reads from a WARD_* \
                  environment variable."
)]
pub(crate) struct Cli {
    /// The command to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands for the Ward CLI.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Validates and executes every step of a runbook.
    Run {
        /// Path to the runbook YAML file.
        #[arg(value_name = "RUNBOOK")]
        runbook: PathBuf,
        /// Validates and describes the steps without executing them.
        #[arg(long)]
        dry_run: bool,
        /// Skips the remaining steps after the first failure.
        #[arg(long, conflicts_with = "keep_going")]
        fail_fast: bool,
        /// Runs every step even when the configuration enables fail-fast.
        #[arg(long)]
        keep_going: bool,
    },
    /// Prints what each runbook step would do.
    Describe {
        /// Path to the runbook YAML file.
        #[arg(value_name = "RUNBOOK")]
        runbook: PathBuf,
    },
    /// Lists the built-in plugins.
    Plugins,
}
