//! Command-line interface runtime for Ward.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry,
//! registration of the built-in plugins, and runbook execution. Output
//! streams and the request context are injected so tests can drive the
//! runtime without a terminal or signals.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use tracing::{info, warn};
use ward_config::Config;
use ward_plugin_disk::DiskChecker;
use ward_plugins::{
    CancellationToken, FailurePolicy, PluginHost, PluginRegistry, RequestContext, RunMode,
    RunReport, Runbook, RunbookRunner,
};

mod cli;
mod config;
mod errors;
mod report;
mod signals;
pub mod telemetry;


use cli::{Cli, CliCommand};
use config::{load_configuration, split_config_arguments};
use errors::AppError;

/// Tracing target for CLI events.
pub(crate) const CLI_TARGET: &str = "ward_cli";

/// Runs the CLI with the process's termination signals wired to
/// cancellation.
///
/// The handlers are installed once telemetry is up. A failure to install
/// them is logged and the run continues without them.
pub fn run_with_signals<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let token = CancellationToken::new();
    let ctx = RequestContext::with_token(token.clone());
    run_cli(args, stdout, stderr, &ctx, Some(&token))
}

/// Runs the CLI with a background request context.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_context(args, stdout, stderr, &RequestContext::background())
}

/// Runs the CLI under `ctx`.
///
/// Configuration flags must precede the command. Returns success only when
/// the command completed and, for runbook commands, every step succeeded.
pub fn run_with_context<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    ctx: &RequestContext,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_cli(args, stdout, stderr, ctx, None)
}

fn run_cli<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    ctx: &RequestContext,
    signal_token: Option<&CancellationToken>,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let split = split_config_arguments(args);
    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if is_informational(&error) => {
            return match write!(stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report_error(stderr, &AppError::CliUsage(error)),
    };

    let result = bootstrap(&split.config_arguments, signal_token)
        .and_then(|config| execute(&cli, &config, stdout, ctx));
    match result {
        Ok(code) => code,
        Err(error) => report_error(stderr, &error),
    }
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
    )
}

fn report_error(stderr: &mut impl Write, error: &AppError) -> ExitCode {
    writeln!(stderr, "{error}").ok();
    ExitCode::FAILURE
}

fn bootstrap(
    config_arguments: &[OsString],
    signal_token: Option<&CancellationToken>,
) -> Result<Config, AppError> {
    let config = load_configuration(config_arguments)?;
    telemetry::initialise(&config)?;
    if let Some(token) = signal_token {
        if let Err(error) = signals::cancel_on_termination(token) {
            warn!(target: CLI_TARGET, %error, "failed to install signal handlers");
        }
    }
    Ok(config)
}

fn execute(
    cli: &Cli,
    config: &Config,
    stdout: &mut impl Write,
    ctx: &RequestContext,
) -> Result<ExitCode, AppError> {
    match &cli.command {
        CliCommand::Plugins => {
            let registry = builtin_registry()?;
            report::render_plugins(stdout, &registry.infos())?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Run {
            runbook,
            dry_run,
            fail_fast,
            keep_going,
        } => {
            let mode = if *dry_run {
                RunMode::DryRun
            } else {
                RunMode::Execute
            };
            let policy = failure_policy(config, *fail_fast, *keep_going);
            let report = run_runbook(config, runbook, mode, policy, ctx)?;
            report::render_report(stdout, &report)?;
            Ok(exit_code(&report))
        }
        CliCommand::Describe { runbook } => {
            let policy = failure_policy(config, false, false);
            let report = run_runbook(config, runbook, RunMode::DryRun, policy, ctx)?;
            report::render_descriptions(stdout, &report)?;
            Ok(exit_code(&report))
        }
    }
}

/// Command-line flags win over the configured default in either direction.
const fn failure_policy(config: &Config, fail_fast: bool, keep_going: bool) -> FailurePolicy {
    if fail_fast || (config.fail_fast() && !keep_going) {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::Continue
    }
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn builtin_registry() -> Result<PluginRegistry, AppError> {
    let mut registry = PluginRegistry::new();
    registry
        .register(DiskChecker::new())
        .map_err(AppError::Registration)?;
    Ok(registry)
}

fn run_runbook(
    config: &Config,
    path: &Path,
    mode: RunMode,
    policy: FailurePolicy,
    ctx: &RequestContext,
) -> Result<RunReport, AppError> {
    let runbook = Runbook::from_path(path)?;
    let mut host = PluginHost::new(builtin_registry()?);
    if let Some(timeout) = config.call_timeout() {
        host = host.with_call_timeout(timeout);
    }

    info!(
        target: CLI_TARGET,
        runbook = %path.display(),
        steps = runbook.steps().len(),
        ?mode,
        ?policy,
        "running runbook"
    );
    let report = RunbookRunner::new(&host)
        .with_mode(mode)
        .with_policy(policy)
        .run(ctx, &runbook);

    for error in host.shutdown() {
        warn!(target: CLI_TARGET, %error, "plugin teardown failed");
    }
    Ok(report)
}
