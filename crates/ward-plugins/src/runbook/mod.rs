//! Runbooks: ordered component/action/check steps driven through the host.
//!
//! A runbook is a YAML document listing steps. Each step names a plugin, the
//! raw configuration of the component it targets, and exactly one action or
//! check:
//!
//! ```yaml
//! steps:
//!   - name: log directory exists
//!     plugin: disk-checker
//!     component: { path: /var/log }
//!     action: { kind: ensure-dir }
//!   - name: log volume below 90%
//!     plugin: disk-checker
//!     component: { path: /var/log }
//!     check: { max_used_percent: 90 }
//! ```
//!
//! The [`RunbookRunner`] parses, validates, and describes each step through
//! the [`PluginHost`] before executing it. The raw configuration is handed to
//! the plugin untouched; the runbook layer never interprets it.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::contract::RawConfig;
use crate::error::PluginError;
use crate::host::PluginHost;

/// Tracing target for runbook execution.
const RUNBOOK_TARGET: &str = "ward_plugins::runbook";

/// Errors raised while loading a runbook.
#[derive(Debug, Error)]
pub enum RunbookError {
    /// The runbook file could not be read.
    #[error("failed to read runbook '{}': {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The document is not valid YAML or does not match the runbook layout.
    #[error("failed to parse runbook: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The runbook has no steps.
    #[error("runbook contains no steps")]
    Empty,

    /// A step is structurally invalid.
    #[error("step {index} ('{name}'): {message}")]
    Step {
        /// One-based position of the step.
        index: usize,
        /// Step name.
        name: String,
        /// Description of the problem.
        message: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunbookDocument {
    steps: Vec<StepDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepDocument {
    name: String,
    plugin: String,
    #[serde(default)]
    component: RawConfig,
    #[serde(default)]
    action: Option<RawConfig>,
    #[serde(default)]
    check: Option<RawConfig>,
}

/// What a step does to its component.
#[derive(Debug, Clone, PartialEq)]
pub enum StepTarget {
    /// Perform an action.
    Action(RawConfig),
    /// Evaluate a check.
    Check(RawConfig),
}

impl StepTarget {
    /// Returns `"action"` or `"check"`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Action(_) => "action",
            Self::Check(_) => "check",
        }
    }
}

/// One validated runbook step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunbookStep {
    name: String,
    plugin: String,
    component: RawConfig,
    target: StepTarget,
}

impl RunbookStep {
    /// Creates a step.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        plugin: impl Into<String>,
        component: RawConfig,
        target: StepTarget,
    ) -> Self {
        Self {
            name: name.into(),
            plugin: plugin.into(),
            component,
            target,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the name of the plugin handling the step.
    #[must_use]
    pub const fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    /// Returns the raw component configuration.
    #[must_use]
    pub const fn component(&self) -> &RawConfig {
        &self.component
    }

    /// Returns the action or check configuration.
    #[must_use]
    pub const fn target(&self) -> &StepTarget {
        &self.target
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Runbook {
    steps: Vec<RunbookStep>,
}

impl Runbook {
    /// Builds a runbook from already validated steps.
    ///
    /// # Errors
    ///
    /// Returns [`RunbookError::Empty`] when `steps` is empty.
    pub fn new(steps: Vec<RunbookStep>) -> Result<Self, RunbookError> {
        if steps.is_empty() {
            return Err(RunbookError::Empty);
        }
        Ok(Self { steps })
    }

    /// Parses a runbook from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RunbookError::Parse`] for malformed documents,
    /// [`RunbookError::Empty`] when there are no steps, and
    /// [`RunbookError::Step`] when a step has a blank name or plugin or does
    /// not declare exactly one of `action` and `check`.
    pub fn from_yaml(text: &str) -> Result<Self, RunbookError> {
        let document: RunbookDocument =
            serde_saphyr::from_str(text).map_err(|error| RunbookError::Parse {
                message: error.to_string(),
            })?;
        let steps = document
            .steps
            .into_iter()
            .enumerate()
            .map(|(position, step)| convert_step(position + 1, step))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(steps)
    }

    /// Reads and parses a runbook file.
    ///
    /// # Errors
    ///
    /// Returns [`RunbookError::Read`] when the file cannot be read, otherwise
    /// the errors of [`Runbook::from_yaml`].
    pub fn from_path(path: &Path) -> Result<Self, RunbookError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunbookError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::from_yaml(&text)
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[RunbookStep] {
        &self.steps
    }
}

fn convert_step(index: usize, step: StepDocument) -> Result<RunbookStep, RunbookError> {
    let invalid = |message: &str| RunbookError::Step {
        index,
        name: step.name.clone(),
        message: message.to_owned(),
    };
    if step.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if step.plugin.trim().is_empty() {
        return Err(invalid("plugin must not be empty"));
    }
    let target = match (step.action, step.check) {
        (Some(action), None) => StepTarget::Action(action),
        (None, Some(check)) => StepTarget::Check(check),
        (Some(_), Some(_)) => return Err(invalid("declare either an action or a check, not both")),
        (None, None) => return Err(invalid("declare an action or a check")),
    };
    Ok(RunbookStep {
        name: step.name,
        plugin: step.plugin,
        component: step.component,
        target,
    })
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Whether steps are executed or only validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Validate, describe, and execute every step.
    #[default]
    Execute,
    /// Stop after validation and description.
    DryRun,
}

/// What happens after a step errors or a check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep running the remaining steps.
    #[default]
    Continue,
    /// Skip every remaining step.
    FailFast,
}

/// Result of a single step.
#[derive(Debug)]
pub enum StepOutcome {
    /// The action ran successfully.
    Applied,
    /// The check evaluated and passed.
    Passed,
    /// The check evaluated and failed.
    Failed,
    /// Dry run: the step parsed and validated.
    Validated,
    /// A plugin operation returned an error.
    Errored(PluginError),
    /// The step did not run because an earlier step aborted the run or the
    /// request was interrupted.
    Skipped,
}

impl StepOutcome {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Validated => "validated",
            Self::Errored(_) => "errored",
            Self::Skipped => "skipped",
        }
    }

    /// Returns `true` for outcomes that make the run unsuccessful.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Errored(_))
    }
}

/// Record of one executed step.
#[derive(Debug)]
pub struct StepReport {
    name: String,
    plugin: String,
    component: Option<String>,
    target: Option<String>,
    outcome: StepOutcome,
}

impl StepReport {
    fn pending(step: &RunbookStep) -> Self {
        Self {
            name: step.name.clone(),
            plugin: step.plugin.clone(),
            component: None,
            target: None,
            outcome: StepOutcome::Skipped,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin that handled the step.
    #[must_use]
    pub const fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    /// Returns the plugin's description of the component, once parsed.
    #[must_use]
    pub fn component_description(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Returns the plugin's description of the action or check, once parsed.
    #[must_use]
    pub fn target_description(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn outcome(&self) -> &StepOutcome {
        &self.outcome
    }
}

/// Outcome counts across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Actions applied.
    pub applied: usize,
    /// Checks passed.
    pub passed: usize,
    /// Checks failed.
    pub failed: usize,
    /// Steps validated in a dry run.
    pub validated: usize,
    /// Steps that errored.
    pub errored: usize,
    /// Steps skipped.
    pub skipped: usize,
}

/// Reports of every step in runbook order.
#[derive(Debug, Default)]
pub struct RunReport {
    steps: Vec<StepReport>,
}

impl RunReport {
    /// Returns the step reports.
    #[must_use]
    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    /// Returns `true` when no step failed or errored and nothing was skipped.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|step| !step.outcome.is_failure() && !matches!(step.outcome, StepOutcome::Skipped))
    }

    /// Counts outcomes.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.steps
            .iter()
            .fold(RunSummary::default(), |mut summary, step| {
                match step.outcome {
                    StepOutcome::Applied => summary.applied += 1,
                    StepOutcome::Passed => summary.passed += 1,
                    StepOutcome::Failed => summary.failed += 1,
                    StepOutcome::Validated => summary.validated += 1,
                    StepOutcome::Errored(_) => summary.errored += 1,
                    StepOutcome::Skipped => summary.skipped += 1,
                }
                summary
            })
    }
}

/// Drives a [`Runbook`] through a [`PluginHost`].
///
/// # Example
///
/// ```
/// use ward_plugins::{FailurePolicy, PluginHost, PluginRegistry, RequestContext, RunMode, RunbookRunner};
///
/// let host = PluginHost::new(PluginRegistry::new());
/// let runner = RunbookRunner::new(&host)
///     .with_mode(RunMode::DryRun)
///     .with_policy(FailurePolicy::FailFast);
/// assert_eq!(runner.mode(), RunMode::DryRun);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RunbookRunner<'a> {
    host: &'a PluginHost,
    mode: RunMode,
    policy: FailurePolicy,
}

impl<'a> RunbookRunner<'a> {
    /// Creates a runner that executes every step and continues past failures.
    #[must_use]
    pub const fn new(host: &'a PluginHost) -> Self {
        Self {
            host,
            mode: RunMode::Execute,
            policy: FailurePolicy::Continue,
        }
    }

    /// Selects execute or dry-run mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Selects the failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the run mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Returns the failure policy.
    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Runs every step in order and reports the outcomes.
    #[must_use]
    pub fn run(&self, ctx: &RequestContext, runbook: &Runbook) -> RunReport {
        let mut report = RunReport::default();
        let mut aborted = false;
        for step in runbook.steps() {
            let mut step_report = StepReport::pending(step);
            if aborted {
                report.steps.push(step_report);
                continue;
            }
            if let Err(interrupted) = ctx.check() {
                warn!(
                    target: RUNBOOK_TARGET,
                    step = step.name(),
                    %interrupted,
                    "run interrupted, skipping remaining steps"
                );
                aborted = true;
                report.steps.push(step_report);
                continue;
            }

            let outcome = self
                .run_step(ctx, step, &mut step_report)
                .unwrap_or_else(StepOutcome::Errored);
            step_report.outcome = outcome;
            info!(
                target: RUNBOOK_TARGET,
                step = step.name(),
                plugin = step.plugin(),
                target_kind = step.target().label(),
                outcome = step_report.outcome.label(),
                "step finished"
            );
            if step_report.outcome.is_failure() && self.policy == FailurePolicy::FailFast {
                aborted = true;
            }
            report.steps.push(step_report);
        }
        report
    }

    fn run_step(
        &self,
        ctx: &RequestContext,
        step: &RunbookStep,
        report: &mut StepReport,
    ) -> Result<StepOutcome, PluginError> {
        let host = self.host;
        let component = host.parse_component(step.plugin(), step.component())?;
        host.validate_component(ctx, &component)?;
        report.component = Some(host.describe_component(ctx, &component));

        match step.target() {
            StepTarget::Action(data) => {
                let action = host.parse_action(step.plugin(), data)?;
                host.validate_action(ctx, &action)?;
                report.target = Some(host.describe_action(ctx, &action));
                if self.mode == RunMode::DryRun {
                    return Ok(StepOutcome::Validated);
                }
                host.execute_action(ctx, &component, &action)?;
                Ok(StepOutcome::Applied)
            }
            StepTarget::Check(data) => {
                let check = host.parse_check(step.plugin(), data)?;
                host.validate_check(ctx, &check)?;
                report.target = Some(host.describe_check(ctx, &check));
                if self.mode == RunMode::DryRun {
                    return Ok(StepOutcome::Validated);
                }
                let passed = host.execute_check(ctx, &component, &check)?;
                Ok(if passed {
                    StepOutcome::Passed
                } else {
                    StepOutcome::Failed
                })
            }
        }
    }
}
