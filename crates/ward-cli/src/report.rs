//! Human-readable rendering of runbook reports.

use std::io::{self, Write};

use ward_plugins::{PluginInfo, RunReport, StepOutcome, StepReport};

/// Writes one line per step followed by a summary line.
pub(crate) fn render_report(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    for step in report.steps() {
        write!(out, "[{}] {} ({})", step.outcome().label(), step.name(), step.plugin())?;
        if let Some(target) = describe_step(step) {
            write!(out, ": {target}")?;
        }
        if let StepOutcome::Errored(error) = step.outcome() {
            write!(out, ": {error}")?;
        }
        writeln!(out)?;
    }
    let summary = report.summary();
    writeln!(
        out,
        "summary: {} applied, {} passed, {} failed, {} validated, {} errored, {} skipped",
        summary.applied,
        summary.passed,
        summary.failed,
        summary.validated,
        summary.errored,
        summary.skipped
    )
}

/// Writes what each step would do, without outcome labels.
pub(crate) fn render_descriptions(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    for step in report.steps() {
        match (describe_step(step), step.outcome()) {
            (_, StepOutcome::Errored(error)) => {
                writeln!(out, "{} ({}): invalid: {error}", step.name(), step.plugin())?;
            }
            (Some(text), _) => writeln!(out, "{}: {text}", step.name())?,
            (None, _) => writeln!(out, "{}: not described", step.name())?,
        }
    }
    Ok(())
}

/// Writes one line per plugin identity.
pub(crate) fn render_plugins(out: &mut impl Write, plugins: &[&PluginInfo]) -> io::Result<()> {
    for info in plugins {
        writeln!(out, "{}\t{}", info, info.description())?;
    }
    Ok(())
}

fn describe_step(step: &StepReport) -> Option<String> {
    match (step.component_description(), step.target_description()) {
        (Some(component), Some(target)) => Some(format!("{component} -> {target}")),
        (Some(component), None) => Some(component.to_owned()),
        _ => None,
    }
}
