//! Unit tests for runbook loading and execution.

use std::io::Write as _;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::context::CancellationToken;
use crate::error::ErrorKind;
use crate::registry::PluginRegistry;
use crate::tests::{FakePlugin, Journal, check_outcome, component_config, raw, record_action};

struct RunnerFixture {
    host: PluginHost,
    journal: Journal,
}

#[fixture]
fn setup() -> RunnerFixture {
    let plugin = FakePlugin::named("fake");
    let journal = plugin.journal();
    let mut registry = PluginRegistry::new();
    registry.register(plugin).expect("register fake");
    RunnerFixture {
        host: PluginHost::new(registry),
        journal,
    }
}

fn action_step(name: &str, note: &str) -> RunbookStep {
    RunbookStep::new(
        name,
        "fake",
        component_config("web-1"),
        StepTarget::Action(record_action(note)),
    )
}

fn check_step(name: &str, outcome: &str) -> RunbookStep {
    RunbookStep::new(
        name,
        "fake",
        component_config("web-1"),
        StepTarget::Check(check_outcome(outcome)),
    )
}

fn labels(report: &RunReport) -> Vec<&'static str> {
    report
        .steps()
        .iter()
        .map(|step| step.outcome().label())
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

const SAMPLE: &str = r"
steps:
  - name: record deploy
    plugin: fake
    component: { id: web-1 }
    action: { op: record, note: deploy }
  - name: healthy
    plugin: fake
    component:
      id: web-1
    check:
      outcome: pass
";

#[test]
fn from_yaml_reads_steps_in_order() {
    let runbook = Runbook::from_yaml(SAMPLE).expect("parse runbook");
    let steps = runbook.steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].name(), "record deploy");
    assert_eq!(steps[0].plugin(), "fake");
    assert_eq!(steps[0].component(), &component_config("web-1"));
    assert_eq!(steps[0].target(), &StepTarget::Action(record_action("deploy")));
    assert_eq!(steps[1].target().label(), "check");
}

#[rstest]
#[case::both(
    "steps:\n  - name: s\n    plugin: fake\n    action: {op: fail}\n    check: {outcome: pass}\n",
    "not both"
)]
#[case::neither("steps:\n  - name: s\n    plugin: fake\n", "declare an action or a check")]
#[case::blank_name(
    "steps:\n  - name: ' '\n    plugin: fake\n    action: {op: fail}\n",
    "name must not be empty"
)]
#[case::blank_plugin(
    "steps:\n  - name: s\n    plugin: ''\n    action: {op: fail}\n",
    "plugin must not be empty"
)]
fn from_yaml_rejects_malformed_steps(#[case] text: &str, #[case] expected: &str) {
    let error = Runbook::from_yaml(text).expect_err("step should be rejected");
    assert!(matches!(error, RunbookError::Step { index: 1, .. }));
    assert!(
        error.to_string().contains(expected),
        "unexpected message: {error}"
    );
}

#[rstest]
#[case::no_steps("steps: []\n")]
fn from_yaml_rejects_empty_runbooks(#[case] text: &str) {
    let error = Runbook::from_yaml(text).expect_err("empty runbook");
    assert!(matches!(error, RunbookError::Empty));
}

#[rstest]
#[case::not_yaml("steps: [")]
#[case::unknown_field("steps: []\nextra: true\n")]
#[case::missing_steps("name: nothing\n")]
fn from_yaml_reports_parse_errors(#[case] text: &str) {
    let error = Runbook::from_yaml(text).expect_err("invalid document");
    assert!(matches!(error, RunbookError::Parse { .. }), "got {error:?}");
}

#[test]
fn from_path_reads_files() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(SAMPLE.as_bytes()).expect("write runbook");
    let runbook = Runbook::from_path(file.path()).expect("load runbook");
    assert_eq!(runbook.steps().len(), 2);
}

#[test]
fn from_path_reports_missing_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.yaml");
    let error = Runbook::from_path(&path).expect_err("missing file");
    assert!(matches!(error, RunbookError::Read { .. }));
    assert!(error.to_string().contains("absent.yaml"));
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[rstest]
fn run_applies_actions_and_evaluates_checks(setup: RunnerFixture) {
    let runbook = Runbook::new(vec![
        action_step("deploy", "deploy"),
        check_step("healthy", "pass"),
    ])
    .expect("runbook");
    let report = RunbookRunner::new(&setup.host).run(&RequestContext::background(), &runbook);

    assert_eq!(labels(&report), vec!["applied", "passed"]);
    assert!(report.succeeded());
    assert_eq!(setup.journal.entries(), vec!["web-1:deploy"]);
    let first = &report.steps()[0];
    assert_eq!(first.component_description(), Some("fake component web-1"));
    assert_eq!(first.target_description(), Some("record 'deploy'"));
}

#[rstest]
fn run_continues_after_failures_by_default(setup: RunnerFixture) {
    let runbook = Runbook::new(vec![
        check_step("unhealthy", "fail"),
        check_step("unreachable", "error"),
        action_step("deploy", "deploy"),
    ])
    .expect("runbook");
    let report = RunbookRunner::new(&setup.host).run(&RequestContext::background(), &runbook);

    assert_eq!(labels(&report), vec!["failed", "errored", "applied"]);
    assert!(!report.succeeded());
    let summary = report.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.applied, 1);
}

#[rstest]
fn fail_fast_skips_the_remaining_steps(setup: RunnerFixture) {
    let runbook = Runbook::new(vec![
        check_step("unhealthy", "fail"),
        action_step("deploy", "deploy"),
    ])
    .expect("runbook");
    let report = RunbookRunner::new(&setup.host)
        .with_policy(FailurePolicy::FailFast)
        .run(&RequestContext::background(), &runbook);

    assert_eq!(labels(&report), vec!["failed", "skipped"]);
    assert!(setup.journal.entries().is_empty());
}

#[rstest]
fn dry_run_validates_without_executing(setup: RunnerFixture) {
    let runbook = Runbook::new(vec![
        action_step("deploy", "deploy"),
        check_step("healthy", "panic"),
    ])
    .expect("runbook");
    let report = RunbookRunner::new(&setup.host)
        .with_mode(RunMode::DryRun)
        .run(&RequestContext::background(), &runbook);

    assert_eq!(labels(&report), vec!["validated", "validated"]);
    assert_eq!(report.summary().validated, 2);
    assert!(setup.journal.entries().is_empty());
}

#[rstest]
fn validation_errors_stop_the_step_before_execution(setup: RunnerFixture) {
    let runbook = Runbook::new(vec![action_step("blank note", " ")]).expect("runbook");
    let report = RunbookRunner::new(&setup.host).run(&RequestContext::background(), &runbook);

    let StepOutcome::Errored(error) = report.steps()[0].outcome() else {
        panic!("expected an error outcome");
    };
    assert_eq!(error.kind(), ErrorKind::ActionValidation);
    assert_eq!(
        report.steps()[0].component_description(),
        Some("fake component web-1")
    );
    assert_eq!(report.steps()[0].target_description(), None);
}

#[rstest]
fn unknown_plugins_error_the_step(setup: RunnerFixture) {
    let step = RunbookStep::new(
        "elsewhere",
        "missing",
        raw(json!({ "id": "x" })),
        StepTarget::Check(check_outcome("pass")),
    );
    let runbook = Runbook::new(vec![step]).expect("runbook");
    let report = RunbookRunner::new(&setup.host).run(&RequestContext::background(), &runbook);

    let StepOutcome::Errored(error) = report.steps()[0].outcome() else {
        panic!("expected an error outcome");
    };
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(report.steps()[0].component_description(), None);
}

#[rstest]
fn cancelled_runs_skip_every_step(setup: RunnerFixture) {
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RequestContext::with_token(token);
    let runbook = Runbook::new(vec![
        action_step("deploy", "deploy"),
        check_step("healthy", "pass"),
    ])
    .expect("runbook");
    let report = RunbookRunner::new(&setup.host).run(&ctx, &runbook);

    assert_eq!(labels(&report), vec!["skipped", "skipped"]);
    assert!(!report.succeeded());
    assert_eq!(report.summary().skipped, 2);
}

#[test]
fn empty_runbooks_cannot_be_built() {
    assert!(matches!(Runbook::new(Vec::new()), Err(RunbookError::Empty)));
}
