//! Unit and behavioural tests for the disk-checker plugin.


use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;
use ward_plugins::{
    Action, ActionService, CancellationToken, Check, Component, ComponentService, ErrorKind,
    ExecutionFault, Plugin, RawConfig, RequestContext,
};

use crate::{DiskChecker, DiskUsage, PLUGIN_NAME, PLUGIN_VERSION, UsageProbe};

mock! {
    Probe {}
    impl UsageProbe for Probe {
        fn usage(&self, path: &Utf8Path) -> io::Result<DiskUsage>;
    }
}

/// Builds a `MockProbe` that reports `usage` once.
fn probe_reporting(usage: DiskUsage) -> MockProbe {
    let mut probe = MockProbe::new();
    probe
        .expect_usage()
        .once()
        .return_once(move |_path| Ok(usage));
    probe
}

/// Builds a `MockProbe` that must never be consulted.
fn probe_unused() -> MockProbe {
    MockProbe::new()
}

pub(super) fn raw(value: Value) -> RawConfig {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub(super) fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
}

#[fixture]
fn ctx() -> RequestContext {
    RequestContext::background()
}

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("temporary directory")
}

// ---------------------------------------------------------------------------
// Identity and parsing
// ---------------------------------------------------------------------------

#[test]
fn info_reports_identity() {
    let info = DiskChecker::new().info().expect("info");
    assert_eq!(info.name(), PLUGIN_NAME);
    assert_eq!(info.version(), PLUGIN_VERSION);
    assert_eq!(info.description(), "checks disk usage");
}

#[rstest]
#[case::missing_path(json!({}))]
#[case::non_string_path(json!({ "path": 7 }))]
#[case::unknown_key(json!({ "path": "/tmp", "mode": "0755" }))]
fn parse_component_rejects_bad_config(#[case] data: Value) {
    let error = DiskChecker::with_probe(probe_unused())
        .parse_component(&raw(data))
        .expect_err("component should be rejected");
    assert_eq!(error.kind(), ErrorKind::InvalidComponentConfig);
}

#[rstest]
fn relative_paths_fail_validation(ctx: RequestContext) {
    let plugin = DiskChecker::with_probe(probe_unused());
    let component = plugin
        .parse_component(&raw(json!({ "path": "var/log" })))
        .expect("parse");
    let error = plugin
        .validate_component(&ctx, &component)
        .expect_err("relative path");
    assert_eq!(error.kind(), ErrorKind::ComponentValidation);
    assert!(error.to_string().contains("must be absolute"));
}

#[rstest]
fn component_descriptions_name_the_directory(ctx: RequestContext) {
    let plugin = DiskChecker::with_probe(probe_unused());
    let component = plugin
        .parse_component(&raw(json!({ "path": "/var/log" })))
        .expect("parse");
    plugin
        .validate_component(&ctx, &component)
        .expect("absolute path is valid");
    assert_eq!(
        plugin.describe_component(&ctx, &component),
        "directory /var/log"
    );
}

#[rstest]
#[case::unknown_kind(json!({ "kind": "defragment" }))]
#[case::missing_kind(json!({ "keep": 3 }))]
#[case::missing_keep(json!({ "kind": "prune" }))]
#[case::negative_keep(json!({ "kind": "prune", "keep": -1 }))]
fn parse_action_rejects_bad_config(#[case] data: Value) {
    let error = DiskChecker::with_probe(probe_unused())
        .parse_action(&raw(data))
        .expect_err("action should be rejected");
    assert_eq!(error.kind(), ErrorKind::InvalidActionConfig);
}

#[rstest]
#[case::ensure_dir(json!({ "kind": "ensure-dir" }), "ensure the directory exists")]
#[case::prune(json!({ "kind": "prune", "keep": 2 }), "prune to the newest 2 files")]
fn actions_describe_themselves(ctx: RequestContext, #[case] data: Value, #[case] expected: &str) {
    let plugin = DiskChecker::with_probe(probe_unused());
    let action = plugin.parse_action(&raw(data)).expect("parse");
    plugin.validate_action(&ctx, &action).expect("valid");
    assert_eq!(plugin.describe_action(&ctx, &action), expected);
}

#[rstest]
#[case::no_limits(json!({}))]
#[case::wrong_type(json!({ "max_used_percent": "ninety" }))]
#[case::unknown_key(json!({ "max_inodes": 10 }))]
fn parse_check_rejects_bad_config(#[case] data: Value) {
    let error = DiskChecker::with_probe(probe_unused())
        .parse_check(&raw(data))
        .expect_err("check should be rejected");
    assert_eq!(error.kind(), ErrorKind::InvalidCheckConfig);
}

#[rstest]
fn percent_above_one_hundred_fails_validation(ctx: RequestContext) {
    let plugin = DiskChecker::with_probe(probe_unused());
    let check = plugin
        .parse_check(&raw(json!({ "max_used_percent": 120 })))
        .expect("parse");
    let error = plugin
        .validate_check(&ctx, &check)
        .expect_err("out of range");
    assert_eq!(error.kind(), ErrorKind::CheckValidation);
}

#[rstest]
#[case::percent(json!({ "max_used_percent": 90 }), "at most 90% used")]
#[case::free(json!({ "min_free_bytes": 1024 }), "at least 1024 bytes free")]
#[case::both(
    json!({ "max_used_percent": 90, "min_free_bytes": 1024 }),
    "at most 90% used and at least 1024 bytes free"
)]
fn checks_describe_their_limits(ctx: RequestContext, #[case] data: Value, #[case] expected: &str) {
    let plugin = DiskChecker::with_probe(probe_unused());
    let check = plugin.parse_check(&raw(data)).expect("parse");
    assert_eq!(plugin.describe_check(&ctx, &check), expected);
}

#[rstest]
fn foreign_values_get_placeholder_descriptions(ctx: RequestContext) {
    let plugin = DiskChecker::with_probe(probe_unused());
    assert_eq!(
        plugin.describe_component(&ctx, &Component::new(1_u8)),
        "disk-checker component"
    );
    assert_eq!(
        plugin.describe_action(&ctx, &Action::new(1_u8)),
        "disk-checker action"
    );
    assert_eq!(
        plugin.describe_check(&ctx, &Check::new(1_u8)),
        "disk-checker check"
    );
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[rstest]
#[case::over_threshold(DiskUsage::new(100, 5), json!({ "max_used_percent": 90 }), false)]
#[case::at_threshold(DiskUsage::new(100, 10), json!({ "max_used_percent": 90 }), true)]
#[case::under_threshold(DiskUsage::new(1000, 500), json!({ "max_used_percent": 90 }), true)]
#[case::too_little_free(DiskUsage::new(1000, 100), json!({ "min_free_bytes": 512 }), false)]
#[case::enough_free(DiskUsage::new(1000, 600), json!({ "min_free_bytes": 512 }), true)]
#[case::both_must_hold(
    DiskUsage::new(1000, 200),
    json!({ "max_used_percent": 90, "min_free_bytes": 512 }),
    false
)]
#[case::empty_filesystem(DiskUsage::new(0, 0), json!({ "max_used_percent": 0 }), true)]
fn check_compares_usage_with_limits(
    ctx: RequestContext,
    #[case] usage: DiskUsage,
    #[case] limits: Value,
    #[case] expected: bool,
) {
    let plugin = DiskChecker::with_probe(probe_reporting(usage));
    let component = plugin
        .parse_component(&raw(json!({ "path": "/srv" })))
        .expect("parse component");
    let check = plugin.parse_check(&raw(limits)).expect("parse check");
    let passed = plugin
        .execute_check(&ctx, &component, &check)
        .expect("check evaluates");
    assert_eq!(passed, expected);
}

#[rstest]
fn probe_failures_are_check_execution_errors(ctx: RequestContext) {
    let mut probe = MockProbe::new();
    probe
        .expect_usage()
        .once()
        .return_once(|_path| Err(io::Error::new(io::ErrorKind::NotFound, "no such mount")));
    let plugin = DiskChecker::with_probe(probe);
    let component = plugin
        .parse_component(&raw(json!({ "path": "/missing" })))
        .expect("parse component");
    let check = plugin
        .parse_check(&raw(json!({ "max_used_percent": 90 })))
        .expect("parse check");
    let error = plugin
        .execute_check(&ctx, &component, &check)
        .expect_err("probe fails");
    assert_eq!(error.kind(), ErrorKind::CheckExecution);
    assert!(matches!(
        error,
        ward_plugins::PluginError::CheckExecution {
            source: Some(ExecutionFault::Io(_)),
            ..
        }
    ));
}

#[test]
fn cancelled_checks_do_not_probe() {
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RequestContext::with_token(token);
    let plugin = DiskChecker::with_probe(probe_unused());
    let component = plugin
        .parse_component(&raw(json!({ "path": "/srv" })))
        .expect("parse component");
    let check = plugin
        .parse_check(&raw(json!({ "min_free_bytes": 1 })))
        .expect("parse check");
    let error = plugin
        .execute_check(&ctx, &component, &check)
        .expect_err("cancelled");
    assert!(error.is_interrupted());
}

#[rstest]
fn real_probe_reads_the_temp_filesystem(ctx: RequestContext, temp_dir: TempDir) {
    let plugin = DiskChecker::new();
    let component = plugin
        .parse_component(&raw(json!({ "path": utf8_dir(&temp_dir).as_str() })))
        .expect("parse component");
    let check = plugin
        .parse_check(&raw(json!({ "max_used_percent": 100 })))
        .expect("parse check");
    assert!(
        plugin
            .execute_check(&ctx, &component, &check)
            .expect("check evaluates")
    );
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

fn run_action(
    ctx: &RequestContext,
    path: &Utf8Path,
    action: Value,
) -> Result<(), ward_plugins::PluginError> {
    let plugin = DiskChecker::with_probe(probe_unused());
    let component = plugin
        .parse_component(&raw(json!({ "path": path.as_str() })))
        .expect("parse component");
    let parsed = plugin.parse_action(&raw(action)).expect("parse action");
    plugin.execute_action(ctx, &component, &parsed)
}

pub(super) fn populate(dir: &Utf8Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), name).expect("write file");
    }
}

pub(super) fn remaining_files(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("entry")
                .file_name()
                .into_string()
                .expect("utf-8 name")
        })
        .collect();
    names.sort();
    names
}

#[rstest]
fn ensure_dir_creates_nested_directories(ctx: RequestContext, temp_dir: TempDir) {
    let target = utf8_dir(&temp_dir).join("a/b/c");
    run_action(&ctx, &target, json!({ "kind": "ensure-dir" })).expect("ensure-dir");
    assert!(target.is_dir());
    run_action(&ctx, &target, json!({ "kind": "ensure-dir" })).expect("idempotent");
}

#[rstest]
fn prune_keeps_the_requested_number_of_files(ctx: RequestContext, temp_dir: TempDir) {
    let dir = utf8_dir(&temp_dir);
    populate(&dir, &["one.log", "two.log", "three.log"]);
    fs::create_dir(dir.join("archive")).expect("subdirectory");

    run_action(&ctx, &dir, json!({ "kind": "prune", "keep": 1 })).expect("prune");

    let remaining = remaining_files(&dir);
    assert_eq!(remaining.len(), 2, "remaining: {remaining:?}");
    assert!(remaining.contains(&String::from("archive")));
}

#[rstest]
fn prune_is_a_no_op_below_the_limit(ctx: RequestContext, temp_dir: TempDir) {
    let dir = utf8_dir(&temp_dir);
    populate(&dir, &["one.log", "two.log"]);
    run_action(&ctx, &dir, json!({ "kind": "prune", "keep": 5 })).expect("prune");
    assert_eq!(remaining_files(&dir), vec!["one.log", "two.log"]);
}

#[rstest]
fn prune_reports_missing_directories(ctx: RequestContext, temp_dir: TempDir) {
    let dir = utf8_dir(&temp_dir).join("absent");
    let error = run_action(&ctx, &dir, json!({ "kind": "prune", "keep": 0 }))
        .expect_err("missing directory");
    assert_eq!(error.kind(), ErrorKind::ActionExecution);
    assert!(error.to_string().contains("failed to list directory"));
}

#[rstest]
fn cancelled_prune_deletes_nothing(temp_dir: TempDir) {
    let dir = utf8_dir(&temp_dir);
    populate(&dir, &["one.log", "two.log"]);
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RequestContext::with_token(token);

    let error = run_action(&ctx, &dir, json!({ "kind": "prune", "keep": 0 }))
        .expect_err("cancelled");
    assert!(error.is_interrupted());
    assert_eq!(remaining_files(&dir).len(), 2);
}
