//! Crate-level test doubles and BDD tests.
//!
//! [`FakePlugin`] is a scriptable executor. Its raw configuration selects the
//! behaviour under test:
//!
//! - component: `{ "id": <string> }`; the id `anonymous` yields a blank
//!   description and `explode` panics while describing;
//! - action: `{ "op": "record", "note": .. }`, `fail`, `panic`, or
//!   `{ "op": "wait", "millis": .. }`;
//! - check: `{ "outcome": "pass" | "fail" | "error" | "panic" }` or
//!   `{ "outcome": "wait", "millis": .. }`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::context::RequestContext;
use crate::contract::{
    Action, ActionService, Check, Component, ComponentService, Plugin, PluginInfo, RawConfig,
    decode_config,
};
use crate::error::PluginError;


#[derive(Debug, Deserialize)]
struct FakeComponent {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum FakeAction {
    Record { note: String },
    Fail,
    Panic,
    Wait { millis: u64 },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
enum FakeCheck {
    Pass,
    Fail,
    Error,
    Panic,
    Wait { millis: u64 },
}

/// Ordered record of side effects performed by a [`FakePlugin`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal lock").push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }
}

/// Scriptable executor used across the crate's tests.
pub(crate) struct FakePlugin {
    name: String,
    identity_available: bool,
    fail_shutdown: bool,
    journal: Journal,
    shutdowns: Arc<AtomicUsize>,
}

impl FakePlugin {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            identity_available: true,
            fail_shutdown: false,
            journal: Journal::default(),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn without_identity(mut self) -> Self {
        self.identity_available = false;
        self
    }

    pub(crate) fn with_failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub(crate) fn shutdown_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.shutdowns)
    }
}

impl Plugin for FakePlugin {
    fn info(&self) -> Result<PluginInfo, PluginError> {
        if self.identity_available {
            Ok(PluginInfo::new(self.name.as_str(), "0.1.0", "scriptable test plugin"))
        } else {
            Err(PluginError::MetadataUnavailable {
                message: String::from("identity withheld"),
            })
        }
    }

    fn shutdown(&self) -> Result<(), PluginError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Err(PluginError::Shutdown {
                plugin: self.name.clone(),
                message: String::from("connection pool refused to close"),
            });
        }
        Ok(())
    }
}

impl ComponentService for FakePlugin {
    fn parse_component(&self, data: &RawConfig) -> Result<Component, PluginError> {
        decode_config::<FakeComponent>(data)
            .map(Component::new)
            .map_err(|error| PluginError::InvalidComponentConfig {
                message: error.to_string(),
            })
    }

    fn validate_component(
        &self,
        _ctx: &RequestContext,
        component: &Component,
    ) -> Result<(), PluginError> {
        let target = component.downcast_for::<FakeComponent>(&self.name)?;
        if target.id.trim().is_empty() {
            return Err(PluginError::ComponentValidation {
                reason: String::from("id must not be empty"),
            });
        }
        Ok(())
    }

    fn describe_component(&self, _ctx: &RequestContext, component: &Component) -> String {
        match component.downcast_ref::<FakeComponent>() {
            Some(FakeComponent { id }) if id == "anonymous" => String::new(),
            Some(FakeComponent { id }) if id == "explode" => panic!("cannot describe {id}"),
            Some(FakeComponent { id }) => format!("fake component {id}"),
            None => String::from("fake component"),
        }
    }
}

impl ActionService for FakePlugin {
    fn parse_action(&self, data: &RawConfig) -> Result<Action, PluginError> {
        decode_config::<FakeAction>(data)
            .map(Action::new)
            .map_err(|error| PluginError::InvalidActionConfig {
                message: error.to_string(),
            })
    }

    fn validate_action(&self, _ctx: &RequestContext, action: &Action) -> Result<(), PluginError> {
        match action.downcast_for::<FakeAction>(&self.name)? {
            FakeAction::Record { note } if note.trim().is_empty() => {
                Err(PluginError::ActionValidation {
                    reason: String::from("note must not be empty"),
                })
            }
            _ => Ok(()),
        }
    }

    fn describe_action(&self, _ctx: &RequestContext, action: &Action) -> String {
        match action.downcast_ref::<FakeAction>() {
            Some(FakeAction::Record { note }) => format!("record '{note}'"),
            Some(other) => format!("{other:?}").to_lowercase(),
            None => String::from("fake action"),
        }
    }

    fn execute_action(
        &self,
        ctx: &RequestContext,
        component: &Component,
        action: &Action,
    ) -> Result<(), PluginError> {
        let target = component.downcast_for::<FakeComponent>(&self.name)?;
        match action.downcast_for::<FakeAction>(&self.name)? {
            FakeAction::Record { note } => {
                self.journal.push(format!("{}:{note}", target.id));
                Ok(())
            }
            FakeAction::Fail => Err(PluginError::ActionExecution {
                message: String::from("simulated failure"),
                source: None,
            }),
            FakeAction::Panic => panic!("simulated action panic"),
            FakeAction::Wait { millis } => {
                ctx.sleep(Duration::from_millis(*millis))
                    .map_err(PluginError::action_interrupted)?;
                self.journal.push(format!("{}:waited", target.id));
                Ok(())
            }
        }
    }

    fn parse_check(&self, data: &RawConfig) -> Result<Check, PluginError> {
        decode_config::<FakeCheck>(data)
            .map(Check::new)
            .map_err(|error| PluginError::InvalidCheckConfig {
                message: error.to_string(),
            })
    }

    fn validate_check(&self, _ctx: &RequestContext, check: &Check) -> Result<(), PluginError> {
        match check.downcast_for::<FakeCheck>(&self.name)? {
            FakeCheck::Wait { millis: 0 } => Err(PluginError::CheckValidation {
                reason: String::from("wait must be positive"),
            }),
            _ => Ok(()),
        }
    }

    fn describe_check(&self, _ctx: &RequestContext, check: &Check) -> String {
        check
            .downcast_ref::<FakeCheck>()
            .map_or_else(|| String::from("fake check"), |c| format!("expect {c:?}"))
    }

    fn execute_check(
        &self,
        ctx: &RequestContext,
        component: &Component,
        check: &Check,
    ) -> Result<bool, PluginError> {
        component.downcast_for::<FakeComponent>(&self.name)?;
        match check.downcast_for::<FakeCheck>(&self.name)? {
            FakeCheck::Pass => Ok(true),
            FakeCheck::Fail => Ok(false),
            FakeCheck::Error => Err(PluginError::CheckExecution {
                message: String::from("probe unreachable"),
                source: None,
            }),
            FakeCheck::Panic => panic!("simulated check panic"),
            FakeCheck::Wait { millis } => {
                ctx.sleep(Duration::from_millis(*millis))
                    .map_err(PluginError::check_interrupted)?;
                Ok(true)
            }
        }
    }
}

/// Builds raw configuration from a JSON object literal.
pub(crate) fn raw(value: serde_json::Value) -> RawConfig {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub(crate) fn component_config(id: &str) -> RawConfig {
    raw(json!({ "id": id }))
}

pub(crate) fn record_action(note: &str) -> RawConfig {
    raw(json!({ "op": "record", "note": note }))
}

pub(crate) fn check_outcome(outcome: &str) -> RawConfig {
    raw(json!({ "outcome": outcome }))
}
