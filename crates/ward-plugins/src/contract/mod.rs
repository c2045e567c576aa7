//! Capability contract every plugin implements.
//!
//! A plugin participates by implementing three narrow capabilities:
//!
//! - [`Plugin`] reports identity and owns the teardown hook.
//! - [`ComponentService`] turns raw configuration into opaque [`Component`]
//!   values, validates them, and describes them.
//! - [`ActionService`] does the same for [`Action`] and [`Check`] values and
//!   executes them against a component.
//!
//! [`Executor`] is the composite of all three. It is implemented
//! automatically for every type providing the three facets, so a plugin with
//! a missing facet cannot be registered.
//!
//! Values returned by a plugin's `parse_*` methods must only ever be handed
//! back to that same plugin instance. The host enforces this through
//! owner-tagged handles; see [`crate::host`].

mod value;


use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::PluginError;

pub use self::value::{Action, Check, Component, OpaqueValue};

/// Untyped configuration handed to the `parse_*` methods, typically decoded
/// from YAML or JSON by the caller.
pub type RawConfig = serde_json::Map<String, serde_json::Value>;

/// Decodes raw configuration into a plugin's own typed representation.
///
/// # Errors
///
/// Returns the `serde_json` error describing the first missing key or
/// mistyped value.
///
/// # Example
///
/// ```
/// use serde::Deserialize;
/// use ward_plugins::{RawConfig, decode_config};
///
/// #[derive(Debug, Deserialize)]
/// struct Target { path: String }
///
/// let mut raw = RawConfig::new();
/// raw.insert("path".into(), "/var/log".into());
/// let target: Target = decode_config(&raw).expect("valid config");
/// assert_eq!(target.path, "/var/log");
///
/// let error = decode_config::<Target>(&RawConfig::new()).unwrap_err();
/// assert!(error.to_string().contains("missing field `path`"));
/// ```
pub fn decode_config<T: DeserializeOwned>(data: &RawConfig) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(data.clone()))
}

/// Identity reported by a plugin.
///
/// # Example
///
/// ```
/// use ward_plugins::PluginInfo;
///
/// let info = PluginInfo::new("disk-checker", "1.0.0", "checks disk usage");
/// assert_eq!(info.name(), "disk-checker");
/// assert_eq!(info.to_string(), "disk-checker 1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    name: String,
    version: String,
    description: String,
}

impl PluginInfo {
    /// Creates an identity record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }

    /// Returns the plugin name, unique within a registry.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns a brief explanation of the plugin's purpose.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }
}

impl std::fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Identity and lifecycle facet of a plugin.
pub trait Plugin {
    /// Returns the plugin's identity.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MetadataUnavailable`] when the plugin cannot
    /// identify itself. Such a plugin is unusable.
    fn info(&self) -> Result<PluginInfo, PluginError>;

    /// Releases resources held by the plugin. Called once by the host when
    /// the plugin is unregistered or the host shuts down.
    ///
    /// # Errors
    ///
    /// Returns any error raised while releasing resources.
    fn shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Component handling facet of a plugin.
pub trait ComponentService {
    /// Parses raw configuration into an opaque component.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidComponentConfig`] when required keys are
    /// missing or values have the wrong type.
    fn parse_component(&self, data: &RawConfig) -> Result<Component, PluginError>;

    /// Validates a component against the plugin's rules. Must not alter the
    /// state of any external system.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ComponentValidation`] with a human-readable
    /// reason.
    fn validate_component(
        &self,
        ctx: &RequestContext,
        component: &Component,
    ) -> Result<(), PluginError>;

    /// Describes a component for logs and diagnostics. Never fails; returns a
    /// generic placeholder when no better description is available.
    fn describe_component(&self, ctx: &RequestContext, component: &Component) -> String;
}

/// Action and check handling facet of a plugin.
pub trait ActionService {
    /// Parses raw configuration into an opaque action.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidActionConfig`] for malformed input.
    fn parse_action(&self, data: &RawConfig) -> Result<Action, PluginError>;

    /// Validates an action against the plugin's rules.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ActionValidation`] with a human-readable reason.
    fn validate_action(&self, ctx: &RequestContext, action: &Action) -> Result<(), PluginError>;

    /// Describes an action. Never fails.
    fn describe_action(&self, ctx: &RequestContext, action: &Action) -> String;

    /// Performs the action against the component. This is the only
    /// operation allowed to change external state.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ActionExecution`] when the operation fails,
    /// including when `ctx` is cancelled or its deadline elapses.
    fn execute_action(
        &self,
        ctx: &RequestContext,
        component: &Component,
        action: &Action,
    ) -> Result<(), PluginError>;

    /// Parses raw configuration into an opaque check.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidCheckConfig`] for malformed input.
    fn parse_check(&self, data: &RawConfig) -> Result<Check, PluginError>;

    /// Validates a check against the plugin's rules.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::CheckValidation`] with a human-readable reason.
    fn validate_check(&self, ctx: &RequestContext, check: &Check) -> Result<(), PluginError>;

    /// Describes a check. Never fails.
    fn describe_check(&self, ctx: &RequestContext, check: &Check) -> String;

    /// Evaluates the check against the component.
    ///
    /// `Ok(false)` means the evaluation ran and the check failed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::CheckExecution`] when the evaluation itself
    /// could not run, including when `ctx` is interrupted.
    fn execute_check(
        &self,
        ctx: &RequestContext,
        component: &Component,
        check: &Check,
    ) -> Result<bool, PluginError>;
}

/// Composite capability a plugin must fully implement to be registered.
pub trait Executor: Plugin + ComponentService + ActionService + Send + Sync {}

impl<T> Executor for T where T: Plugin + ComponentService + ActionService + Send + Sync {}
