//! Host-side invocation of registered plugins.
//!
//! The [`PluginHost`] is the public-facing API through which callers drive
//! plugins. It resolves a plugin from the [`PluginRegistry`], wraps every
//! opaque value the plugin produces in an owner-tagged [`Handle`], and
//! guarantees on each later call that the value goes back to the plugin
//! instance that produced it.
//!
//! Around every plugin call the host:
//!
//! - contains panics, mapping them to the error kind of the operation;
//! - bounds execute calls with the configured call timeout and refuses to
//!   start them when the request is already interrupted;
//! - substitutes a generic description when a plugin returns a blank one;
//! - logs failures with the plugin name and [`ErrorKind`](crate::ErrorKind).

pub(crate) mod guard;
mod handle;


use std::time::Duration;

use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::contract::{OpaqueValue, PluginInfo, RawConfig};
use crate::error::{ExecutionFault, PluginError, ValueKind};
use crate::registry::{PluginRegistry, RegisteredPlugin};

use self::guard::{guard, guard_value};
pub use self::handle::{ActionHandle, CheckHandle, ComponentHandle, Handle};

/// Tracing target for host operations.
pub(crate) const HOST_TARGET: &str = "ward_plugins::host";

/// Drives registered plugins on behalf of a caller.
///
/// # Example
///
/// ```
/// use ward_plugins::{PluginHost, PluginRegistry, RawConfig};
///
/// let host = PluginHost::new(PluginRegistry::new());
/// let error = host
///     .parse_component("disk-checker", &RawConfig::new())
///     .unwrap_err();
/// assert_eq!(error.kind(), ward_plugins::ErrorKind::NotFound);
/// ```
#[derive(Debug, Default)]
pub struct PluginHost {
    registry: PluginRegistry,
    call_timeout: Option<Duration>,
}

impl PluginHost {
    /// Creates a host over the given registry with no call timeout.
    #[must_use]
    pub const fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            call_timeout: None,
        }
    }

    /// Bounds every execute call by `timeout` in addition to the caller's
    /// own deadline.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Returns the configured call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Returns a reference to the plugin registry.
    #[must_use]
    pub const fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Returns a mutable reference to the plugin registry.
    #[must_use]
    pub const fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Asks a plugin for its current identity.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown plugins and
    /// [`PluginError::MetadataUnavailable`] when the plugin cannot answer.
    pub fn identify(&self, name: &str) -> Result<PluginInfo, PluginError> {
        let plugin = self.lookup(name)?;
        let result = guard(
            plugin.name(),
            "info",
            || plugin.executor().info(),
            |message| PluginError::MetadataUnavailable { message },
        );
        observe(plugin, "info", result)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parses raw component configuration with the named plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown plugins or the plugin's
    /// [`PluginError::InvalidComponentConfig`].
    pub fn parse_component(
        &self,
        plugin_name: &str,
        data: &RawConfig,
    ) -> Result<ComponentHandle, PluginError> {
        let plugin = self.lookup(plugin_name)?;
        let result = guard(
            plugin.name(),
            "parse_component",
            || plugin.executor().parse_component(data),
            |message| PluginError::InvalidComponentConfig {
                message: panicked(&message),
            },
        );
        observe(plugin, "parse_component", result).map(|value| tag(plugin, value))
    }

    /// Parses raw action configuration with the named plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown plugins or the plugin's
    /// [`PluginError::InvalidActionConfig`].
    pub fn parse_action(
        &self,
        plugin_name: &str,
        data: &RawConfig,
    ) -> Result<ActionHandle, PluginError> {
        let plugin = self.lookup(plugin_name)?;
        let result = guard(
            plugin.name(),
            "parse_action",
            || plugin.executor().parse_action(data),
            |message| PluginError::InvalidActionConfig {
                message: panicked(&message),
            },
        );
        observe(plugin, "parse_action", result).map(|value| tag(plugin, value))
    }

    /// Parses raw check configuration with the named plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown plugins or the plugin's
    /// [`PluginError::InvalidCheckConfig`].
    pub fn parse_check(
        &self,
        plugin_name: &str,
        data: &RawConfig,
    ) -> Result<CheckHandle, PluginError> {
        let plugin = self.lookup(plugin_name)?;
        let result = guard(
            plugin.name(),
            "parse_check",
            || plugin.executor().parse_check(data),
            |message| PluginError::InvalidCheckConfig {
                message: panicked(&message),
            },
        );
        observe(plugin, "parse_check", result).map(|value| tag(plugin, value))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validates a component with the plugin that produced it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when the producing plugin is no
    /// longer registered, or the plugin's
    /// [`PluginError::ComponentValidation`].
    pub fn validate_component(
        &self,
        ctx: &RequestContext,
        component: &ComponentHandle,
    ) -> Result<(), PluginError> {
        let plugin = self.owner_of(component)?;
        let result = guard(
            plugin.name(),
            "validate_component",
            || plugin.executor().validate_component(ctx, component.value()),
            |message| PluginError::ComponentValidation {
                reason: panicked(&message),
            },
        );
        observe(plugin, "validate_component", result)
    }

    /// Validates an action with the plugin that produced it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when the producing plugin is no
    /// longer registered, or the plugin's [`PluginError::ActionValidation`].
    pub fn validate_action(
        &self,
        ctx: &RequestContext,
        action: &ActionHandle,
    ) -> Result<(), PluginError> {
        let plugin = self.owner_of(action)?;
        let result = guard(
            plugin.name(),
            "validate_action",
            || plugin.executor().validate_action(ctx, action.value()),
            |message| PluginError::ActionValidation {
                reason: panicked(&message),
            },
        );
        observe(plugin, "validate_action", result)
    }

    /// Validates a check with the plugin that produced it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when the producing plugin is no
    /// longer registered, or the plugin's [`PluginError::CheckValidation`].
    pub fn validate_check(
        &self,
        ctx: &RequestContext,
        check: &CheckHandle,
    ) -> Result<(), PluginError> {
        let plugin = self.owner_of(check)?;
        let result = guard(
            plugin.name(),
            "validate_check",
            || plugin.executor().validate_check(ctx, check.value()),
            |message| PluginError::CheckValidation {
                reason: panicked(&message),
            },
        );
        observe(plugin, "validate_check", result)
    }

    // -----------------------------------------------------------------------
    // Description
    // -----------------------------------------------------------------------

    /// Describes a component. Never fails.
    #[must_use]
    pub fn describe_component(&self, ctx: &RequestContext, component: &ComponentHandle) -> String {
        self.describe(component, "describe_component", |plugin| {
            plugin
                .executor()
                .describe_component(ctx, component.value())
        })
    }

    /// Describes an action. Never fails.
    #[must_use]
    pub fn describe_action(&self, ctx: &RequestContext, action: &ActionHandle) -> String {
        self.describe(action, "describe_action", |plugin| {
            plugin.executor().describe_action(ctx, action.value())
        })
    }

    /// Describes a check. Never fails.
    #[must_use]
    pub fn describe_check(&self, ctx: &RequestContext, check: &CheckHandle) -> String {
        self.describe(check, "describe_check", |plugin| {
            plugin.executor().describe_check(ctx, check.value())
        })
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Performs an action against a component.
    ///
    /// Both handles must come from the same plugin instance. The call is
    /// bounded by the host's call timeout and is not started at all when
    /// `ctx` is already interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ForeignValue`] for mismatched handles,
    /// [`PluginError::NotFound`] when the producing plugin is gone, or
    /// [`PluginError::ActionExecution`] from the plugin or for an interrupted
    /// request.
    pub fn execute_action(
        &self,
        ctx: &RequestContext,
        component: &ComponentHandle,
        action: &ActionHandle,
    ) -> Result<(), PluginError> {
        let plugin = self.shared_owner(component, action)?;
        let call_ctx = self.call_context(ctx);
        let result = call_ctx
            .check()
            .map_err(PluginError::action_interrupted)
            .and_then(|()| {
                guard(
                    plugin.name(),
                    "execute_action",
                    || {
                        plugin
                            .executor()
                            .execute_action(&call_ctx, component.value(), action.value())
                    },
                    |message| PluginError::ActionExecution {
                        message: String::from("plugin panicked"),
                        source: Some(ExecutionFault::Panicked { message }),
                    },
                )
            });
        observe(plugin, "execute_action", result)
    }

    /// Evaluates a check against a component.
    ///
    /// `Ok(false)` reports a check that ran and failed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ForeignValue`] for mismatched handles,
    /// [`PluginError::NotFound`] when the producing plugin is gone, or
    /// [`PluginError::CheckExecution`] when the evaluation could not run.
    pub fn execute_check(
        &self,
        ctx: &RequestContext,
        component: &ComponentHandle,
        check: &CheckHandle,
    ) -> Result<bool, PluginError> {
        let plugin = self.shared_owner(component, check)?;
        let call_ctx = self.call_context(ctx);
        let result = call_ctx
            .check()
            .map_err(PluginError::check_interrupted)
            .and_then(|()| {
                guard(
                    plugin.name(),
                    "execute_check",
                    || {
                        plugin
                            .executor()
                            .execute_check(&call_ctx, component.value(), check.value())
                    },
                    |message| PluginError::CheckExecution {
                        message: String::from("plugin panicked"),
                        source: Some(ExecutionFault::Panicked { message }),
                    },
                )
            });
        observe(plugin, "execute_check", result)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Removes a plugin and runs its teardown hook.
    ///
    /// Handles produced by the plugin become unusable.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown plugins or
    /// [`PluginError::Shutdown`] when the teardown hook fails. The plugin is
    /// removed in both cases.
    pub fn unregister(&mut self, name: &str) -> Result<PluginInfo, PluginError> {
        let plugin = self
            .registry
            .remove(name)
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_owned(),
            })?;
        shutdown_plugin(&plugin)?;
        Ok(plugin.info().clone())
    }

    /// Shuts down every registered plugin, returning the teardown failures.
    ///
    /// Failures do not stop the remaining plugins from being shut down.
    #[must_use]
    pub fn shutdown(mut self) -> Vec<PluginError> {
        self.registry
            .drain()
            .iter()
            .filter_map(|plugin| shutdown_plugin(plugin).err())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lookup(&self, name: &str) -> Result<&RegisteredPlugin, PluginError> {
        self.registry.get(name).ok_or_else(|| PluginError::NotFound {
            name: name.to_owned(),
        })
    }

    fn owner_of<V: OpaqueValue>(&self, handle: &Handle<V>) -> Result<&RegisteredPlugin, PluginError> {
        self.registry
            .get_by_id(handle.owner())
            .ok_or_else(|| PluginError::NotFound {
                name: handle.plugin().to_owned(),
            })
    }

    fn shared_owner<V: OpaqueValue>(
        &self,
        component: &ComponentHandle,
        other: &Handle<V>,
    ) -> Result<&RegisteredPlugin, PluginError> {
        if component.owner() != other.owner() {
            let error = PluginError::ForeignValue {
                kind: V::KIND,
                plugin: component.plugin().to_owned(),
                message: format!(
                    "{} came from plugin '{}' {} but the component from {}",
                    V::KIND,
                    other.plugin(),
                    other.owner(),
                    component.owner()
                ),
            };
            warn!(
                target: HOST_TARGET,
                plugin = component.plugin(),
                error_kind = error.kind().as_str(),
                %error,
                "refusing to mix values from different plugins"
            );
            return Err(error);
        }
        self.owner_of(component)
    }

    fn call_context(&self, ctx: &RequestContext) -> RequestContext {
        self.call_timeout
            .map_or_else(|| ctx.clone(), |timeout| ctx.child_with_timeout(timeout))
    }

    fn describe<V: OpaqueValue>(
        &self,
        handle: &Handle<V>,
        operation: &'static str,
        call: impl FnOnce(&RegisteredPlugin) -> String,
    ) -> String {
        let description = self
            .owner_of(handle)
            .ok()
            .and_then(|plugin| guard_value(plugin.name(), operation, || call(plugin)));
        match description {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                debug!(
                    target: HOST_TARGET,
                    plugin = handle.plugin(),
                    operation,
                    "substituting generic description"
                );
                fallback_description(handle.plugin(), V::KIND)
            }
        }
    }
}

/// Generic description used when a plugin cannot describe a value.
#[must_use]
pub fn fallback_description(plugin: &str, kind: ValueKind) -> String {
    format!("{plugin} {kind}")
}

fn tag<V: OpaqueValue>(plugin: &RegisteredPlugin, value: V) -> Handle<V> {
    Handle::new(plugin.id(), plugin.name().to_owned(), value)
}

fn panicked(message: &str) -> String {
    format!("plugin panicked: {message}")
}

fn observe<T>(
    plugin: &RegisteredPlugin,
    operation: &'static str,
    result: Result<T, PluginError>,
) -> Result<T, PluginError> {
    result.inspect_err(|error| {
        warn!(
            target: HOST_TARGET,
            plugin = plugin.name(),
            plugin_id = plugin.id().get(),
            operation,
            error_kind = error.kind().as_str(),
            %error,
            "plugin operation failed"
        );
    })
}

fn shutdown_plugin(plugin: &RegisteredPlugin) -> Result<(), PluginError> {
    debug!(target: HOST_TARGET, plugin = plugin.name(), "shutting down plugin");
    guard(
        plugin.name(),
        "shutdown",
        || plugin.executor().shutdown(),
        |message| PluginError::Shutdown {
            plugin: plugin.name().to_owned(),
            message: panicked(&message),
        },
    )
    .map_err(|error| match error {
        PluginError::Shutdown { .. } => error,
        other => PluginError::Shutdown {
            plugin: plugin.name().to_owned(),
            message: other.to_string(),
        },
    })
    .inspect_err(|error| {
        warn!(
            target: HOST_TARGET,
            plugin = plugin.name(),
            error_kind = error.kind().as_str(),
            %error,
            "plugin teardown failed"
        );
    })
}
