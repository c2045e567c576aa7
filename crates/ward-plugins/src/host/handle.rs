//! Owner-tagged handles wrapping opaque values at the host boundary.

use crate::contract::{Action, Check, Component, OpaqueValue};
use crate::registry::PluginId;

/// An opaque value tagged with the plugin instance that produced it.
///
/// Handles are only created by [`PluginHost`](crate::PluginHost) parse
/// methods, so a handle always names its true producer. The host consults
/// the tag before every call and refuses to hand a value to any other
/// plugin.
#[derive(Debug, Clone)]
pub struct Handle<V: OpaqueValue> {
    owner: PluginId,
    plugin: String,
    value: V,
}

/// Handle to a parsed component.
pub type ComponentHandle = Handle<Component>;
/// Handle to a parsed action.
pub type ActionHandle = Handle<Action>;
/// Handle to a parsed check.
pub type CheckHandle = Handle<Check>;

impl<V: OpaqueValue> Handle<V> {
    pub(crate) const fn new(owner: PluginId, plugin: String, value: V) -> Self {
        Self {
            owner,
            plugin,
            value,
        }
    }

    /// Returns the registration identifier of the producing plugin.
    #[must_use]
    pub const fn owner(&self) -> PluginId {
        self.owner
    }

    /// Returns the name of the producing plugin.
    #[must_use]
    pub const fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    pub(crate) const fn value(&self) -> &V {
        &self.value
    }
}
