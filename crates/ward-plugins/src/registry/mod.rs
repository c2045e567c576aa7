//! Plugin registry for executor storage and lookup.
//!
//! The [`PluginRegistry`] stores registered executors keyed by the name each
//! plugin reports about itself. Registration asks the plugin to identify
//! itself, validates the identity, and assigns a fresh [`PluginId`] so values
//! produced by a previous instance registered under the same name can be told
//! apart. Duplicate registrations for the same plugin name are rejected.
//!
//! Identifiers come from one process-wide counter, so no two registrations
//! share an identifier even when they live in different registries.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::contract::{Executor, PluginInfo};
use crate::error::PluginError;
use crate::host::guard::guard;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "ward_plugins::registry";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one registration of a plugin instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(u64);

impl PluginId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered executor together with the identity it reported.
#[derive(Clone)]
pub struct RegisteredPlugin {
    id: PluginId,
    info: PluginInfo,
    executor: Arc<dyn Executor>,
}

impl RegisteredPlugin {
    /// Returns the registration identifier.
    #[must_use]
    pub const fn id(&self) -> PluginId {
        self.id
    }

    /// Returns the identity reported at registration.
    #[must_use]
    pub const fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.info.name()
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }
}

impl std::fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Registry of available plugins.
///
/// # Example
///
/// ```
/// use ward_plugins::PluginRegistry;
///
/// let registry = PluginRegistry::new();
/// assert!(registry.is_empty());
/// assert!(registry.get("disk-checker").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, RegisteredPlugin>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifies and registers an executor.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MetadataUnavailable`] if the plugin cannot
    /// identify itself, or [`PluginError::Registration`] if the identity is
    /// blank or a plugin with the same name is already registered.
    pub fn register<E>(&mut self, executor: E) -> Result<PluginId, PluginError>
    where
        E: Executor + 'static,
    {
        self.register_shared(Arc::new(executor))
    }

    /// Registers an executor that is already shared.
    ///
    /// # Errors
    ///
    /// See [`PluginRegistry::register`].
    pub fn register_shared(&mut self, executor: Arc<dyn Executor>) -> Result<PluginId, PluginError> {
        let info = identify(executor.as_ref())?;
        validate_info(&info)?;
        let name = info.name().to_owned();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Registration {
                message: format!("plugin '{name}' is already registered"),
            });
        }

        let id = PluginId::next();
        debug!(
            target: REGISTRY_TARGET,
            plugin = %name,
            version = info.version(),
            %id,
            "registered plugin"
        );
        self.plugins.insert(name, RegisteredPlugin { id, info, executor });
        Ok(id)
    }

    /// Removes a plugin from the registry without running its teardown hook.
    /// [`PluginHost::unregister`](crate::PluginHost::unregister) also shuts
    /// the plugin down.
    pub fn remove(&mut self, name: &str) -> Option<RegisteredPlugin> {
        self.plugins.remove(name)
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(name)
    }

    /// Looks up a plugin by registration identifier.
    #[must_use]
    pub fn get_by_id(&self, id: PluginId) -> Option<&RegisteredPlugin> {
        self.plugins.values().find(|plugin| plugin.id == id)
    }

    /// Returns the identities of all registered plugins sorted by name.
    #[must_use]
    pub fn infos(&self) -> Vec<&PluginInfo> {
        let mut infos: Vec<&PluginInfo> = self.plugins.values().map(|p| &p.info).collect();
        infos.sort_by(|a, b| a.name().cmp(b.name()));
        infos
    }

    /// Returns the names of all registered plugins sorted alphabetically.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.infos().into_iter().map(PluginInfo::name).collect()
    }

    /// Removes and returns every registered plugin, sorted by name.
    pub fn drain(&mut self) -> Vec<RegisteredPlugin> {
        let mut plugins: Vec<RegisteredPlugin> = self.plugins.drain().map(|(_, p)| p).collect();
        plugins.sort_by(|a, b| a.name().cmp(b.name()));
        plugins
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

fn identify(executor: &dyn Executor) -> Result<PluginInfo, PluginError> {
    guard(
        "<unidentified>",
        "info",
        || executor.info(),
        |message| PluginError::MetadataUnavailable {
            message: format!("plugin panicked while identifying: {message}"),
        },
    )
    .inspect_err(|error| {
        warn!(
            target: REGISTRY_TARGET,
            error_kind = error.kind().as_str(),
            %error,
            "plugin could not identify itself"
        );
    })
}

fn validate_info(info: &PluginInfo) -> Result<(), PluginError> {
    if info.name().trim().is_empty() {
        return Err(PluginError::Registration {
            message: String::from("plugin name must not be empty"),
        });
    }
    if info.version().trim().is_empty() {
        return Err(PluginError::Registration {
            message: format!("plugin '{}' must report a version", info.name()),
        });
    }
    Ok(())
}
