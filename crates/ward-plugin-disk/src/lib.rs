//! Built-in `disk-checker` plugin.
//!
//! The plugin manages a directory. Its component configuration names the
//! directory:
//!
//! ```yaml
//! component: { path: /var/log/app }
//! ```
//!
//! Actions are selected by `kind`:
//!
//! - `ensure-dir` creates the directory and its parents;
//! - `prune` with `keep: <n>` deletes the oldest regular files so at most
//!   `n` remain.
//!
//! The check compares the usage of the filesystem holding the directory
//! against `max_used_percent`, `min_free_bytes`, or both.
//!
//! Disk usage comes from a [`UsageProbe`], so the check can be exercised
//! without a real filesystem of the right size.

mod probe;

#[cfg(test)]
mod tests;

use std::fs;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use ward_plugins::{
    Action, ActionService, Check, Component, ComponentService, Plugin, PluginError, PluginInfo,
    RawConfig, RequestContext, ValueKind, decode_config, fallback_description,
};

pub use self::probe::{DiskUsage, FsProbe, UsageProbe};

/// Registered plugin name.
pub const PLUGIN_NAME: &str = "disk-checker";

/// Reported plugin version.
pub const PLUGIN_VERSION: &str = "1.0.0";

const PLUGIN_DESCRIPTION: &str = "checks disk usage";

const DISK_TARGET: &str = "ward_plugin_disk";

// ---------------------------------------------------------------------------
// Plugin values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Directory {
    path: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum DiskAction {
    EnsureDir,
    Prune { keep: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct UsageLimits {
    #[serde(default)]
    max_used_percent: Option<u64>,
    #[serde(default)]
    min_free_bytes: Option<u64>,
}

/// Failures raised while touching the managed directory.
#[derive(Debug, Error)]
enum DiskPluginError {
    #[error("failed to create directory '{path}'")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list directory '{path}'")]
    ListDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove '{path}'")]
    Remove {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DiskPluginError> for PluginError {
    fn from(error: DiskPluginError) -> Self {
        let message = error.to_string();
        match error {
            DiskPluginError::CreateDir { source, .. }
            | DiskPluginError::ListDir { source, .. }
            | DiskPluginError::Remove { source, .. } => Self::action_io(message, source),
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Disk usage plugin over a [`UsageProbe`].
///
/// # Example
///
/// ```
/// use ward_plugin_disk::{DiskChecker, PLUGIN_NAME};
/// use ward_plugins::PluginRegistry;
///
/// let mut registry = PluginRegistry::new();
/// registry.register(DiskChecker::new()).expect("register disk-checker");
/// assert!(registry.get(PLUGIN_NAME).is_some());
/// ```
#[derive(Debug, Default)]
pub struct DiskChecker<P = FsProbe> {
    probe: P,
}

impl DiskChecker<FsProbe> {
    /// Creates a plugin that reads real filesystem usage.
    #[must_use]
    pub const fn new() -> Self {
        Self { probe: FsProbe }
    }
}

impl<P: UsageProbe> DiskChecker<P> {
    /// Creates a plugin over a custom probe.
    #[must_use]
    pub const fn with_probe(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: UsageProbe> Plugin for DiskChecker<P> {
    fn info(&self) -> Result<PluginInfo, PluginError> {
        Ok(PluginInfo::new(
            PLUGIN_NAME,
            PLUGIN_VERSION,
            PLUGIN_DESCRIPTION,
        ))
    }
}

impl<P: UsageProbe> ComponentService for DiskChecker<P> {
    fn parse_component(&self, data: &RawConfig) -> Result<Component, PluginError> {
        decode_config::<Directory>(data)
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
        let directory = component.downcast_for::<Directory>(PLUGIN_NAME)?;
        if !directory.path.is_absolute() {
            return Err(PluginError::ComponentValidation {
                reason: format!("path '{}' must be absolute", directory.path),
            });
        }
        Ok(())
    }

    fn describe_component(&self, _ctx: &RequestContext, component: &Component) -> String {
        component
            .downcast_ref::<Directory>()
            .map_or_else(
                || fallback_description(PLUGIN_NAME, ValueKind::Component),
                |directory| format!("directory {}", directory.path),
            )
    }
}

impl<P: UsageProbe> ActionService for DiskChecker<P> {
    fn parse_action(&self, data: &RawConfig) -> Result<Action, PluginError> {
        decode_config::<DiskAction>(data)
            .map(Action::new)
            .map_err(|error| PluginError::InvalidActionConfig {
                message: error.to_string(),
            })
    }

    fn validate_action(&self, _ctx: &RequestContext, action: &Action) -> Result<(), PluginError> {
        action.downcast_for::<DiskAction>(PLUGIN_NAME).map(drop)
    }

    fn describe_action(&self, _ctx: &RequestContext, action: &Action) -> String {
        match action.downcast_ref::<DiskAction>() {
            Some(DiskAction::EnsureDir) => String::from("ensure the directory exists"),
            Some(DiskAction::Prune { keep }) => format!("prune to the newest {keep} files"),
            None => fallback_description(PLUGIN_NAME, ValueKind::Action),
        }
    }

    fn execute_action(
        &self,
        ctx: &RequestContext,
        component: &Component,
        action: &Action,
    ) -> Result<(), PluginError> {
        let directory = component.downcast_for::<Directory>(PLUGIN_NAME)?;
        match action.downcast_for::<DiskAction>(PLUGIN_NAME)? {
            DiskAction::EnsureDir => ensure_dir(&directory.path),
            DiskAction::Prune { keep } => prune(ctx, &directory.path, *keep),
        }
    }

    fn parse_check(&self, data: &RawConfig) -> Result<Check, PluginError> {
        let limits = decode_config::<UsageLimits>(data).map_err(|error| {
            PluginError::InvalidCheckConfig {
                message: error.to_string(),
            }
        })?;
        if limits.max_used_percent.is_none() && limits.min_free_bytes.is_none() {
            return Err(PluginError::InvalidCheckConfig {
                message: String::from("declare max_used_percent, min_free_bytes, or both"),
            });
        }
        Ok(Check::new(limits))
    }

    fn validate_check(&self, _ctx: &RequestContext, check: &Check) -> Result<(), PluginError> {
        let limits = check.downcast_for::<UsageLimits>(PLUGIN_NAME)?;
        match limits.max_used_percent {
            Some(percent) if percent > 100 => Err(PluginError::CheckValidation {
                reason: format!("max_used_percent must be between 0 and 100, got {percent}"),
            }),
            _ => Ok(()),
        }
    }

    fn describe_check(&self, _ctx: &RequestContext, check: &Check) -> String {
        let Some(limits) = check.downcast_ref::<UsageLimits>() else {
            return fallback_description(PLUGIN_NAME, ValueKind::Check);
        };
        let parts: Vec<String> = [
            limits
                .max_used_percent
                .map(|percent| format!("at most {percent}% used")),
            limits
                .min_free_bytes
                .map(|bytes| format!("at least {bytes} bytes free")),
        ]
        .into_iter()
        .flatten()
        .collect();
        parts.join(" and ")
    }

    fn execute_check(
        &self,
        ctx: &RequestContext,
        component: &Component,
        check: &Check,
    ) -> Result<bool, PluginError> {
        let directory = component.downcast_for::<Directory>(PLUGIN_NAME)?;
        let limits = check.downcast_for::<UsageLimits>(PLUGIN_NAME)?;
        ctx.check().map_err(PluginError::check_interrupted)?;

        let usage = self.probe.usage(&directory.path).map_err(|source| {
            PluginError::check_io(format!("failed to read usage of '{}'", directory.path), source)
        })?;
        let within = within_limits(usage, limits)?;
        debug!(
            target: DISK_TARGET,
            path = %directory.path,
            total = usage.total(),
            available = usage.available(),
            within,
            "evaluated disk usage"
        );
        Ok(within)
    }
}

fn within_limits(usage: DiskUsage, limits: &UsageLimits) -> Result<bool, PluginError> {
    let percent_ok = match limits.max_used_percent {
        Some(percent) => {
            let bounded = u8::try_from(percent).map_err(|_| PluginError::CheckExecution {
                message: format!("max_used_percent {percent} is out of range"),
                source: None,
            })?;
            !usage.exceeds_percent(bounded)
        }
        None => true,
    };
    let free_ok = limits
        .min_free_bytes
        .is_none_or(|minimum| usage.available() >= minimum);
    Ok(percent_ok && free_ok)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

fn ensure_dir(path: &Utf8Path) -> Result<(), PluginError> {
    fs::create_dir_all(path).map_err(|source| DiskPluginError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;
    info!(target: DISK_TARGET, path = %path, "directory ensured");
    Ok(())
}

fn prune(ctx: &RequestContext, path: &Utf8Path, keep: usize) -> Result<(), PluginError> {
    let mut files = regular_files(path)?;
    if files.len() <= keep {
        return Ok(());
    }
    files.sort();
    let excess = files.len() - keep;
    for (_, file) in files.into_iter().take(excess) {
        ctx.check().map_err(PluginError::action_interrupted)?;
        fs::remove_file(&file).map_err(|source| DiskPluginError::Remove {
            path: file.clone(),
            source,
        })?;
        debug!(target: DISK_TARGET, file = %file, "pruned file");
    }
    info!(target: DISK_TARGET, path = %path, removed = excess, keep, "directory pruned");
    Ok(())
}

/// Lists the regular files in `path` with their modification times.
fn regular_files(path: &Utf8Path) -> Result<Vec<(SystemTime, Utf8PathBuf)>, DiskPluginError> {
    let list_error = |source| DiskPluginError::ListDir {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for item in path.read_dir_utf8().map_err(list_error)? {
        let entry = item.map_err(list_error)?;
        let metadata = entry.metadata().map_err(list_error)?;
        if metadata.is_file() {
            let modified = metadata.modified().map_err(list_error)?;
            files.push((modified, entry.into_path()));
        }
    }
    Ok(files)
}
