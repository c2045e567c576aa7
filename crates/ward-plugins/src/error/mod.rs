//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. The variants mirror the contract
//! taxonomy: configuration errors, validation errors, execution errors, and
//! the identity error, followed by the usage errors raised by the host itself.
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint.

use std::sync::Arc;

use thiserror::Error;

use crate::context::Interrupted;

/// The three opaque value kinds a plugin produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A resource descriptor produced by `parse_component`.
    Component,
    /// An operation descriptor produced by `parse_action`.
    Action,
    /// An evaluation descriptor produced by `parse_check`.
    Check,
}

impl ValueKind {
    /// Returns the canonical lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Action => "action",
            Self::Check => "check",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable classification of a [`PluginError`] for logging and policy
/// decisions.
///
/// # Example
///
/// ```
/// use ward_plugins::{ErrorKind, PluginError};
///
/// let error = PluginError::InvalidComponentConfig {
///     message: "missing field `path`".into(),
/// };
/// assert_eq!(error.kind(), ErrorKind::InvalidComponentConfig);
/// assert_eq!(error.kind().as_str(), "invalid_component_config");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The plugin could not report its identity.
    MetadataUnavailable,
    /// Raw component configuration was rejected.
    InvalidComponentConfig,
    /// Raw action configuration was rejected.
    InvalidActionConfig,
    /// Raw check configuration was rejected.
    InvalidCheckConfig,
    /// A parsed component failed plugin-specific validation.
    ComponentValidation,
    /// A parsed action failed plugin-specific validation.
    ActionValidation,
    /// A parsed check failed plugin-specific validation.
    CheckValidation,
    /// Performing an action failed.
    ActionExecution,
    /// Evaluating a check could not complete.
    CheckExecution,
    /// No plugin with the requested name or identity is registered.
    NotFound,
    /// A plugin could not be registered.
    Registration,
    /// An opaque value was handed to a plugin that did not produce it.
    ForeignValue,
    /// A plugin's teardown hook failed.
    Shutdown,
}

impl ErrorKind {
    /// Returns the canonical `snake_case` label used in structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MetadataUnavailable => "metadata_unavailable",
            Self::InvalidComponentConfig => "invalid_component_config",
            Self::InvalidActionConfig => "invalid_action_config",
            Self::InvalidCheckConfig => "invalid_check_config",
            Self::ComponentValidation => "component_validation",
            Self::ActionValidation => "action_validation",
            Self::CheckValidation => "check_validation",
            Self::ActionExecution => "action_execution",
            Self::CheckExecution => "check_execution",
            Self::NotFound => "not_found",
            Self::Registration => "registration",
            Self::ForeignValue => "foreign_value",
            Self::Shutdown => "shutdown",
        }
    }

    /// Returns `true` for errors caused by the caller misusing the host
    /// rather than by the plugin or its input.
    #[must_use]
    pub const fn is_usage(self) -> bool {
        matches!(self, Self::NotFound | Self::Registration | Self::ForeignValue)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause of an execution failure.
#[derive(Debug, Error)]
pub enum ExecutionFault {
    /// An I/O operation against the managed system failed.
    #[error("I/O failure: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The request context was cancelled or its deadline elapsed.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The plugin panicked and the host contained the unwind.
    #[error("plugin panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin could not report its own identity.
    #[error("plugin metadata unavailable: {message}")]
    MetadataUnavailable {
        /// Human-readable failure description.
        message: String,
    },

    /// The raw component configuration is missing keys or has the wrong shape.
    #[error("invalid component configuration: {message}")]
    InvalidComponentConfig {
        /// Description of the rejected input.
        message: String,
    },

    /// The raw action configuration is missing keys or has the wrong shape.
    #[error("invalid action configuration: {message}")]
    InvalidActionConfig {
        /// Description of the rejected input.
        message: String,
    },

    /// The raw check configuration is missing keys or has the wrong shape.
    #[error("invalid check configuration: {message}")]
    InvalidCheckConfig {
        /// Description of the rejected input.
        message: String,
    },

    /// A parsed component violates the plugin's rules.
    #[error("component validation failed: {reason}")]
    ComponentValidation {
        /// Human-readable reason.
        reason: String,
    },

    /// A parsed action violates the plugin's rules.
    #[error("action validation failed: {reason}")]
    ActionValidation {
        /// Human-readable reason.
        reason: String,
    },

    /// A parsed check violates the plugin's rules.
    #[error("check validation failed: {reason}")]
    CheckValidation {
        /// Human-readable reason.
        reason: String,
    },

    /// Performing the action against the managed system failed.
    #[error("action execution failed: {message}")]
    ActionExecution {
        /// Human-readable failure description.
        message: String,
        /// Optional underlying cause.
        #[source]
        source: Option<ExecutionFault>,
    },

    /// The check could not be evaluated. A check that evaluates to "fail" is
    /// reported as `Ok(false)`, never through this variant.
    #[error("check execution failed: {message}")]
    CheckExecution {
        /// Human-readable failure description.
        message: String,
        /// Optional underlying cause.
        #[source]
        source: Option<ExecutionFault>,
    },

    /// The requested plugin was not found in the registry.
    #[error("plugin '{name}' not found in registry")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The plugin could not be registered.
    #[error("registration error: {message}")]
    Registration {
        /// Description of the rejection.
        message: String,
    },

    /// An opaque value reached a plugin that did not produce it.
    #[error("{kind} rejected by plugin '{plugin}': {message}")]
    ForeignValue {
        /// Kind of the offending value.
        kind: ValueKind,
        /// Plugin the value was handed to.
        plugin: String,
        /// Description of the mismatch.
        message: String,
    },

    /// The plugin's teardown hook failed.
    #[error("plugin '{plugin}' failed to shut down: {message}")]
    Shutdown {
        /// Plugin name.
        plugin: String,
        /// Human-readable failure description.
        message: String,
    },
}

impl PluginError {
    /// Returns the stable classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MetadataUnavailable { .. } => ErrorKind::MetadataUnavailable,
            Self::InvalidComponentConfig { .. } => ErrorKind::InvalidComponentConfig,
            Self::InvalidActionConfig { .. } => ErrorKind::InvalidActionConfig,
            Self::InvalidCheckConfig { .. } => ErrorKind::InvalidCheckConfig,
            Self::ComponentValidation { .. } => ErrorKind::ComponentValidation,
            Self::ActionValidation { .. } => ErrorKind::ActionValidation,
            Self::CheckValidation { .. } => ErrorKind::CheckValidation,
            Self::ActionExecution { .. } => ErrorKind::ActionExecution,
            Self::CheckExecution { .. } => ErrorKind::CheckExecution,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Registration { .. } => ErrorKind::Registration,
            Self::ForeignValue { .. } => ErrorKind::ForeignValue,
            Self::Shutdown { .. } => ErrorKind::Shutdown,
        }
    }

    /// Returns the interruption behind an execution error, if any.
    #[must_use]
    pub const fn interruption(&self) -> Option<Interrupted> {
        match self {
            Self::ActionExecution {
                source: Some(ExecutionFault::Interrupted(interrupted)),
                ..
            }
            | Self::CheckExecution {
                source: Some(ExecutionFault::Interrupted(interrupted)),
                ..
            } => Some(*interrupted),
            _ => None,
        }
    }

    /// Returns `true` when the error reports a cancelled or timed-out request.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        self.interruption().is_some()
    }

    /// Builds an action execution error from an interrupted request.
    #[must_use]
    pub fn action_interrupted(interrupted: Interrupted) -> Self {
        Self::ActionExecution {
            message: interrupted.to_string(),
            source: Some(ExecutionFault::Interrupted(interrupted)),
        }
    }

    /// Builds a check execution error from an interrupted request.
    #[must_use]
    pub fn check_interrupted(interrupted: Interrupted) -> Self {
        Self::CheckExecution {
            message: interrupted.to_string(),
            source: Some(ExecutionFault::Interrupted(interrupted)),
        }
    }

    /// Builds an action execution error wrapping an I/O failure.
    #[must_use]
    pub fn action_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::ActionExecution {
            message: message.into(),
            source: Some(ExecutionFault::Io(Arc::new(source))),
        }
    }

    /// Builds a check execution error wrapping an I/O failure.
    #[must_use]
    pub fn check_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::CheckExecution {
            message: message.into(),
            source: Some(ExecutionFault::Io(Arc::new(source))),
        }
    }
}
