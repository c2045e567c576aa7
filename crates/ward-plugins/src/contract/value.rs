//! Opaque, plugin-defined values.
//!
//! [`Component`], [`Action`], and [`Check`] erase the concrete type a plugin
//! chose for its parsed configuration. Only the producing plugin knows that
//! type and recovers it with `downcast_ref` or `downcast_for`; the host treats
//! the values as tokens and never inspects them.

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::error::{PluginError, ValueKind};

/// Common surface of the three opaque value kinds.
pub trait OpaqueValue: Clone + Send + Sync + 'static {
    /// Kind reported in errors and logs.
    const KIND: ValueKind;
}

/// Shared storage behind every opaque value.
#[derive(Clone)]
struct Erased {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Erased {
    fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    fn downcast_for<T: Any>(&self, kind: ValueKind, plugin: &str) -> Result<&T, PluginError> {
        self.downcast_ref::<T>()
            .ok_or_else(|| PluginError::ForeignValue {
                kind,
                plugin: plugin.to_owned(),
                message: format!(
                    "expected payload `{}`, found `{}`",
                    type_name::<T>(),
                    self.type_name
                ),
            })
    }
}

macro_rules! opaque_value {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Erased);

        impl $name {
            /// Erases a plugin-defined value.
            #[must_use]
            pub fn new<T: Any + Send + Sync>(value: T) -> Self {
                Self(Erased::new(value))
            }

            /// Recovers the plugin-defined value when `T` matches.
            #[must_use]
            pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
                self.0.downcast_ref::<T>()
            }

            /// Recovers the plugin-defined value on behalf of `plugin`.
            ///
            /// # Errors
            ///
            /// Returns [`PluginError::ForeignValue`] when the value was not
            /// produced with type `T`.
            pub fn downcast_for<T: Any>(&self, plugin: &str) -> Result<&T, PluginError> {
                self.0.downcast_for::<T>($kind, plugin)
            }

            /// Returns the Rust type name of the erased payload.
            #[must_use]
            pub const fn type_name(&self) -> &'static str {
                self.0.type_name
            }
        }

        impl OpaqueValue for $name {
            const KIND: ValueKind = $kind;
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("type", &self.0.type_name)
                    .finish_non_exhaustive()
            }
        }
    };
}

opaque_value!(
    /// Opaque resource descriptor such as "a directory" or "a database".
    ///
    /// # Example
    ///
    /// ```
    /// use ward_plugins::Component;
    ///
    /// struct Directory { path: String }
    ///
    /// let component = Component::new(Directory { path: "/var/log".into() });
    /// let directory = component.downcast_ref::<Directory>().expect("same type");
    /// assert_eq!(directory.path, "/var/log");
    /// assert!(component.downcast_ref::<u32>().is_none());
    /// ```
    Component,
    ValueKind::Component
);

opaque_value!(
    /// Opaque descriptor of an operation with side effects.
    Action,
    ValueKind::Action
);

opaque_value!(
    /// Opaque descriptor of an evaluation with a boolean outcome.
    Check,
    ValueKind::Check
);
