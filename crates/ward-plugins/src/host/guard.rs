//! Panic containment around plugin calls.
//!
//! A plugin must never take the host down with it. Every call into an
//! [`Executor`](crate::Executor) goes through these helpers, which convert an
//! unwinding panic into the error kind of the operation that was running.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

use super::HOST_TARGET;

/// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("non-string panic payload")
}

/// Runs `call`, mapping a panic to the error built by `on_panic`.
pub(crate) fn guard<T, E>(
    plugin: &str,
    operation: &'static str,
    call: impl FnOnce() -> Result<T, E>,
    on_panic: impl FnOnce(String) -> E,
) -> Result<T, E> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: HOST_TARGET,
                plugin,
                operation,
                panic = %message,
                "plugin panicked"
            );
            Err(on_panic(message))
        }
    }
}

/// Runs an infallible call, returning `None` when it panics.
pub(crate) fn guard_value<T>(
    plugin: &str,
    operation: &'static str,
    call: impl FnOnce() -> T,
) -> Option<T> {
    guard(plugin, operation, || Ok::<T, ()>(call()), |_| ()).ok()
}
