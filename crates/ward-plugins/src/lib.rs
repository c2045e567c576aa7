//! Plugin capability contract and host for Ward.
//!
//! The `ward-plugins` crate defines the contract through which Ward drives
//! configuration-management plugins, and the host that invokes them. A plugin
//! manages one kind of resource. It turns raw configuration into opaque
//! values, validates and describes those values, and executes actions and
//! checks against the resources they denote.
//!
//! # Architecture
//!
//! - [`contract`] holds the capability traits. [`Executor`] is the composite
//!   of [`Plugin`], [`ComponentService`], and [`ActionService`]; any type
//!   implementing all three is an executor.
//! - [`Component`], [`Action`], and [`Check`] are opaque to everyone but the
//!   plugin that produced them.
//! - [`PluginRegistry`] owns executors keyed by their reported name.
//! - [`PluginHost`] resolves plugins, tags every value with its producer, and
//!   contains plugin panics and timeouts.
//! - [`Runbook`] and [`RunbookRunner`] sequence steps through the host.
//! - [`RequestContext`] carries cancellation and a deadline into every
//!   plugin call.
//!
//! # Example
//!
//! ```rust
//! use ward_plugins::{
//!     Action, ActionService, Check, Component, ComponentService, Plugin, PluginError,
//!     PluginHost, PluginInfo, PluginRegistry, RawConfig, RequestContext,
//! };
//!
//! struct Noop;
//!
//! impl Plugin for Noop {
//!     fn info(&self) -> Result<PluginInfo, PluginError> {
//!         Ok(PluginInfo::new("noop", "1.0.0", "does nothing"))
//!     }
//! }
//!
//! impl ComponentService for Noop {
//!     fn parse_component(&self, _data: &RawConfig) -> Result<Component, PluginError> {
//!         Ok(Component::new(()))
//!     }
//!     fn validate_component(&self, _ctx: &RequestContext, _c: &Component) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!     fn describe_component(&self, _ctx: &RequestContext, _c: &Component) -> String {
//!         String::from("nothing")
//!     }
//! }
//!
//! impl ActionService for Noop {
//!     fn parse_action(&self, _data: &RawConfig) -> Result<Action, PluginError> {
//!         Ok(Action::new(()))
//!     }
//!     fn validate_action(&self, _ctx: &RequestContext, _a: &Action) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!     fn describe_action(&self, _ctx: &RequestContext, _a: &Action) -> String {
//!         String::from("do nothing")
//!     }
//!     fn execute_action(
//!         &self,
//!         _ctx: &RequestContext,
//!         _c: &Component,
//!         _a: &Action,
//!     ) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!     fn parse_check(&self, _data: &RawConfig) -> Result<Check, PluginError> {
//!         Ok(Check::new(()))
//!     }
//!     fn validate_check(&self, _ctx: &RequestContext, _c: &Check) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!     fn describe_check(&self, _ctx: &RequestContext, _c: &Check) -> String {
//!         String::from("always true")
//!     }
//!     fn execute_check(
//!         &self,
//!         _ctx: &RequestContext,
//!         _c: &Component,
//!         _k: &Check,
//!     ) -> Result<bool, PluginError> {
//!         Ok(true)
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry.register(Noop).expect("registration succeeds");
//! let host = PluginHost::new(registry);
//!
//! let ctx = RequestContext::background();
//! let component = host.parse_component("noop", &RawConfig::new()).expect("parse");
//! let check = host.parse_check("noop", &RawConfig::new()).expect("parse");
//! assert!(host.execute_check(&ctx, &component, &check).expect("check runs"));
//! ```

pub mod context;
pub mod contract;
pub mod error;
pub mod host;
pub mod registry;
pub mod runbook;

#[cfg(test)]
mod tests;

pub use self::context::{CancellationToken, Interrupted, RequestContext};
pub use self::contract::{
    Action, ActionService, Check, Component, ComponentService, Executor, OpaqueValue, Plugin,
    PluginInfo, RawConfig, decode_config,
};
pub use self::error::{ErrorKind, ExecutionFault, PluginError, ValueKind};
pub use self::host::{
    ActionHandle, CheckHandle, ComponentHandle, Handle, PluginHost, fallback_description,
};
pub use self::registry::{PluginId, PluginRegistry, RegisteredPlugin};
pub use self::runbook::{
    FailurePolicy, RunMode, RunReport, RunSummary, Runbook, RunbookError, RunbookRunner,
    RunbookStep, StepOutcome, StepReport, StepTarget,
};
