//! Veriforge agent
//!
//! Aggregates independently written plugins into one dispatch surface. Each plugin exposes a
//! bag of named async methods (and optionally a schema for them); the [`Agent`] owns the merged
//! method table, validates calls against the declared schemas and hands every invocation a
//! fresh [`Context`] through which plugins can reach their siblings.

pub mod agent;
pub mod context;
pub mod event_bus;
pub mod executor;
pub mod method;
pub mod plugin;

pub use agent::{Agent, AgentOptions};
pub use context::{AUTHORIZED_DID, Context};
pub use event_bus::EventBus;
pub use executor::{Executor, ExecutorExt};
pub use method::{MethodFn, MethodMap};
pub use plugin::AgentPlugin;
