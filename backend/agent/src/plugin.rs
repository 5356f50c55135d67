//! Plugin contract
//!
//! The boundary every capability module implements to be composed into an agent.

use std::sync::Arc;

use async_trait::async_trait;
use veriforge_core::AgentEvent;
use veriforge_schema::PluginSchema;

use crate::context::Context;
use crate::method::MethodMap;

#[async_trait]
pub trait AgentPlugin: Send + Sync + 'static {
    /// Human-readable name for logs and duplicate-method errors.
    fn name(&self) -> &str;

    /// The methods this plugin contributes. Called once, at agent construction.
    fn methods(self: Arc<Self>) -> MethodMap;

    /// Optional contract for the methods above.
    fn schema(&self) -> Option<PluginSchema> {
        None
    }

    /// Event types this plugin wants delivered to [`AgentPlugin::on_event`].
    fn event_types(&self) -> Vec<String> {
        Vec::new()
    }

    async fn on_event(&self, _event: &AgentEvent, _ctx: &Context) -> anyhow::Result<()> {
        Ok(())
    }
}
