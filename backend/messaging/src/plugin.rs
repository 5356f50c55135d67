//! Message handler plugin.
//!
//! Exposes `handleMessage`: runs the raw payload through the handler chain, announces the
//! classified message as `validatedMessage`, optionally stores it through the sibling
//! `dataStoreSaveMessage` method and announces `savedMessage`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use veriforge_agent::{AgentPlugin, Context, Executor, ExecutorExt, MethodMap};
use veriforge_core::{AgentError, Message, MetaData, event_types};
use veriforge_schema::{MethodSchema, PluginSchema};

use crate::chain::MessageHandlerChain;

pub const HANDLE_MESSAGE: &str = "handleMessage";
pub const SAVE_MESSAGE: &str = "dataStoreSaveMessage";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleMessageArgs {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta_data: Vec<MetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<bool>,
}

impl HandleMessageArgs {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into(), ..Default::default() }
    }

    pub fn with_meta(mut self, meta: MetaData) -> Self {
        self.meta_data.push(meta);
        self
    }

    pub fn save(mut self, save: bool) -> Self {
        self.save = Some(save);
        self
    }
}

pub struct MessageHandlerPlugin {
    chain: MessageHandlerChain,
    save_by_default: bool,
}

impl MessageHandlerPlugin {
    pub fn new(chain: MessageHandlerChain) -> Self {
        Self { chain, save_by_default: false }
    }

    pub fn with_save_by_default(mut self, save: bool) -> Self {
        self.save_by_default = save;
        self
    }

    pub async fn handle_message(
        &self,
        args: HandleMessageArgs,
        ctx: &Context,
    ) -> anyhow::Result<Message> {
        let mut message = Message::new(args.raw, args.meta_data);
        self.chain.handle(&mut message, ctx).await?;
        if !message.is_valid() {
            return Err(AgentError::UnsupportedMessageType.into());
        }

        let agent = ctx.agent();
        agent
            .emit(event_types::VALIDATED_MESSAGE, serde_json::to_value(&message)?)
            .await;

        if args.save.unwrap_or(self.save_by_default) {
            let id = agent.execute(SAVE_MESSAGE, json!({ "message": message })).await?;
            debug!("[Messaging] Saved message {} as {}", message.id, id);
            agent
                .emit(event_types::SAVED_MESSAGE, serde_json::to_value(&message)?)
                .await;
        }

        info!(
            "[Messaging] Handled {} message {} ({} metadata entries)",
            message.message_type,
            message.id,
            message.meta_data.len()
        );
        Ok(message)
    }
}

#[async_trait]
impl AgentPlugin for MessageHandlerPlugin {
    fn name(&self) -> &str {
        "MessageHandler"
    }

    fn methods(self: Arc<Self>) -> MethodMap {
        MethodMap::new().bind(&self, HANDLE_MESSAGE, |this, args: HandleMessageArgs, ctx| {
            async move { this.handle_message(args, &ctx).await }
        })
    }

    fn schema(&self) -> Option<PluginSchema> {
        Some(schema())
    }
}

fn schema() -> PluginSchema {
    PluginSchema::new()
        .shared(
            "MetaData",
            json!({
                "type": "object",
                "properties": {
                    "type": { "type": "string" },
                    "value": { "type": "string" }
                },
                "required": ["type"]
            }),
        )
        .shared(
            "Message",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "type": { "type": "string" },
                    "raw": { "type": "string" },
                    "data": { "type": ["object", "string", "null"] },
                    "createdAt": { "type": "string" },
                    "expiresAt": { "type": "string" },
                    "threadId": { "type": "string" },
                    "from": { "type": "string" },
                    "to": { "type": "string" },
                    "replyTo": { "type": "array", "items": { "type": "string" } },
                    "replyUrl": { "type": "string" },
                    "metaData": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/MetaData" }
                    },
                    "credentials": { "type": "array" },
                    "presentations": { "type": "array" }
                },
                "required": ["id", "type", "raw", "metaData"]
            }),
        )
        .method(
            HANDLE_MESSAGE,
            MethodSchema::new(
                "Parses a raw message through the configured handler chain",
                json!({
                    "type": "object",
                    "properties": {
                        "raw": { "type": "string" },
                        "metaData": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/MetaData" }
                        },
                        "save": { "type": "boolean" }
                    },
                    "required": ["raw"]
                }),
            )
            .returns(json!({ "$ref": "#/components/schemas/Message" })),
        )
}

/// Typed access to `handleMessage` on any executor.
#[async_trait]
pub trait MessageHandlerApi: Executor {
    async fn handle_message(&self, args: &HandleMessageArgs) -> Result<Message, AgentError> {
        self.call(HANDLE_MESSAGE, args).await
    }
}

impl<T: Executor + ?Sized> MessageHandlerApi for T {}
