use async_trait::async_trait;
use serde_json::Value;
use veriforge_agent::Context;
use veriforge_core::Message;

use super::{first_did, timestamp};
use crate::chain::{HandlerOutcome, MessageHandler};

/// Classifies selective disclosure requests: verified JWT payloads with `type: "sdr"`.
pub struct SdrMessageHandler;

#[async_trait]
impl MessageHandler for SdrMessageHandler {
    fn name(&self) -> &str {
        "sdr"
    }

    async fn handle(&self, message: &mut Message, _ctx: &Context) -> anyhow::Result<HandlerOutcome> {
        if !message.has_meta_type("JWT") {
            return Ok(HandlerOutcome::Forward);
        }
        let Some(payload) = message.data_object().cloned() else {
            return Ok(HandlerOutcome::Forward);
        };
        if payload.get("type").and_then(Value::as_str) != Some("sdr") {
            return Ok(HandlerOutcome::Forward);
        }

        message.message_type = "sdr".into();
        message.from = first_did(payload.get("iss"));
        message.to = first_did(payload.get("subject"));
        message.thread_id = payload.get("tag").and_then(Value::as_str).map(str::to_string);
        message.reply_url = payload.get("replyUrl").and_then(Value::as_str).map(str::to_string);
        message.created_at = timestamp(payload.get("iat"));
        message.expires_at = timestamp(payload.get("exp"));
        Ok(HandlerOutcome::Handled)
    }
}
