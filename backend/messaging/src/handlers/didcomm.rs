use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;
use veriforge_agent::Context;
use veriforge_core::{Message, MetaData};

use super::{first_did, timestamp};
use crate::chain::{HandlerOutcome, MessageHandler};

pub const UNPACK_DIDCOMM: &str = "unpackDIDCommMessage";
const PLAINTEXT_TYP: &str = "application/didcomm-plain+json";

/// Classifies DIDComm v2 messages.
///
/// Plaintext messages are read directly. Packed ones (JWE or general JWS JSON) are handed to
/// the agent's `unpackDIDCommMessage` method when it exists; otherwise they are forwarded.
pub struct DidCommMessageHandler;

#[async_trait]
impl MessageHandler for DidCommMessageHandler {
    fn name(&self) -> &str {
        "didcomm"
    }

    async fn handle(&self, message: &mut Message, ctx: &Context) -> anyhow::Result<HandlerOutcome> {
        let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(&message.raw) else {
            return Ok(HandlerOutcome::Forward);
        };

        if is_plaintext(&envelope) {
            return Ok(classify(message, envelope, "plaintext"));
        }
        if !is_packed(&envelope) {
            return Ok(HandlerOutcome::Forward);
        }

        let agent = ctx.agent();
        if !agent.has_method(UNPACK_DIDCOMM) {
            debug!("[Messaging] Packed DIDComm message {} but no {UNPACK_DIDCOMM}", message.id);
            return Ok(HandlerOutcome::Forward);
        }
        let unpacked = agent
            .execute(UNPACK_DIDCOMM, json!({ "message": message.raw }))
            .await?;
        let plaintext = match unpacked {
            Value::Object(mut outer) => match outer.remove("message") {
                Some(Value::Object(inner)) => inner,
                _ => outer,
            },
            _ => return Ok(HandlerOutcome::Forward),
        };
        if !is_plaintext(&plaintext) {
            return Ok(HandlerOutcome::Forward);
        }
        Ok(classify(message, plaintext, "packed"))
    }
}

fn is_plaintext(envelope: &Map<String, Value>) -> bool {
    let typ = envelope.get("typ").and_then(Value::as_str);
    typ == Some(PLAINTEXT_TYP)
        || (envelope.get("type").is_some_and(Value::is_string)
            && envelope.contains_key("id")
            && envelope.contains_key("body"))
}

fn is_packed(envelope: &Map<String, Value>) -> bool {
    (envelope.contains_key("protected") && envelope.contains_key("ciphertext"))
        || (envelope.contains_key("payload") && envelope.contains_key("signatures"))
}

/// A plaintext without a non-empty `type` is left for later handlers.
fn classify(message: &mut Message, plaintext: Map<String, Value>, packing: &str) -> HandlerOutcome {
    let Some(message_type) = plaintext
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
    else {
        debug!("[Messaging] DIDComm {packing} message {} has no type", message.id);
        return HandlerOutcome::Forward;
    };
    message.message_type = message_type.to_string();
    message.from = plaintext.get("from").and_then(Value::as_str).map(str::to_string);
    message.to = first_did(plaintext.get("to"));
    message.thread_id = plaintext.get("thid").and_then(Value::as_str).map(str::to_string);
    message.created_at = timestamp(plaintext.get("created_time"));
    message.expires_at = timestamp(plaintext.get("expires_time"));
    message.data = Some(Value::Object(plaintext));
    message.add_meta_data(MetaData::new("DIDComm", Some(packing.to_string())));
    HandlerOutcome::Handled
}
