use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use veriforge_agent::Context;
use veriforge_core::{Message, MetaData};

use super::{first_did, id_of, timestamp};
use crate::chain::{HandlerOutcome, MessageHandler};

pub const VERIFY_CREDENTIAL: &str = "verifyCredential";
pub const VERIFY_PRESENTATION: &str = "verifyPresentation";

/// Classifies W3C verifiable credentials and presentations.
///
/// JWT-encoded ones are recognized from the payload decoded by the JWT handler (`vc` or `vp`
/// claim). JSON-LD ones are only accepted when the agent exposes the matching verification
/// method and it reports `verified: true`.
pub struct W3cMessageHandler;

#[async_trait]
impl MessageHandler for W3cMessageHandler {
    fn name(&self) -> &str {
        "w3c"
    }

    async fn handle(&self, message: &mut Message, ctx: &Context) -> anyhow::Result<HandlerOutcome> {
        if message.has_meta_type("JWT") {
            if let Some(payload) = message.data_object().cloned() {
                if classify_jwt(message, &payload) {
                    return Ok(HandlerOutcome::Handled);
                }
            }
            return Ok(HandlerOutcome::Forward);
        }

        let Ok(Value::Object(document)) = serde_json::from_str::<Value>(&message.raw) else {
            return Ok(HandlerOutcome::Forward);
        };
        if !document.contains_key("proof") {
            return Ok(HandlerOutcome::Forward);
        }

        if has_type(&document, "VerifiablePresentation") {
            if verified(ctx, VERIFY_PRESENTATION, json!({ "presentation": document })).await {
                classify_ld_presentation(message, document);
                return Ok(HandlerOutcome::Handled);
            }
        } else if has_type(&document, "VerifiableCredential")
            && verified(ctx, VERIFY_CREDENTIAL, json!({ "credential": document })).await
        {
            classify_ld_credential(message, document);
            return Ok(HandlerOutcome::Handled);
        }
        Ok(HandlerOutcome::Forward)
    }
}

fn classify_jwt(message: &mut Message, payload: &Map<String, Value>) -> bool {
    let raw = Value::String(message.raw.clone());
    if let Some(vp) = payload.get("vp") {
        message.message_type = "w3c.vp".into();
        message.from = first_did(payload.get("iss"));
        message.to = first_did(payload.get("aud"));
        message.thread_id = payload.get("tag").and_then(Value::as_str).map(str::to_string);
        message.created_at = timestamp(payload.get("nbf").or_else(|| payload.get("iat")));
        message.expires_at = timestamp(payload.get("exp"));
        message.presentations = vec![raw];
        message.credentials = credentials_of(vp);
        return true;
    }
    if payload.contains_key("vc") {
        message.message_type = "w3c.vc".into();
        message.from = first_did(payload.get("iss"));
        message.to = first_did(payload.get("sub"));
        message.thread_id = payload.get("tag").and_then(Value::as_str).map(str::to_string);
        message.created_at = timestamp(payload.get("nbf").or_else(|| payload.get("iat")));
        message.expires_at = timestamp(payload.get("exp"));
        message.credentials = vec![raw];
        return true;
    }
    false
}

fn classify_ld_credential(message: &mut Message, credential: Map<String, Value>) {
    message.message_type = "w3c.vc".into();
    message.from = id_of(credential.get("issuer"));
    message.to = credential
        .get("credentialSubject")
        .and_then(|s| s.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);
    message.created_at =
        timestamp(credential.get("issuanceDate").or_else(|| credential.get("validFrom")));
    message.expires_at =
        timestamp(credential.get("expirationDate").or_else(|| credential.get("validUntil")));
    let credential = Value::Object(credential);
    message.credentials = vec![credential.clone()];
    message.data = Some(credential);
    message.add_meta_data(MetaData::new("JSON-LD", None));
}

fn classify_ld_presentation(message: &mut Message, presentation: Map<String, Value>) {
    message.message_type = "w3c.vp".into();
    message.from = id_of(presentation.get("holder"));
    message.to = presentation
        .get("proof")
        .and_then(|p| p.get("domain"))
        .and_then(Value::as_str)
        .map(str::to_string);
    message.thread_id = presentation
        .get("proof")
        .and_then(|p| p.get("challenge"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let presentation = Value::Object(presentation);
    message.credentials = credentials_of(&presentation);
    message.presentations = vec![presentation.clone()];
    message.data = Some(presentation);
    message.add_meta_data(MetaData::new("JSON-LD", None));
}

fn credentials_of(presentation: &Value) -> Vec<Value> {
    match presentation.get("verifiableCredential") {
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
        None => Vec::new(),
    }
}

fn has_type(document: &Map<String, Value>, wanted: &str) -> bool {
    match document.get("type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

async fn verified(ctx: &Context, method: &str, args: Value) -> bool {
    let agent = ctx.agent();
    if !agent.has_method(method) {
        debug!("[Messaging] No {method} method; JSON-LD document not accepted");
        return false;
    }
    match agent.execute(method, args).await {
        Ok(result) => result.get("verified").and_then(Value::as_bool) == Some(true),
        Err(e) => {
            warn!("[Messaging] {method} failed: {e}");
            false
        }
    }
}
