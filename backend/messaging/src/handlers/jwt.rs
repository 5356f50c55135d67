use std::sync::Arc;

use anyhow::{Context as _, anyhow, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;
use veriforge_agent::Context;
use veriforge_core::{Message, MetaData};

use crate::chain::{HandlerOutcome, MessageHandler};

/// Sibling method used by [`AgentMethodVerifier`].
pub const VERIFY_JWT: &str = "verifyJWT";

/// A compact JWT split into its decoded parts.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedJwt {
    pub header: Value,
    pub payload: Value,
    pub signature: String,
}

impl DecodedJwt {
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }
}

/// Decode without verifying. Header and payload must both be JSON objects.
pub fn decode_jwt(raw: &str) -> anyhow::Result<DecodedJwt> {
    let mut parts = raw.trim().split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("not a compact JWT");
    };
    let header = decode_segment(header).context("JWT header")?;
    let payload = decode_segment(payload).context("JWT payload")?;
    Ok(DecodedJwt { header, payload, signature: signature.to_string() })
}

fn decode_segment(segment: &str) -> anyhow::Result<Value> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))?;
    let value: Value = serde_json::from_slice(&bytes)?;
    if !value.is_object() {
        bail!("segment is not a JSON object");
    }
    Ok(value)
}

/// Checks a JWT's signature. Cryptography lives outside the core, behind this seam.
#[async_trait]
pub trait JwtVerifier: Send + Sync {
    async fn verify(&self, jwt: &str, decoded: &DecodedJwt, ctx: &Context) -> anyhow::Result<()>;
}

/// Delegates to the agent's `verifyJWT` method. Without one, no JWT verifies.
pub struct AgentMethodVerifier;

#[async_trait]
impl JwtVerifier for AgentMethodVerifier {
    async fn verify(&self, jwt: &str, _decoded: &DecodedJwt, ctx: &Context) -> anyhow::Result<()> {
        let agent = ctx.agent();
        if !agent.has_method(VERIFY_JWT) {
            bail!("no {VERIFY_JWT} method available");
        }
        let result = agent.execute(VERIFY_JWT, json!({ "jwt": jwt })).await?;
        match result.get("verified").and_then(Value::as_bool) {
            Some(true) => Ok(()),
            _ => Err(anyhow!("JWT signature did not verify")),
        }
    }
}

/// Decodes and verifies JWT payloads, then forwards them for classification.
///
/// On success `data` holds the payload and a `JWT` metadata entry records the algorithm.
/// Any failure (not a JWT, expired, bad signature) forwards the message unchanged.
pub struct JwtMessageHandler {
    verifier: Arc<dyn JwtVerifier>,
}

impl JwtMessageHandler {
    pub fn new(verifier: Arc<dyn JwtVerifier>) -> Self {
        Self { verifier }
    }
}

impl Default for JwtMessageHandler {
    fn default() -> Self {
        Self::new(Arc::new(AgentMethodVerifier))
    }
}

#[async_trait]
impl MessageHandler for JwtMessageHandler {
    fn name(&self) -> &str {
        "jwt"
    }

    async fn handle(&self, message: &mut Message, ctx: &Context) -> anyhow::Result<HandlerOutcome> {
        let decoded = match decode_jwt(&message.raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("[Messaging] Message {} is not a JWT: {e:#}", message.id);
                return Ok(HandlerOutcome::Forward);
            }
        };

        if let Some(exp) = decoded.payload.get("exp").and_then(Value::as_i64) {
            if exp < Utc::now().timestamp() {
                debug!("[Messaging] JWT in message {} expired at {exp}", message.id);
                return Ok(HandlerOutcome::Forward);
            }
        }

        if let Err(e) = self.verifier.verify(&message.raw, &decoded, ctx).await {
            debug!("[Messaging] JWT in message {} rejected: {e:#}", message.id);
            return Ok(HandlerOutcome::Forward);
        }

        let alg = decoded.alg().map(str::to_string);
        message.data = Some(decoded.payload);
        message.add_meta_data(MetaData::new("JWT", alg));
        Ok(HandlerOutcome::Forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{ctx_with, jwt, verifying_ctx};
    use veriforge_agent::MethodMap;

    #[test]
    fn decodes_compact_tokens() {
        let decoded = decode_jwt(&jwt(json!({"iss": "did:example:issuer"}))).unwrap();
        assert_eq!(decoded.alg(), Some("ES256K"));
        assert_eq!(decoded.payload["iss"], "did:example:issuer");

        assert!(decode_jwt("ABC").is_err());
        assert!(decode_jwt("a.b.c.d").is_err());
        assert!(decode_jwt("e30.bm90LWpzb24.sig").is_err());
    }

    #[tokio::test]
    async fn verified_token_sets_data_and_metadata() {
        let mut message = Message::new(jwt(json!({"iss": "did:example:issuer", "sub": "x"})), vec![]);
        let outcome = JwtMessageHandler::default()
            .handle(&mut message, &verifying_ctx())
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Forward);
        assert_eq!(message.data_object().unwrap()["sub"], "x");
        assert_eq!(message.last_meta_data().unwrap().meta_type, "JWT");
        assert_eq!(message.last_meta_data().unwrap().value.as_deref(), Some("ES256K"));
    }

    #[tokio::test]
    async fn expired_or_unverified_tokens_forward_unchanged() {
        let expired = jwt(json!({"iss": "did:example:issuer", "exp": 1_000}));
        let mut message = Message::new(expired, vec![]);
        JwtMessageHandler::default().handle(&mut message, &verifying_ctx()).await.unwrap();
        assert!(message.data.is_none());
        assert!(message.meta_data.is_empty());

        let rejecting = ctx_with(MethodMap::new().raw(VERIFY_JWT, |_args, _ctx| async move {
            Ok(json!({"verified": false}))
        }));
        let mut message = Message::new(jwt(json!({"iss": "did:example:issuer"})), vec![]);
        JwtMessageHandler::default().handle(&mut message, &rejecting).await.unwrap();
        assert!(message.data.is_none());

        // no verifyJWT method at all
        let mut message = Message::new(jwt(json!({"iss": "did:example:issuer"})), vec![]);
        JwtMessageHandler::default()
            .handle(&mut message, &ctx_with(MethodMap::new()))
            .await
            .unwrap();
        assert!(message.data.is_none());
    }
}
