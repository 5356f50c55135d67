//! Built-in message handlers and the name-based chain builder used by configuration.

mod didcomm;
mod jwt;
mod sdr;
mod url;
mod w3c;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use veriforge_core::AgentError;

use crate::chain::{MessageHandler, MessageHandlerChain};

pub use didcomm::DidCommMessageHandler;
pub use jwt::{AgentMethodVerifier, JwtMessageHandler, JwtVerifier, decode_jwt};
pub use sdr::SdrMessageHandler;
pub use url::UrlMessageHandler;
pub use w3c::W3cMessageHandler;

/// Handler names accepted in configuration, in their default order.
pub const HANDLER_NAMES: [&str; 5] = ["url", "jwt", "w3c", "sdr", "didcomm"];

pub fn handler_by_name(name: &str) -> Option<Arc<dyn MessageHandler>> {
    let handler: Arc<dyn MessageHandler> = match name {
        "url" => Arc::new(UrlMessageHandler),
        "jwt" => Arc::new(JwtMessageHandler::default()),
        "w3c" => Arc::new(W3cMessageHandler),
        "sdr" => Arc::new(SdrMessageHandler),
        "didcomm" => Arc::new(DidCommMessageHandler),
        _ => return None,
    };
    Some(handler)
}

/// Build a chain from configured handler names. Unknown names are a configuration error.
pub fn chain_from_names<S: AsRef<str>>(names: &[S]) -> Result<MessageHandlerChain, AgentError> {
    names.iter().try_fold(MessageHandlerChain::new(), |chain, name| {
        let name = name.as_ref();
        handler_by_name(name)
            .map(|handler| chain.then_shared(handler))
            .ok_or_else(|| AgentError::Config(format!("unknown message handler '{name}'")))
    })
}

/// Every built-in handler in [`HANDLER_NAMES`] order.
pub fn default_chain() -> MessageHandlerChain {
    HANDLER_NAMES
        .iter()
        .filter_map(|name| handler_by_name(name))
        .fold(MessageHandlerChain::new(), MessageHandlerChain::then_shared)
}

// ---------------------------------------------------------------------------
// Claim helpers shared by the JWT-based handlers
// ---------------------------------------------------------------------------

/// Seconds since the epoch (JWT claims) or an RFC 3339 string (JSON-LD dates).
pub(crate) fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

/// A DID given as a string, or the first entry of an array of them.
pub(crate) fn first_did(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// An issuer/holder given as a string or as an object with an `id`.
pub(crate) fn id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
