use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;
use veriforge_agent::Context;
use veriforge_core::{Message, MetaData};

use crate::chain::{HandlerOutcome, MessageHandler};

/// Unwraps payloads delivered as links or QR codes.
///
/// `?c_i=<payload>` carries the payload verbatim, `?oob=<base64url>` carries it encoded. The
/// original URL is kept as `URL` metadata and the message always moves on to the next handler.
pub struct UrlMessageHandler;

#[async_trait]
impl MessageHandler for UrlMessageHandler {
    fn name(&self) -> &str {
        "url"
    }

    async fn handle(&self, message: &mut Message, _ctx: &Context) -> anyhow::Result<HandlerOutcome> {
        let Some(payload) = unwrap_url(&message.raw) else {
            return Ok(HandlerOutcome::Forward);
        };
        let original = std::mem::replace(&mut message.raw, payload);
        debug!("[Messaging] Unwrapped URL payload for message {}", message.id);
        message.add_meta_data(MetaData::new("URL", Some(original)));
        message.rehash();
        Ok(HandlerOutcome::Forward)
    }
}

fn unwrap_url(raw: &str) -> Option<String> {
    let url = ::url::Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.query_pairs().find_map(|(key, value)| match key.as_ref() {
        "c_i" => Some(value.into_owned()),
        "oob" => URL_SAFE_NO_PAD
            .decode(value.trim_end_matches('='))
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok()),
        _ => None,
    })
}
