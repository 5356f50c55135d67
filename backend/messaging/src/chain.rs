//! Handler trait and chain.
//!
//! Handlers run sequentially in registration order. The first one returning
//! [`HandlerOutcome::Handled`] stops the chain; when every handler forwards, the message is
//! rejected as unsupported. Handlers mutate the caller's message in place, so changes made
//! before a rejection stay visible to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use veriforge_agent::Context;
use veriforge_core::{AgentError, Message};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The message was classified; stop here.
    Handled,
    /// Not recognized (or only partially transformed); try the next handler.
    Forward,
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Name used in configuration and logs.
    fn name(&self) -> &str;

    async fn handle(&self, message: &mut Message, ctx: &Context) -> anyhow::Result<HandlerOutcome>;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
pub struct MessageHandlerChain {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl std::fmt::Debug for MessageHandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHandlerChain")
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl MessageHandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler after the ones already in the chain.
    pub fn then<H: MessageHandler + 'static>(self, handler: H) -> Self {
        self.then_shared(Arc::new(handler))
    }

    pub fn then_shared(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the message through the chain. A handler error stops the chain and is returned.
    pub async fn handle(&self, message: &mut Message, ctx: &Context) -> Result<(), AgentError> {
        for handler in &self.handlers {
            debug!("[Messaging] {} inspecting message {}", handler.name(), message.id);
            match handler.handle(message, ctx).await? {
                HandlerOutcome::Handled => {
                    debug!(
                        "[Messaging] {} classified message {} as {}",
                        handler.name(),
                        message.id,
                        message.message_type
                    );
                    return Ok(());
                }
                HandlerOutcome::Forward => continue,
            }
        }
        debug!("[Messaging] No handler recognized message {}", message.id);
        Err(AgentError::UnsupportedMessageType)
    }
}
