//! Message handling for Veriforge agents.
//!
//! Inbound payloads (URL-wrapped, JWT, DIDComm, JSON-LD credentials, selective disclosure
//! requests) travel through an ordered [`MessageHandlerChain`]. Each handler either classifies
//! the message and stops the chain or forwards it, possibly transformed, to the next one.
//! The chain runs inside the agent as the `handleMessage` method of [`MessageHandlerPlugin`].

pub mod chain;
pub mod handlers;
pub mod plugin;

pub use chain::{HandlerOutcome, MessageHandler, MessageHandlerChain};
pub use handlers::{
    AgentMethodVerifier, DidCommMessageHandler, HANDLER_NAMES, JwtMessageHandler, JwtVerifier,
    SdrMessageHandler, UrlMessageHandler, W3cMessageHandler, chain_from_names, default_chain,
};
pub use plugin::{HandleMessageArgs, MessageHandlerApi, MessageHandlerPlugin};
