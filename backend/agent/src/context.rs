use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::agent::Agent;

/// Ambient key carrying the identity a transport authenticated for the call.
pub const AUTHORIZED_DID: &str = "authorizedDid";

/// Per-call context handed to every plugin method and message handler.
///
/// Holds a handle back to the agent, so a plugin can invoke methods owned by other plugins,
/// plus the ambient fields configured on the agent merged with any per-call override.
#[derive(Clone)]
pub struct Context {
    agent: Agent,
    data: Arc<Map<String, Value>>,
}

impl Context {
    pub fn new(agent: Agent, data: Map<String, Value>) -> Self {
        Self { agent, data: Arc::new(data) }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn authorized_did(&self) -> Option<&str> {
        self.get(AUTHORIZED_DID).and_then(Value::as_str)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("methods", &self.agent.available_methods().len())
            .field("data", &self.data)
            .finish()
    }
}
