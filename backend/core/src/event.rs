use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event types emitted by the bundled plugins.
pub mod event_types {
    /// A message left the handler chain with a recognized type.
    pub const VALIDATED_MESSAGE: &str = "validatedMessage";
    /// A validated message was persisted through `dataStoreSaveMessage`.
    pub const SAVED_MESSAGE: &str = "savedMessage";
    /// A listener failed while handling another event.
    pub const ERROR: &str = "error";
}

/// An event emitted through the agent to listening plugins and bus subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.event_type == event_types::ERROR
    }
}

impl std::fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.event_type, self.id)
    }
}
