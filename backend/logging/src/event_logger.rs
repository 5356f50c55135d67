//! Agent Event Logger
//!
//! Every event the agent emits (`validatedMessage`, `savedMessage`, `error`, ...) is recorded
//! under the `agent_events` target, redacted first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::redact::redact_sensitive_data;

pub const EVENT_TARGET: &str = "agent_events";

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: String,
}

pub struct EventLogger;

impl EventLogger {
    /// Build the redacted log entry for an event payload.
    pub fn entry(event_type: &str, data: &Value) -> EventLogEntry {
        EventLogEntry {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data: redact_sensitive_data(&data.to_string()),
        }
    }

    pub fn log_event(event_type: &str, data: &Value) {
        let entry = Self::entry(event_type, data);
        info!(target: "agent_events", event_type = %entry.event_type, event = ?entry, "Agent event");
    }
}
