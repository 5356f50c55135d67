//! Veriforge agent configuration schema.
//!
//! Every section is optional in the file; [`crate::defaults`] fills in what the runtime needs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root of `agent.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VeriforgeConfig {
    /// Method exposure, ambient context and validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSection>,

    /// Event bus settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<EventsConfig>,

    /// Message pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessagingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_manager: Option<DidManagerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_manager: Option<KeyManagerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSection {
    /// Validate arguments and results against plugin schemas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_validation: Option<bool>,

    /// Ambient context merged into every method call
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,

    /// When set, only these methods are exposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_methods: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsConfig {
    /// Broadcast capacity for external subscribers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingConfig {
    /// Handler names, in chain order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handlers: Option<Vec<String>>,

    /// Save messages when the caller does not say
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_by_default: Option<bool>,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidManagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyManagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_kms: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `trace` | `debug` | `info` | `warn` | `error`, or a full filter directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// JSON console output instead of the human-readable format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Directory for the daily-rotated NDJSON log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
