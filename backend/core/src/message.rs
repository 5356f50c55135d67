use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One step recorded while a message travelled through the handler chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "type")]
    pub meta_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl MetaData {
    pub fn new(meta_type: impl Into<String>, value: Option<String>) -> Self {
        Self { meta_type: meta_type.into(), value }
    }
}

/// An inbound communication unit.
///
/// Handlers mutate a message in place: they may rewrite `raw`, replace `data` and append
/// to `meta_data`. The id is the SHA-256 of the raw payload the message was created with, so
/// replaying the same payload yields the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_url: Option<String>,
    #[serde(default)]
    pub meta_data: Vec<MetaData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presentations: Vec<Value>,
}

impl Message {
    pub fn new(raw: impl Into<String>, meta_data: Vec<MetaData>) -> Self {
        let raw = raw.into();
        Self {
            id: hash_raw(&raw),
            message_type: String::new(),
            raw,
            data: None,
            created_at: None,
            expires_at: None,
            thread_id: None,
            from: None,
            to: None,
            reply_to: None,
            reply_url: None,
            meta_data,
            credentials: Vec::new(),
            presentations: Vec::new(),
        }
    }

    pub fn add_meta_data(&mut self, meta: MetaData) {
        self.meta_data.push(meta);
    }

    pub fn last_meta_data(&self) -> Option<&MetaData> {
        self.meta_data.last()
    }

    pub fn has_meta_type(&self, meta_type: &str) -> bool {
        self.meta_data.iter().any(|m| m.meta_type == meta_type)
    }

    /// `data` as a JSON object, when it is one.
    pub fn data_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.data.as_ref().and_then(Value::as_object)
    }

    /// A message is valid once a handler assigned it a type.
    pub fn is_valid(&self) -> bool {
        !self.message_type.trim().is_empty()
    }

    /// Re-derive the id from the current raw payload (used once a handler unwrapped it).
    pub fn rehash(&mut self) {
        self.id = hash_raw(&self.raw);
    }
}

fn hash_raw(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
