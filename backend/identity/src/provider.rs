//! Identifier provider seam.
//!
//! A provider knows how to create and mutate identifiers of one DID method. The manager
//! persists what providers return; providers never touch the DID store themselves.

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use veriforge_agent::Context;
use veriforge_core::{Identifier, ManagedKey, Service};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentifierArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdentifierArgs {
    pub did: String,
    pub document: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeyArgs {
    pub did: String,
    pub key: ManagedKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveKeyArgs {
    pub did: String,
    pub kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddServiceArgs {
    pub did: String,
    pub service: Service,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveServiceArgs {
    pub did: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

#[async_trait]
pub trait AbstractIdentifierProvider: Send + Sync {
    async fn create_identifier(
        &self,
        args: &CreateIdentifierArgs,
        ctx: &Context,
    ) -> anyhow::Result<Identifier>;

    async fn update_identifier(
        &self,
        _identifier: &Identifier,
        args: &UpdateIdentifierArgs,
        _ctx: &Context,
    ) -> anyhow::Result<Identifier> {
        bail!("not_supported: update is not implemented for {}", args.did)
    }

    async fn delete_identifier(&self, identifier: &Identifier, ctx: &Context) -> anyhow::Result<bool>;

    async fn add_key(
        &self,
        identifier: &Identifier,
        key: &ManagedKey,
        options: Option<&Map<String, Value>>,
        ctx: &Context,
    ) -> anyhow::Result<Value>;

    async fn remove_key(
        &self,
        identifier: &Identifier,
        kid: &str,
        options: Option<&Map<String, Value>>,
        ctx: &Context,
    ) -> anyhow::Result<Value>;

    async fn add_service(
        &self,
        identifier: &Identifier,
        service: &Service,
        options: Option<&Map<String, Value>>,
        ctx: &Context,
    ) -> anyhow::Result<Value>;

    async fn remove_service(
        &self,
        identifier: &Identifier,
        id: &str,
        options: Option<&Map<String, Value>>,
        ctx: &Context,
    ) -> anyhow::Result<Value>;

    /// Whether this provider handles identifiers registered under `prefix` (e.g. a network
    /// variant of its DID method).
    fn match_prefix(&self, _prefix: &str) -> bool {
        false
    }
}
