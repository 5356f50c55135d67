//! DID discovery plugin.
//!
//! Fans a free-form query out to every discovery provider in order and collects what each
//! one found. A failing provider is reported under `errors`; it never fails the whole call.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use veriforge_agent::{AgentPlugin, Context, MethodMap};
use veriforge_schema::{MethodSchema, PluginSchema};

use crate::api::DidManagerApi;
use crate::did_manager::GetByAliasArgs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverDidArgs {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl DiscoverDidArgs {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), options: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidDiscoveryMatch {
    pub did: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidDiscoveryProviderResult {
    pub provider: String,
    pub matches: Vec<DidDiscoveryMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidDiscoveryResult {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    pub results: Vec<DidDiscoveryProviderResult>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

#[async_trait]
pub trait AbstractDidDiscoveryProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn discover_did(
        &self,
        args: &DiscoverDidArgs,
        ctx: &Context,
    ) -> anyhow::Result<DidDiscoveryProviderResult>;
}

/// Finds managed identifiers whose alias equals the query, via `didManagerGetByAlias`.
pub struct AliasDiscoveryProvider;

#[async_trait]
impl AbstractDidDiscoveryProvider for AliasDiscoveryProvider {
    fn name(&self) -> &str {
        "alias"
    }

    async fn discover_did(
        &self,
        args: &DiscoverDidArgs,
        ctx: &Context,
    ) -> anyhow::Result<DidDiscoveryProviderResult> {
        let lookup = GetByAliasArgs { alias: args.query.clone(), provider: None };
        let matches = match ctx.agent().did_manager_get_by_alias(&lookup).await {
            Ok(identifier) => {
                let mut metadata = Map::new();
                metadata.insert("alias".into(), json!(args.query));
                vec![DidDiscoveryMatch { did: identifier.did, metadata }]
            }
            Err(e) => {
                debug!("Alias '{}' not found: {e}", args.query);
                Vec::new()
            }
        };
        Ok(DidDiscoveryProviderResult { provider: self.name().to_string(), matches })
    }
}

pub struct DidDiscovery {
    providers: Vec<Arc<dyn AbstractDidDiscoveryProvider>>,
}

impl DidDiscovery {
    pub fn new(providers: Vec<Arc<dyn AbstractDidDiscoveryProvider>>) -> Self {
        Self { providers }
    }

    pub async fn discover_did(&self, args: DiscoverDidArgs, ctx: &Context) -> DidDiscoveryResult {
        let mut results = Vec::new();
        let mut errors = BTreeMap::new();
        for provider in &self.providers {
            match provider.discover_did(&args, ctx).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(provider = provider.name(), "DID discovery failed: {e}");
                    errors.insert(provider.name().to_string(), e.to_string());
                }
            }
        }
        DidDiscoveryResult { query: args.query, options: args.options, results, errors }
    }
}

impl AgentPlugin for DidDiscovery {
    fn name(&self) -> &str {
        "DIDDiscovery"
    }

    fn methods(self: Arc<Self>) -> MethodMap {
        MethodMap::new().bind(&self, "discoverDid", |this, args: DiscoverDidArgs, ctx| async move {
            Ok(this.discover_did(args, &ctx).await)
        })
    }

    fn schema(&self) -> Option<PluginSchema> {
        Some(PluginSchema::new().method(
            "discoverDid",
            MethodSchema::new(
                "Finds DIDs matching a free-form query",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "options": { "type": "object" }
                    },
                    "required": ["query"]
                }),
            )
            .returns(json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "provider": { "type": "string" },
                                "matches": { "type": "array" }
                            },
                            "required": ["provider", "matches"]
                        }
                    },
                    "errors": { "type": "object" }
                },
                "required": ["query", "results"]
            })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DidManagerApi, DiscoveryApi};
    use crate::did_manager::DidManager;
    use crate::provider::CreateIdentifierArgs;
    use crate::testing::{FakeProvider, MemoryDidStore};
    use veriforge_agent::{Agent, AgentOptions};

    struct Offline;

    #[async_trait]
    impl AbstractDidDiscoveryProvider for Offline {
        fn name(&self) -> &str {
            "directory"
        }

        async fn discover_did(
            &self,
            _args: &DiscoverDidArgs,
            _ctx: &Context,
        ) -> anyhow::Result<DidDiscoveryProviderResult> {
            anyhow::bail!("directory unreachable")
        }
    }

    fn agent() -> Agent {
        let manager = DidManager::new(Arc::new(MemoryDidStore::default()), "did:fake")
            .with_provider("did:fake", Arc::new(FakeProvider::new("did:fake")));
        let discovery = DidDiscovery::new(vec![Arc::new(AliasDiscoveryProvider), Arc::new(Offline)]);
        Agent::new(AgentOptions::default().with_plugin(manager).with_plugin(discovery)).unwrap()
    }

    #[tokio::test]
    async fn alias_provider_reaches_the_did_manager() {
        let agent = agent();
        let created = agent
            .did_manager_create(&CreateIdentifierArgs {
                alias: Some("alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = agent.discover_did(&DiscoverDidArgs::new("alice")).await.unwrap();
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].provider, "alias");
        assert_eq!(result.results[0].matches[0].did, created.did);
        assert_eq!(result.errors["directory"], "directory unreachable");
    }

    #[tokio::test]
    async fn unknown_alias_yields_no_matches() {
        let result = agent().discover_did(&DiscoverDidArgs::new("nobody")).await.unwrap();
        assert!(result.results[0].matches.is_empty());
    }
}
