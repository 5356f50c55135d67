//! DID manager plugin.
//!
//! Owns the lifecycle of managed identifiers: the selected identifier provider does the
//! method-specific work, the DID store keeps the result. Importing an identifier hands its
//! keys to the sibling `keyManagerImport` method.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use veriforge_agent::{AgentPlugin, Context, MethodMap};
use veriforge_core::{AbstractDidStore, DidFilter, DidQuery, Identifier};
use veriforge_schema::{MethodSchema, PluginSchema};

use crate::api::KeyManagerApi;
use crate::provider::{
    AbstractIdentifierProvider, AddKeyArgs, AddServiceArgs, CreateIdentifierArgs, RemoveKeyArgs,
    RemoveServiceArgs, UpdateIdentifierArgs,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidArgs {
    pub did: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetByAliasArgs {
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAliasArgs {
    pub did: String,
    pub alias: String,
}

pub struct DidManager {
    store: Arc<dyn AbstractDidStore>,
    providers: BTreeMap<String, Arc<dyn AbstractIdentifierProvider>>,
    default_provider: String,
}

impl DidManager {
    pub fn new(store: Arc<dyn AbstractDidStore>, default_provider: impl Into<String>) -> Self {
        Self { store, providers: BTreeMap::new(), default_provider: default_provider.into() }
    }

    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn AbstractIdentifierProvider>,
    ) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Exact name first, then the first provider claiming the name as a prefix.
    fn provider(&self, name: &str) -> Result<&Arc<dyn AbstractIdentifierProvider>> {
        self.providers
            .get(name)
            .or_else(|| self.providers.values().find(|p| p.match_prefix(name)))
            .ok_or_else(|| anyhow!("invalid_argument: Identifier provider not found: {name}"))
    }

    pub async fn find(&self, filter: DidFilter) -> Result<Vec<Identifier>> {
        self.store.list_dids(filter).await
    }

    pub async fn get(&self, did: &str) -> Result<Identifier> {
        self.store.get_did(DidQuery::Did(did.to_string())).await
    }

    pub async fn get_by_alias(&self, args: GetByAliasArgs) -> Result<Identifier> {
        let provider = args.provider.unwrap_or_else(|| self.default_provider.clone());
        self.store.get_did(DidQuery::Alias { alias: args.alias, provider: Some(provider) }).await
    }

    pub async fn create(&self, args: CreateIdentifierArgs, ctx: &Context) -> Result<Identifier> {
        let name = args.provider.clone().unwrap_or_else(|| self.default_provider.clone());
        let provider = self.provider(&name)?;

        if let Some(alias) = &args.alias {
            let filter = DidFilter { alias: Some(alias.clone()), provider: Some(name.clone()) };
            if let Some(existing) = self.store.list_dids(filter).await?.into_iter().next() {
                bail!(
                    "illegal_argument: Identifier with alias: {alias}, provider: {name} already exists: {}",
                    existing.did
                );
            }
        }

        let mut identifier = provider.create_identifier(&args, ctx).await?;
        identifier.alias = args.alias;
        identifier.provider = name;
        self.store.import_did(identifier.clone()).await?;
        info!(did = %identifier.did, provider = %identifier.provider, "Created identifier");
        Ok(identifier)
    }

    pub async fn get_or_create(&self, args: CreateIdentifierArgs, ctx: &Context) -> Result<Identifier> {
        let Some(alias) = args.alias.clone() else {
            bail!("invalid_argument: alias is required");
        };
        let lookup = GetByAliasArgs { alias, provider: args.provider.clone() };
        match self.get_by_alias(lookup).await {
            Ok(identifier) => Ok(identifier),
            Err(e) => {
                debug!("No identifier for alias yet ({e}); creating one");
                self.create(args, ctx).await
            }
        }
    }

    pub async fn set_alias(&self, args: SetAliasArgs) -> Result<bool> {
        let mut identifier = self.get(&args.did).await?;
        identifier.alias = Some(args.alias);
        self.store.import_did(identifier).await
    }

    pub async fn import(&self, identifier: Identifier, ctx: &Context) -> Result<Identifier> {
        let agent = ctx.agent();
        for key in &identifier.keys {
            agent.key_manager_import(key).await?;
        }
        let identifier = Identifier {
            keys: identifier.keys.iter().map(|k| k.public()).collect(),
            ..identifier
        };
        self.store.import_did(identifier.clone()).await?;
        Ok(identifier)
    }

    pub async fn update(&self, args: UpdateIdentifierArgs, ctx: &Context) -> Result<Identifier> {
        let identifier = self.get(&args.did).await?;
        let updated = self
            .provider(&identifier.provider)?
            .update_identifier(&identifier, &args, ctx)
            .await?;
        self.store.import_did(updated.clone()).await?;
        Ok(updated)
    }

    pub async fn delete(&self, did: &str, ctx: &Context) -> Result<bool> {
        let identifier = self.get(did).await?;
        self.provider(&identifier.provider)?.delete_identifier(&identifier, ctx).await?;
        self.store.delete_did(did).await
    }

    pub async fn add_key(&self, args: AddKeyArgs, ctx: &Context) -> Result<Value> {
        let mut identifier = self.get(&args.did).await?;
        let result = self
            .provider(&identifier.provider)?
            .add_key(&identifier, &args.key, args.options.as_ref(), ctx)
            .await?;
        identifier.keys.push(args.key.public());
        self.store.import_did(identifier).await?;
        Ok(result)
    }

    pub async fn remove_key(&self, args: RemoveKeyArgs, ctx: &Context) -> Result<Value> {
        let mut identifier = self.get(&args.did).await?;
        let result = self
            .provider(&identifier.provider)?
            .remove_key(&identifier, &args.kid, args.options.as_ref(), ctx)
            .await?;
        identifier.keys.retain(|k| k.kid != args.kid);
        self.store.import_did(identifier).await?;
        Ok(result)
    }

    pub async fn add_service(&self, args: AddServiceArgs, ctx: &Context) -> Result<Value> {
        let mut identifier = self.get(&args.did).await?;
        let result = self
            .provider(&identifier.provider)?
            .add_service(&identifier, &args.service, args.options.as_ref(), ctx)
            .await?;
        identifier.services.push(args.service);
        self.store.import_did(identifier).await?;
        Ok(result)
    }

    pub async fn remove_service(&self, args: RemoveServiceArgs, ctx: &Context) -> Result<Value> {
        let mut identifier = self.get(&args.did).await?;
        let result = self
            .provider(&identifier.provider)?
            .remove_service(&identifier, &args.id, args.options.as_ref(), ctx)
            .await?;
        identifier.services.retain(|s| s.id != args.id);
        self.store.import_did(identifier).await?;
        Ok(result)
    }
}

#[async_trait]
impl AgentPlugin for DidManager {
    fn name(&self) -> &str {
        "DIDManager"
    }

    fn methods(self: Arc<Self>) -> MethodMap {
        MethodMap::new()
            .bind(&self, "didManagerGetProviders", |this, _args: Value, _ctx: Context| {
                async move { Ok(this.provider_names()) }
            })
            .bind(&self, "didManagerFind", |this, args: DidFilter, _ctx: Context| async move {
                this.find(args).await
            })
            .bind(&self, "didManagerGet", |this, args: DidArgs, _ctx: Context| async move {
                this.get(&args.did).await
            })
            .bind(&self, "didManagerGetByAlias", |this, args: GetByAliasArgs, _ctx: Context| {
                async move { this.get_by_alias(args).await }
            })
            .bind(&self, "didManagerCreate", |this, args: CreateIdentifierArgs, ctx| async move {
                this.create(args, &ctx).await
            })
            .bind(&self, "didManagerGetOrCreate", |this, args: CreateIdentifierArgs, ctx| {
                async move { this.get_or_create(args, &ctx).await }
            })
            .bind(&self, "didManagerSetAlias", |this, args: SetAliasArgs, _ctx: Context| {
                async move { this.set_alias(args).await }
            })
            .bind(&self, "didManagerImport", |this, args: Identifier, ctx| async move {
                this.import(args, &ctx).await
            })
            .bind(&self, "didManagerUpdate", |this, args: UpdateIdentifierArgs, ctx| async move {
                this.update(args, &ctx).await
            })
            .bind(&self, "didManagerDelete", |this, args: DidArgs, ctx| async move {
                this.delete(&args.did, &ctx).await
            })
            .bind(&self, "didManagerAddKey", |this, args: AddKeyArgs, ctx| async move {
                this.add_key(args, &ctx).await
            })
            .bind(&self, "didManagerRemoveKey", |this, args: RemoveKeyArgs, ctx| async move {
                this.remove_key(args, &ctx).await
            })
            .bind(&self, "didManagerAddService", |this, args: AddServiceArgs, ctx| async move {
                this.add_service(args, &ctx).await
            })
            .bind(&self, "didManagerRemoveService", |this, args: RemoveServiceArgs, ctx| {
                async move { this.remove_service(args, &ctx).await }
            })
    }

    fn schema(&self) -> Option<PluginSchema> {
        Some(schema())
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": properties, "required": required })
}

fn method(description: &str, arguments: Value, returns: Value) -> MethodSchema {
    MethodSchema::new(description, arguments).returns(returns)
}

fn schema() -> PluginSchema {
    let identifier = json!({ "$ref": "#/components/schemas/Identifier" });
    let did = object(json!({ "did": { "type": "string" } }), &["did"]);
    let options = json!({ "type": "object" });
    let create = object(
        json!({
            "alias": { "type": "string" },
            "provider": { "type": "string" },
            "kms": { "type": "string" },
            "options": options
        }),
        &[],
    );
    PluginSchema::new()
        .shared(
            "Identifier",
            object(
                json!({
                    "did": { "type": "string" },
                    "alias": { "type": "string" },
                    "provider": { "type": "string" },
                    "controllerKeyId": { "type": "string" },
                    "keys": { "type": "array", "items": { "type": "object" } },
                    "services": { "type": "array", "items": { "$ref": "#/components/schemas/Service" } }
                }),
                &["did", "provider"],
            ),
        )
        .shared(
            "Service",
            object(
                json!({
                    "id": { "type": "string" },
                    "type": { "type": "string" },
                    "serviceEndpoint": {},
                    "description": { "type": "string" }
                }),
                &["id", "type", "serviceEndpoint"],
            ),
        )
        .method(
            "didManagerGetProviders",
            method(
                "Lists identifier provider names",
                json!({ "type": "object" }),
                json!({ "type": "array", "items": { "type": "string" } }),
            ),
        )
        .method(
            "didManagerFind",
            method(
                "Lists managed identifiers, optionally filtered by alias and provider",
                object(json!({ "alias": { "type": "string" }, "provider": { "type": "string" } }), &[]),
                json!({ "type": "array", "items": identifier }),
            ),
        )
        .method("didManagerGet", method("Gets a managed identifier", did.clone(), identifier.clone()))
        .method(
            "didManagerGetByAlias",
            method(
                "Gets a managed identifier by alias",
                object(
                    json!({ "alias": { "type": "string" }, "provider": { "type": "string" } }),
                    &["alias"],
                ),
                identifier.clone(),
            ),
        )
        .method("didManagerCreate", method("Creates an identifier", create.clone(), identifier.clone()))
        .method(
            "didManagerGetOrCreate",
            method(
                "Gets an identifier by alias, creating it when missing",
                json!({ "allOf": [create, { "required": ["alias"] }] }),
                identifier.clone(),
            ),
        )
        .method(
            "didManagerSetAlias",
            method(
                "Sets the alias of a managed identifier",
                object(json!({ "did": { "type": "string" }, "alias": { "type": "string" } }), &["did", "alias"]),
                json!({ "type": "boolean" }),
            ),
        )
        .method("didManagerImport", method("Imports an identifier", identifier.clone(), identifier.clone()))
        .method(
            "didManagerUpdate",
            method(
                "Updates the DID document of a managed identifier",
                object(
                    json!({ "did": { "type": "string" }, "document": { "type": "object" }, "options": options }),
                    &["did", "document"],
                ),
                identifier,
            ),
        )
        .method("didManagerDelete", method("Deletes an identifier", did, json!({ "type": "boolean" })))
        .method(
            "didManagerAddKey",
            MethodSchema::new(
                "Adds a key to an identifier",
                object(
                    json!({ "did": { "type": "string" }, "key": { "type": "object" }, "options": options }),
                    &["did", "key"],
                ),
            ),
        )
        .method(
            "didManagerRemoveKey",
            MethodSchema::new(
                "Removes a key from an identifier",
                object(
                    json!({ "did": { "type": "string" }, "kid": { "type": "string" }, "options": options }),
                    &["did", "kid"],
                ),
            ),
        )
        .method(
            "didManagerAddService",
            MethodSchema::new(
                "Adds a service to an identifier",
                object(
                    json!({
                        "did": { "type": "string" },
                        "service": { "$ref": "#/components/schemas/Service" },
                        "options": options
                    }),
                    &["did", "service"],
                ),
            ),
        )
        .method(
            "didManagerRemoveService",
            MethodSchema::new(
                "Removes a service from an identifier",
                object(
                    json!({ "did": { "type": "string" }, "id": { "type": "string" }, "options": options }),
                    &["did", "id"],
                ),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DidManagerApi;
    use crate::key_manager::KeyManager;
    use crate::testing::{FakeKms, FakeProvider, MemoryDidStore, MemoryKeyStore};
    use veriforge_agent::{Agent, AgentOptions};
    use veriforge_core::{KeyType, ManagedKey, Service};

    fn agent() -> (Agent, Arc<FakeProvider>, Arc<MemoryKeyStore>) {
        let provider = Arc::new(FakeProvider::new("did:fake"));
        let keys = Arc::new(MemoryKeyStore::default());
        let manager = DidManager::new(Arc::new(MemoryDidStore::default()), "did:fake")
            .with_provider("did:fake", provider.clone());
        let key_manager = KeyManager::new(keys.clone()).with_kms("local", Arc::new(FakeKms::default()));
        let agent = Agent::new(
            AgentOptions::default().with_plugin(manager).with_plugin(key_manager),
        )
        .unwrap();
        (agent, provider, keys)
    }

    fn aliased(alias: &str) -> CreateIdentifierArgs {
        CreateIdentifierArgs { alias: Some(alias.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn create_find_and_alias_lookup() {
        let (agent, _, _) = agent();
        assert_eq!(agent.did_manager_get_providers().await.unwrap(), vec!["did:fake"]);

        let created = agent.did_manager_create(&aliased("alice")).await.unwrap();
        assert_eq!(created.provider, "did:fake");
        assert_eq!(created.alias.as_deref(), Some("alice"));

        let found = agent
            .did_manager_get_by_alias(&GetByAliasArgs { alias: "alice".into(), provider: None })
            .await
            .unwrap();
        assert_eq!(found.did, created.did);
        assert_eq!(agent.did_manager_find(&DidFilter::default()).await.unwrap().len(), 1);

        let err = agent.did_manager_create(&aliased("alice")).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (agent, provider, _) = agent();
        let first = agent.did_manager_get_or_create(&aliased("bob")).await.unwrap();
        let second = agent.did_manager_get_or_create(&aliased("bob")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.created(), 1);
    }

    #[tokio::test]
    async fn prefixed_providers_are_matched() {
        let (agent, _, _) = agent();
        let created = agent
            .did_manager_create(&CreateIdentifierArgs {
                provider: Some("did:fake:testnet".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.provider, "did:fake:testnet");

        let err = agent
            .did_manager_create(&CreateIdentifierArgs {
                provider: Some("did:other".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("provider not found"));
    }

    #[tokio::test]
    async fn import_routes_keys_through_the_key_manager() {
        let (agent, _, keys) = agent();
        let identifier = Identifier {
            did: "did:fake:imported".into(),
            alias: None,
            provider: "did:fake".into(),
            controller_key_id: Some("k1".into()),
            keys: vec![ManagedKey {
                kid: "k1".into(),
                kms: "local".into(),
                key_type: KeyType::Secp256k1,
                public_key_hex: "02ab".into(),
                private_key_hex: Some("secret".into()),
                meta: None,
            }],
            services: vec![],
        };
        let imported = agent.did_manager_import(&identifier).await.unwrap();
        assert!(imported.keys[0].private_key_hex.is_none());
        assert_eq!(keys.len(), 1);
        assert_eq!(agent.did_manager_get("did:fake:imported").await.unwrap(), imported);
    }

    #[tokio::test]
    async fn keys_and_services_follow_provider_updates() {
        let (agent, provider, _) = agent();
        let did = agent.did_manager_create(&aliased("carol")).await.unwrap().did;

        let service = Service {
            id: format!("{did}#inbox"),
            service_type: "DIDCommMessaging".into(),
            service_endpoint: json!("https://inbox.example"),
            description: None,
        };
        agent
            .did_manager_add_service(&AddServiceArgs { did: did.clone(), service, options: None })
            .await
            .unwrap();
        assert_eq!(agent.did_manager_get(&did).await.unwrap().services.len(), 1);

        agent
            .did_manager_remove_service(&RemoveServiceArgs {
                did: did.clone(),
                id: format!("{did}#inbox"),
                options: None,
            })
            .await
            .unwrap();
        assert!(agent.did_manager_get(&did).await.unwrap().services.is_empty());

        assert!(agent.did_manager_delete(&did).await.unwrap());
        assert!(agent.did_manager_get(&did).await.is_err());
        assert_eq!(provider.deleted(), 1);
    }

    #[tokio::test]
    async fn unsupported_update_is_a_business_error() {
        let (agent, _, _) = agent();
        let did = agent.did_manager_create(&aliased("dave")).await.unwrap().did;
        let err = agent
            .did_manager_update(&UpdateIdentifierArgs {
                did,
                document: json!({}),
                options: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("not_supported"));
    }
}
