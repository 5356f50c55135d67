//! Key manager plugin.
//!
//! Routes key operations to the named key management system and keeps the public half of
//! every key in the key store. Private material only ever travels to the KMS.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use veriforge_agent::{AgentPlugin, Context, MethodMap};
use veriforge_core::{
    AbstractKeyManagementSystem, AbstractKeyStore, KeyType, ManagedKey, PublicKey,
};
use veriforge_schema::{MethodSchema, PluginSchema};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyArgs {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KidArgs {
    pub kid: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    Hex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignArgs {
    pub key_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    pub data: String,
    #[serde(default)]
    pub encoding: DataEncoding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSecretArgs {
    pub secret_key_ref: String,
    pub public_key: PublicKey,
}

pub struct KeyManager {
    store: Arc<dyn AbstractKeyStore>,
    kms: BTreeMap<String, Arc<dyn AbstractKeyManagementSystem>>,
    default_kms: Option<String>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn AbstractKeyStore>) -> Self {
        Self { store, kms: BTreeMap::new(), default_kms: None }
    }

    pub fn with_kms(
        mut self,
        name: impl Into<String>,
        kms: Arc<dyn AbstractKeyManagementSystem>,
    ) -> Self {
        self.kms.insert(name.into(), kms);
        self
    }

    /// KMS used by `keyManagerCreate` when the caller names none.
    pub fn with_default_kms(mut self, name: impl Into<String>) -> Self {
        self.default_kms = Some(name.into());
        self
    }

    fn kms(&self, name: &str) -> Result<&Arc<dyn AbstractKeyManagementSystem>> {
        self.kms.get(name).ok_or_else(|| anyhow!("KMS not found: {name}"))
    }

    pub fn kms_names(&self) -> Vec<String> {
        self.kms.keys().cloned().collect()
    }

    pub async fn create(&self, args: CreateKeyArgs) -> Result<ManagedKey> {
        let name = match args.kms.or_else(|| self.default_kms.clone()) {
            Some(name) => name,
            None if self.kms.len() == 1 => self.kms_names().remove(0),
            None => return Err(anyhow!("invalid_argument: no kms given and no default kms set")),
        };
        let info = self.kms(&name)?.create_key(args.key_type, args.meta).await?;
        let key = ManagedKey::from_info(name, info);
        self.store.import_key(key.clone()).await?;
        info!(kid = %key.kid, kms = %key.kms, "Created key");
        Ok(key)
    }

    pub async fn get(&self, kid: &str) -> Result<ManagedKey> {
        self.store.get_key(kid).await
    }

    pub async fn delete(&self, kid: &str) -> Result<bool> {
        let key = self.store.get_key(kid).await?;
        self.kms(&key.kms)?.delete_key(kid).await?;
        self.store.delete_key(kid).await
    }

    pub async fn import(&self, key: ManagedKey) -> Result<bool> {
        self.kms(&key.kms)?.import_key(&key).await?;
        debug!(kid = %key.kid, kms = %key.kms, "Imported key");
        self.store.import_key(key.public()).await
    }

    pub async fn sign(&self, args: SignArgs) -> Result<String> {
        let key = self.store.get_key(&args.key_ref).await?;
        let data = match args.encoding {
            DataEncoding::Utf8 => args.data.into_bytes(),
            DataEncoding::Hex => hex::decode(args.data.trim_start_matches("0x"))?,
        };
        self.kms(&key.kms)?
            .sign(&key.kid, args.algorithm.as_deref(), &data)
            .await
    }

    pub async fn shared_secret(&self, args: SharedSecretArgs) -> Result<String> {
        let key = self.store.get_key(&args.secret_key_ref).await?;
        self.kms(&key.kms)?.shared_secret(&key.kid, &args.public_key).await
    }
}

#[async_trait]
impl AgentPlugin for KeyManager {
    fn name(&self) -> &str {
        "KeyManager"
    }

    fn methods(self: Arc<Self>) -> MethodMap {
        MethodMap::new()
            .bind(&self, "keyManagerGetKeyManagementSystems", |this, _args: Value, _ctx: Context| {
                async move { Ok(this.kms_names()) }
            })
            .bind(&self, "keyManagerCreate", |this, args: CreateKeyArgs, _ctx: Context| {
                async move { this.create(args).await }
            })
            .bind(&self, "keyManagerGet", |this, args: KidArgs, _ctx: Context| async move {
                this.get(&args.kid).await
            })
            .bind(&self, "keyManagerDelete", |this, args: KidArgs, _ctx: Context| async move {
                this.delete(&args.kid).await
            })
            .bind(&self, "keyManagerImport", |this, key: ManagedKey, _ctx: Context| async move {
                this.import(key).await
            })
            .bind(&self, "keyManagerSign", |this, args: SignArgs, _ctx: Context| async move {
                this.sign(args).await
            })
            .bind(&self, "keyManagerSharedSecret", |this, args: SharedSecretArgs, _ctx: Context| {
                async move { this.shared_secret(args).await }
            })
    }

    fn schema(&self) -> Option<PluginSchema> {
        Some(schema())
    }
}

fn schema() -> PluginSchema {
    let key_types = json!(["Ed25519", "Secp256k1", "Secp256r1", "X25519", "Bls12381G1", "Bls12381G2"]);
    let kid = json!({ "type": "object", "properties": { "kid": { "type": "string" } }, "required": ["kid"] });
    PluginSchema::new()
        .shared(
            "ManagedKey",
            json!({
                "type": "object",
                "properties": {
                    "kid": { "type": "string" },
                    "kms": { "type": "string" },
                    "type": { "enum": key_types },
                    "publicKeyHex": { "type": "string" },
                    "privateKeyHex": { "type": "string" },
                    "meta": { "type": ["object", "null"] }
                },
                "required": ["kid", "kms", "type", "publicKeyHex"]
            }),
        )
        .method(
            "keyManagerGetKeyManagementSystems",
            MethodSchema::new("Lists available key management systems", json!({ "type": "object" }))
                .returns(json!({ "type": "array", "items": { "type": "string" } })),
        )
        .method(
            "keyManagerCreate",
            MethodSchema::new(
                "Creates a new key",
                json!({
                    "type": "object",
                    "properties": {
                        "type": { "enum": key_types },
                        "kms": { "type": "string" },
                        "meta": { "type": "object" }
                    },
                    "required": ["type"]
                }),
            )
            .returns(json!({ "$ref": "#/components/schemas/ManagedKey" })),
        )
        .method(
            "keyManagerGet",
            MethodSchema::new("Gets a key by kid", kid.clone())
                .returns(json!({ "$ref": "#/components/schemas/ManagedKey" })),
        )
        .method(
            "keyManagerDelete",
            MethodSchema::new("Deletes a key", kid).returns(json!({ "type": "boolean" })),
        )
        .method(
            "keyManagerImport",
            MethodSchema::new(
                "Imports a key into its key management system",
                json!({ "$ref": "#/components/schemas/ManagedKey" }),
            )
            .returns(json!({ "type": "boolean" })),
        )
        .method(
            "keyManagerSign",
            MethodSchema::new(
                "Signs data with a managed key",
                json!({
                    "type": "object",
                    "properties": {
                        "keyRef": { "type": "string" },
                        "algorithm": { "type": "string" },
                        "data": { "type": "string" },
                        "encoding": { "enum": ["utf-8", "hex"] }
                    },
                    "required": ["keyRef", "data"]
                }),
            )
            .returns(json!({ "type": "string" })),
        )
        .method(
            "keyManagerSharedSecret",
            MethodSchema::new(
                "Computes a shared secret between a managed key and a public key",
                json!({
                    "type": "object",
                    "properties": {
                        "secretKeyRef": { "type": "string" },
                        "publicKey": {
                            "type": "object",
                            "properties": {
                                "type": { "enum": key_types },
                                "publicKeyHex": { "type": "string" }
                            },
                            "required": ["type", "publicKeyHex"]
                        }
                    },
                    "required": ["secretKeyRef", "publicKey"]
                }),
            )
            .returns(json!({ "type": "string" })),
        )
}
