//! In-memory stores and fake providers shared by the identity tests.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use veriforge_agent::Context;
use veriforge_core::{
    AbstractDidStore, AbstractKeyManagementSystem, AbstractKeyStore, DidFilter, DidQuery,
    DidResolutionResult, DidResolver, Identifier, KeyType, ManagedKey, ManagedKeyInfo, PublicKey,
    ResolutionOptions, Service,
};

use crate::provider::{AbstractIdentifierProvider, CreateIdentifierArgs};

#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, ManagedKey>>,
}

impl MemoryKeyStore {
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

#[async_trait]
impl AbstractKeyStore for MemoryKeyStore {
    async fn import_key(&self, key: ManagedKey) -> Result<bool> {
        self.keys.lock().unwrap().insert(key.kid.clone(), key);
        Ok(true)
    }

    async fn get_key(&self, kid: &str) -> Result<ManagedKey> {
        self.keys.lock().unwrap().get(kid).cloned().ok_or_else(|| anyhow!("Key not found"))
    }

    async fn delete_key(&self, kid: &str) -> Result<bool> {
        Ok(self.keys.lock().unwrap().remove(kid).is_some())
    }

    async fn list_keys(&self) -> Result<Vec<ManagedKey>> {
        Ok(self.keys.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryDidStore {
    identifiers: Mutex<HashMap<String, Identifier>>,
}

#[async_trait]
impl AbstractDidStore for MemoryDidStore {
    async fn import_did(&self, identifier: Identifier) -> Result<bool> {
        self.identifiers.lock().unwrap().insert(identifier.did.clone(), identifier);
        Ok(true)
    }

    async fn get_did(&self, query: DidQuery) -> Result<Identifier> {
        let identifiers = self.identifiers.lock().unwrap();
        let found = match query {
            DidQuery::Did(did) => identifiers.get(&did).cloned(),
            DidQuery::Alias { alias, provider } => {
                let filter = DidFilter { alias: Some(alias), provider };
                identifiers.values().find(|i| filter.matches(i)).cloned()
            }
        };
        found.ok_or_else(|| anyhow!("Identifier not found"))
    }

    async fn delete_did(&self, did: &str) -> Result<bool> {
        Ok(self.identifiers.lock().unwrap().remove(did).is_some())
    }

    async fn list_dids(&self, filter: DidFilter) -> Result<Vec<Identifier>> {
        let identifiers = self.identifiers.lock().unwrap();
        Ok(identifiers.values().filter(|i| filter.matches(i)).cloned().collect())
    }
}

/// Signs by echoing `kid:data`; shared secrets are `my_kid+their_public_key_hex`.
#[derive(Default)]
pub struct FakeKms {
    next: AtomicUsize,
}

#[async_trait]
impl AbstractKeyManagementSystem for FakeKms {
    async fn create_key(&self, key_type: KeyType, meta: Option<Value>) -> Result<ManagedKeyInfo> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(ManagedKeyInfo {
            kid: format!("key-{n}"),
            key_type,
            public_key_hex: format!("{n:02x}"),
            meta,
        })
    }

    async fn import_key(&self, key: &ManagedKey) -> Result<ManagedKeyInfo> {
        Ok(ManagedKeyInfo {
            kid: key.kid.clone(),
            key_type: key.key_type,
            public_key_hex: key.public_key_hex.clone(),
            meta: key.meta.clone(),
        })
    }

    async fn delete_key(&self, _kid: &str) -> Result<bool> {
        Ok(true)
    }

    async fn sign(&self, kid: &str, _algorithm: Option<&str>, data: &[u8]) -> Result<String> {
        Ok(format!("{kid}:{}", String::from_utf8_lossy(data)))
    }

    async fn shared_secret(&self, my_kid: &str, their_key: &PublicKey) -> Result<String> {
        Ok(format!("{my_kid}+{}", their_key.public_key_hex))
    }

    async fn list_keys(&self) -> Result<Vec<ManagedKeyInfo>> {
        Ok(Vec::new())
    }
}

/// Mints `<prefix>:<n>` identifiers and claims any `<prefix>:<network>` provider name.
pub struct FakeProvider {
    prefix: String,
    created: AtomicUsize,
    deleted: AtomicUsize,
}

impl FakeProvider {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AbstractIdentifierProvider for FakeProvider {
    async fn create_identifier(
        &self,
        _args: &CreateIdentifierArgs,
        _ctx: &Context,
    ) -> Result<Identifier> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Identifier {
            did: format!("{}:{n}", self.prefix),
            alias: None,
            provider: self.prefix.clone(),
            controller_key_id: None,
            keys: Vec::new(),
            services: Vec::new(),
        })
    }

    async fn delete_identifier(&self, _identifier: &Identifier, _ctx: &Context) -> Result<bool> {
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn add_key(
        &self,
        _identifier: &Identifier,
        key: &ManagedKey,
        _options: Option<&Map<String, Value>>,
        _ctx: &Context,
    ) -> Result<Value> {
        Ok(json!({ "added": key.kid }))
    }

    async fn remove_key(
        &self,
        _identifier: &Identifier,
        kid: &str,
        _options: Option<&Map<String, Value>>,
        _ctx: &Context,
    ) -> Result<Value> {
        Ok(json!({ "removed": kid }))
    }

    async fn add_service(
        &self,
        _identifier: &Identifier,
        service: &Service,
        _options: Option<&Map<String, Value>>,
        _ctx: &Context,
    ) -> Result<Value> {
        Ok(json!({ "added": service.id }))
    }

    async fn remove_service(
        &self,
        _identifier: &Identifier,
        id: &str,
        _options: Option<&Map<String, Value>>,
        _ctx: &Context,
    ) -> Result<Value> {
        Ok(json!({ "removed": id }))
    }

    fn match_prefix(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str()).is_some_and(|rest| rest.starts_with(':'))
    }
}

/// Resolves a fixed set of DIDs to `{ "id": did }` documents.
pub struct StaticResolver {
    known: HashSet<String>,
}

impl StaticResolver {
    pub fn new<'a>(dids: impl IntoIterator<Item = &'a str>) -> Self {
        Self { known: dids.into_iter().map(str::to_string).collect() }
    }
}

#[async_trait]
impl DidResolver for StaticResolver {
    async fn resolve(&self, did_url: &str, _options: &ResolutionOptions) -> DidResolutionResult {
        if self.known.contains(did_url) {
            DidResolutionResult::document(json!({ "id": did_url }))
        } else {
            DidResolutionResult::error("notFound", format!("{did_url} not found"))
        }
    }
}
