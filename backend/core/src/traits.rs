use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::{
    DidFilter, DidQuery, DidResolutionResult, Identifier, KeyType, ManagedKey, ManagedKeyInfo,
    PublicKey, ResolutionOptions,
};

/// A key management system: creates keys and performs operations with their private halves.
///
/// Implementations live outside the agent runtime; the key manager plugin only talks to them
/// through this trait.
#[async_trait]
pub trait AbstractKeyManagementSystem: Send + Sync {
    async fn create_key(&self, key_type: KeyType, meta: Option<Value>) -> Result<ManagedKeyInfo>;

    async fn import_key(&self, key: &ManagedKey) -> Result<ManagedKeyInfo>;

    async fn delete_key(&self, kid: &str) -> Result<bool>;

    /// Sign `data` with the key `kid`, returning the encoded signature.
    async fn sign(&self, kid: &str, algorithm: Option<&str>, data: &[u8]) -> Result<String>;

    /// Compute an ECDH shared secret, hex encoded.
    async fn shared_secret(&self, my_kid: &str, their_key: &PublicKey) -> Result<String>;

    async fn list_keys(&self) -> Result<Vec<ManagedKeyInfo>>;
}

/// Persistence for key metadata (never private material).
#[async_trait]
pub trait AbstractKeyStore: Send + Sync {
    async fn import_key(&self, key: ManagedKey) -> Result<bool>;

    /// Fails with a "Key not found" error for unknown ids.
    async fn get_key(&self, kid: &str) -> Result<ManagedKey>;

    async fn delete_key(&self, kid: &str) -> Result<bool>;

    async fn list_keys(&self) -> Result<Vec<ManagedKey>>;
}

/// Persistence for managed identifiers.
#[async_trait]
pub trait AbstractDidStore: Send + Sync {
    /// Insert or replace the identifier keyed by its DID.
    async fn import_did(&self, identifier: Identifier) -> Result<bool>;

    /// Fails with an "Identifier not found" error when nothing matches.
    async fn get_did(&self, query: DidQuery) -> Result<Identifier>;

    async fn delete_did(&self, did: &str) -> Result<bool>;

    async fn list_dids(&self, filter: DidFilter) -> Result<Vec<Identifier>>;
}

/// Symmetric encryption at rest for private key stores.
#[async_trait]
pub trait AbstractSecretBox: Send + Sync {
    async fn encrypt(&self, message: &str) -> Result<String>;

    async fn decrypt(&self, ciphertext: &str) -> Result<String>;

    fn create_secret_key() -> Result<String>
    where
        Self: Sized;
}

/// Resolves DID URLs to DID documents. Never fails out-of-band: problems are reported in
/// `did_resolution_metadata.error`.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did_url: &str, options: &ResolutionOptions) -> DidResolutionResult;
}
