//! Typed accessors for the identity methods.
//!
//! Implemented for every [`Executor`], so both callers holding an `Agent` and plugins going
//! through `ctx.agent()` get checked argument and result types. The wire format stays the
//! plain JSON `execute` uses.

use async_trait::async_trait;
use serde_json::{Value, json};
use veriforge_agent::{Executor, ExecutorExt};
use veriforge_core::{AgentError, DidFilter, DidResolutionResult, Identifier, ManagedKey};

use crate::did_manager::{DidArgs, GetByAliasArgs, SetAliasArgs};
use crate::discovery::{DidDiscoveryResult, DiscoverDidArgs};
use crate::key_manager::{CreateKeyArgs, KidArgs, SharedSecretArgs, SignArgs};
use crate::provider::{
    AddKeyArgs, AddServiceArgs, CreateIdentifierArgs, RemoveKeyArgs, RemoveServiceArgs,
    UpdateIdentifierArgs,
};
use crate::resolver::{RESOLVE_DID, ResolveDidArgs};

#[async_trait]
pub trait ResolverApi: Executor {
    async fn resolve_did(&self, args: &ResolveDidArgs) -> Result<DidResolutionResult, AgentError> {
        self.call(RESOLVE_DID, args).await
    }
}

impl<T: Executor + ?Sized> ResolverApi for T {}

#[async_trait]
pub trait KeyManagerApi: Executor {
    async fn key_manager_get_kms(&self) -> Result<Vec<String>, AgentError> {
        self.call("keyManagerGetKeyManagementSystems", &json!({})).await
    }

    async fn key_manager_create(&self, args: &CreateKeyArgs) -> Result<ManagedKey, AgentError> {
        self.call("keyManagerCreate", args).await
    }

    async fn key_manager_get(&self, kid: &str) -> Result<ManagedKey, AgentError> {
        self.call("keyManagerGet", &KidArgs { kid: kid.to_string() }).await
    }

    async fn key_manager_delete(&self, kid: &str) -> Result<bool, AgentError> {
        self.call("keyManagerDelete", &KidArgs { kid: kid.to_string() }).await
    }

    async fn key_manager_import(&self, key: &ManagedKey) -> Result<bool, AgentError> {
        self.call("keyManagerImport", key).await
    }

    async fn key_manager_sign(&self, args: &SignArgs) -> Result<String, AgentError> {
        self.call("keyManagerSign", args).await
    }

    async fn key_manager_shared_secret(&self, args: &SharedSecretArgs) -> Result<String, AgentError> {
        self.call("keyManagerSharedSecret", args).await
    }
}

impl<T: Executor + ?Sized> KeyManagerApi for T {}

#[async_trait]
pub trait DidManagerApi: Executor {
    async fn did_manager_get_providers(&self) -> Result<Vec<String>, AgentError> {
        self.call("didManagerGetProviders", &json!({})).await
    }

    async fn did_manager_find(&self, filter: &DidFilter) -> Result<Vec<Identifier>, AgentError> {
        self.call("didManagerFind", filter).await
    }

    async fn did_manager_get(&self, did: &str) -> Result<Identifier, AgentError> {
        self.call("didManagerGet", &DidArgs { did: did.to_string() }).await
    }

    async fn did_manager_get_by_alias(&self, args: &GetByAliasArgs) -> Result<Identifier, AgentError> {
        self.call("didManagerGetByAlias", args).await
    }

    async fn did_manager_create(&self, args: &CreateIdentifierArgs) -> Result<Identifier, AgentError> {
        self.call("didManagerCreate", args).await
    }

    async fn did_manager_get_or_create(
        &self,
        args: &CreateIdentifierArgs,
    ) -> Result<Identifier, AgentError> {
        self.call("didManagerGetOrCreate", args).await
    }

    async fn did_manager_set_alias(&self, args: &SetAliasArgs) -> Result<bool, AgentError> {
        self.call("didManagerSetAlias", args).await
    }

    async fn did_manager_import(&self, identifier: &Identifier) -> Result<Identifier, AgentError> {
        self.call("didManagerImport", identifier).await
    }

    async fn did_manager_update(&self, args: &UpdateIdentifierArgs) -> Result<Identifier, AgentError> {
        self.call("didManagerUpdate", args).await
    }

    async fn did_manager_delete(&self, did: &str) -> Result<bool, AgentError> {
        self.call("didManagerDelete", &DidArgs { did: did.to_string() }).await
    }

    async fn did_manager_add_key(&self, args: &AddKeyArgs) -> Result<Value, AgentError> {
        self.call("didManagerAddKey", args).await
    }

    async fn did_manager_remove_key(&self, args: &RemoveKeyArgs) -> Result<Value, AgentError> {
        self.call("didManagerRemoveKey", args).await
    }

    async fn did_manager_add_service(&self, args: &AddServiceArgs) -> Result<Value, AgentError> {
        self.call("didManagerAddService", args).await
    }

    async fn did_manager_remove_service(&self, args: &RemoveServiceArgs) -> Result<Value, AgentError> {
        self.call("didManagerRemoveService", args).await
    }
}

impl<T: Executor + ?Sized> DidManagerApi for T {}

#[async_trait]
pub trait DiscoveryApi: Executor {
    async fn discover_did(&self, args: &DiscoverDidArgs) -> Result<DidDiscoveryResult, AgentError> {
        self.call("discoverDid", args).await
    }
}

impl<T: Executor + ?Sized> DiscoveryApi for T {}
