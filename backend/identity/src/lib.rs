//! Identity plugins for Veriforge agents.
//!
//! Every plugin here is built purely on the abstract collaborator interfaces from
//! `veriforge-core` (key stores, DID stores, key management systems, resolvers) plus the
//! [`AbstractIdentifierProvider`] seam defined in this crate. Concrete DID methods and
//! cryptography plug in from outside.

pub mod api;
pub mod did_manager;
pub mod discovery;
pub mod key_manager;
pub mod provider;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{DidManagerApi, DiscoveryApi, KeyManagerApi, ResolverApi};
pub use did_manager::DidManager;
pub use discovery::{
    AbstractDidDiscoveryProvider, AliasDiscoveryProvider, DidDiscovery, DidDiscoveryMatch,
    DidDiscoveryProviderResult, DidDiscoveryResult, DiscoverDidArgs,
};
pub use key_manager::KeyManager;
pub use provider::{
    AbstractIdentifierProvider, AddKeyArgs, AddServiceArgs, CreateIdentifierArgs, RemoveKeyArgs,
    RemoveServiceArgs, UpdateIdentifierArgs,
};
pub use resolver::{DidResolverPlugin, MethodResolverRegistry, ResolveDidArgs};
