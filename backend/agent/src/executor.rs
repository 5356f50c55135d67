//! Anything that can dispatch agent methods by name.
//!
//! Capability crates implement their typed accessor traits (`ResolverApi`, `DidManagerApi`,
//! ...) for every `Executor`, so callers get static typing for the methods they know about
//! while `execute` stays available for fully dynamic dispatch.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use veriforge_core::AgentError;

use crate::agent::Agent;

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, method: &str, args: Value) -> Result<Value, AgentError>;

    fn available_methods(&self) -> Vec<String>;

    fn has_method(&self, method: &str) -> bool;
}

#[async_trait]
impl Executor for Agent {
    async fn execute(&self, method: &str, args: Value) -> Result<Value, AgentError> {
        Agent::execute(self, method, args).await
    }

    fn available_methods(&self) -> Vec<String> {
        Agent::available_methods(self)
    }

    fn has_method(&self, method: &str) -> bool {
        Agent::has_method(self, method)
    }
}

/// Typed convenience on top of [`Executor::execute`].
#[async_trait]
pub trait ExecutorExt: Executor {
    async fn call<A, R>(&self, method: &str, args: &A) -> Result<R, AgentError>
    where
        A: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args).map_err(|source| AgentError::InvalidArguments {
            method: method.to_string(),
            source,
        })?;
        let value = self.execute(method, args).await?;
        serde_json::from_value(value).map_err(|source| AgentError::Decode {
            method: method.to_string(),
            source,
        })
    }
}

impl<T: Executor + ?Sized> ExecutorExt for T {}
