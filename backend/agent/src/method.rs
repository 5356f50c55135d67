//! Method bags: the callables a plugin contributes to the agent's method table.
//!
//! Every entry is stored type-erased (`Value` in, `Value` out) so the agent can dispatch by
//! name, but [`MethodMap::typed`] and [`MethodMap::bind`] capture the argument and return
//! types at registration and do the serde conversion at the boundary.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use veriforge_core::{AgentError, ValidationError};

use crate::context::Context;

/// A registered, type-erased method.
pub type MethodFn =
    Arc<dyn Fn(Value, Context) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Ordered mapping of method name to callable.
#[derive(Default, Clone)]
pub struct MethodMap {
    entries: Vec<(String, MethodFn)>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method working directly on JSON values.
    pub fn raw<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let call: MethodFn = Arc::new(move |args: Value, ctx: Context| f(args, ctx).boxed());
        self.entries.push((name.into(), call));
        self
    }

    /// Register a method with typed arguments and result.
    ///
    /// Arguments that do not deserialize into `A` fail with `InvalidArguments` before `f` runs.
    pub fn typed<A, R, F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let name = name.into();
        let method = name.clone();
        self.raw(name, move |args: Value, ctx: Context| {
            let method = method.clone();
            let pending = serde_json::from_value::<A>(args).map(|args| f(args, ctx));
            async move {
                let pending = pending.map_err(|source| AgentError::InvalidArguments {
                    method: method.clone(),
                    source,
                })?;
                let result = pending.await?;
                let value = serde_json::to_value(result).map_err(|e| {
                    AgentError::PluginReturnType(ValidationError {
                        message: e.to_string(),
                        method: method.clone(),
                        code: "serialize".into(),
                        path: "/".into(),
                        description: format!("components.methods.{method}.returnType"),
                    })
                })?;
                Ok(value)
            }
        })
    }

    /// Register a typed method bound to a shared plugin instance.
    ///
    /// ```ignore
    /// MethodMap::new().bind(&self, "resolveDid", |this, args: ResolveDidArgs, ctx| async move {
    ///     this.resolve_did(args, &ctx).await
    /// })
    /// ```
    pub fn bind<P, A, R, F, Fut>(self, plugin: &Arc<P>, name: impl Into<String>, f: F) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<P>, A, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let plugin = Arc::clone(plugin);
        self.typed(name, move |args: A, ctx: Context| f(Arc::clone(&plugin), args, ctx))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for MethodMap {
    type Item = (String, MethodFn);
    type IntoIter = std::vec::IntoIter<(String, MethodFn)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
