//! DID resolution plugin and the per-method resolver registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use veriforge_agent::{AgentPlugin, Context, MethodMap};
use veriforge_core::{AgentError, DidResolutionResult, DidResolver, ResolutionOptions};
use veriforge_schema::{MethodSchema, PluginSchema};

pub const RESOLVE_DID: &str = "resolveDid";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDidArgs {
    pub did_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ResolutionOptions>,
}

impl ResolveDidArgs {
    pub fn new(did_url: impl Into<String>) -> Self {
        Self { did_url: did_url.into(), options: None }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Dispatches to a resolver by DID method (`did:<method>:...`). Failures stay in-band.
#[derive(Default, Clone)]
pub struct MethodResolverRegistry {
    resolvers: HashMap<String, Arc<dyn DidResolver>>,
}

impl MethodResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: impl Into<String>, resolver: Arc<dyn DidResolver>) -> Self {
        self.resolvers.insert(method.into(), resolver);
        self
    }

    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

/// The DID method of a DID URL, when it is well formed.
fn did_method(did_url: &str) -> Option<&str> {
    let rest = did_url.strip_prefix("did:")?;
    let (method, id) = rest.split_once(':')?;
    let valid_method =
        !method.is_empty() && method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    (valid_method && !id.is_empty()).then_some(method)
}

#[async_trait]
impl DidResolver for MethodResolverRegistry {
    async fn resolve(&self, did_url: &str, options: &ResolutionOptions) -> DidResolutionResult {
        let Some(method) = did_method(did_url) else {
            return DidResolutionResult::error("invalidDid", format!("invalid DID URL: {did_url}"));
        };
        match self.resolvers.get(method) {
            Some(resolver) => resolver.resolve(did_url, options).await,
            None => DidResolutionResult::error(
                "unsupportedDidMethod",
                format!("no resolver registered for did:{method}"),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct DidResolverPlugin {
    resolver: Arc<dyn DidResolver>,
}

impl DidResolverPlugin {
    pub fn new(resolver: Arc<dyn DidResolver>) -> Self {
        Self { resolver }
    }

    /// For configuration-driven assembly, where the resolver may not have been supplied.
    pub fn try_new(resolver: Option<Arc<dyn DidResolver>>) -> Result<Self, AgentError> {
        resolver.map(Self::new).ok_or_else(|| {
            AgentError::Config("DidResolverPlugin requires a resolver".to_string())
        })
    }

    pub async fn resolve_did(&self, args: ResolveDidArgs) -> DidResolutionResult {
        let options = args.options.unwrap_or_default();
        let result = self.resolver.resolve(&args.did_url, &options).await;
        if let Some(error) = &result.did_resolution_metadata.error {
            debug!(did_url = %args.did_url, error = %error, "DID resolution failed");
        }
        result
    }
}

impl AgentPlugin for DidResolverPlugin {
    fn name(&self) -> &str {
        "DIDResolverPlugin"
    }

    fn methods(self: Arc<Self>) -> MethodMap {
        MethodMap::new().bind(&self, RESOLVE_DID, |this, args: ResolveDidArgs, _ctx: Context| {
            async move { Ok(this.resolve_did(args).await) }
        })
    }

    fn schema(&self) -> Option<PluginSchema> {
        Some(
            PluginSchema::new()
                .shared(
                    "DIDResolutionResult",
                    json!({
                        "type": "object",
                        "properties": {
                            "didDocument": { "type": ["object", "null"] },
                            "didDocumentMetadata": { "type": "object" },
                            "didResolutionMetadata": {
                                "type": "object",
                                "properties": {
                                    "contentType": { "type": "string" },
                                    "error": { "type": "string" },
                                    "message": { "type": "string" }
                                }
                            }
                        },
                        "required": ["didDocument", "didResolutionMetadata"]
                    }),
                )
                .method(
                    RESOLVE_DID,
                    MethodSchema::new(
                        "Resolves a DID URL to a DID document",
                        json!({
                            "type": "object",
                            "properties": {
                                "didUrl": { "type": "string" },
                                "options": { "type": "object" }
                            },
                            "required": ["didUrl"]
                        }),
                    )
                    .returns(json!({ "$ref": "#/components/schemas/DIDResolutionResult" })),
                ),
        )
    }
}
