//! The agent, the composition root.
//!
//! Aggregates an ordered list of plugins into one immutable method table, merges their schema
//! fragments, and dispatches calls by name with per-call validation and a fresh [`Context`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use veriforge_core::{AgentError, AgentEvent, event_types};
use veriforge_logging::EventLogger;
use veriforge_schema::{ApiInfo, SchemaDocument, SchemaRegistry, SchemaValidators, build_openapi};

use crate::context::Context;
use crate::event_bus::{DEFAULT_EVENT_BUFFER, EventBus};
use crate::method::{MethodFn, MethodMap};
use crate::plugin::AgentPlugin;

/// Owner recorded for methods installed through [`AgentOptions::overrides`].
const OVERRIDE_OWNER: &str = "overrides";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub struct AgentOptions {
    /// Registered in order; method names must be unique across all of them.
    pub plugins: Vec<Arc<dyn AgentPlugin>>,
    /// Applied after plugin registration. Replaces or adds methods without a collision check.
    pub overrides: MethodMap,
    /// When set, only these methods are exposed.
    pub authorized_methods: Option<Vec<String>>,
    /// Ambient fields handed to every call.
    pub context: Map<String, Value>,
    pub schema_validation: bool,
    pub event_buffer: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            overrides: MethodMap::new(),
            authorized_methods: None,
            context: Map::new(),
            schema_validation: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl AgentOptions {
    pub fn with_plugin<P: AgentPlugin>(self, plugin: P) -> Self {
        self.with_shared_plugin(Arc::new(plugin))
    }

    pub fn with_shared_plugin(mut self, plugin: Arc<dyn AgentPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_overrides(mut self, overrides: MethodMap) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_authorized_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.schema_validation = enabled;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

struct Registered {
    owner: String,
    call: MethodFn,
}

struct Listener {
    event_types: Vec<String>,
    plugin: Arc<dyn AgentPlugin>,
}

struct AgentInner {
    methods: HashMap<String, Registered>,
    schema: SchemaDocument,
    validators: Option<SchemaValidators>,
    listeners: Vec<Listener>,
    context: Map<String, Value>,
    bus: EventBus,
}

/// Cheap to clone; every clone shares the same method table.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    pub fn new(options: AgentOptions) -> Result<Self, AgentError> {
        let AgentOptions {
            plugins,
            overrides,
            authorized_methods,
            context,
            schema_validation,
            event_buffer,
        } = options;

        let mut methods: HashMap<String, Registered> = HashMap::new();
        let mut registry = SchemaRegistry::new();
        let mut listeners = Vec::new();

        for plugin in &plugins {
            let owner = plugin.name().to_string();
            for (method, call) in Arc::clone(plugin).methods() {
                if let Some(first) = methods.get(&method) {
                    return Err(AgentError::DuplicateMethod {
                        method,
                        first: first.owner.clone(),
                        second: owner,
                    });
                }
                methods.insert(method, Registered { owner: owner.clone(), call });
            }
            if let Some(fragment) = plugin.schema() {
                registry.merge(&owner, fragment)?;
            }
            let event_types = plugin.event_types();
            if !event_types.is_empty() {
                listeners.push(Listener { event_types, plugin: Arc::clone(plugin) });
            }
        }

        for (method, call) in overrides {
            debug!(method = %method, "Installing method override");
            methods.insert(method, Registered { owner: OVERRIDE_OWNER.into(), call });
        }

        if let Some(authorized) = &authorized_methods {
            if let Some(unknown) = authorized.iter().find(|m| !methods.contains_key(m.as_str())) {
                return Err(AgentError::Config(format!(
                    "authorized method '{unknown}' is not provided by any plugin"
                )));
            }
            methods.retain(|name, _| authorized.contains(name));
        }

        let schema = registry.build(|name| methods.contains_key(name));
        let validators = if schema_validation {
            Some(SchemaValidators::compile(&schema)?)
        } else {
            warn!("Schema validation disabled; method calls are not checked");
            None
        };

        info!(
            plugins = plugins.len(),
            methods = methods.len(),
            schemas = schema.components.methods.len(),
            listeners = listeners.len(),
            "Agent initialized"
        );

        Ok(Self {
            inner: Arc::new(AgentInner {
                methods,
                schema,
                validators,
                listeners,
                context,
                bus: EventBus::new(event_buffer),
            }),
        })
    }

    /// Invoke `method` with the agent's configured context.
    pub async fn execute(&self, method: &str, args: Value) -> Result<Value, AgentError> {
        self.execute_with(method, args, Map::new()).await
    }

    /// Invoke `method` with `ambient` merged over the configured context (per-call wins).
    pub async fn execute_with(
        &self,
        method: &str,
        args: Value,
        ambient: Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let Some(entry) = self.inner.methods.get(method) else {
            debug!(method, "Method not found");
            return Err(AgentError::MethodNotFound(method.to_string()));
        };

        if let Some(validators) = &self.inner.validators {
            if let Err(violation) = validators.validate_arguments(method, &args) {
                debug!(
                    target: "veriforge::validation",
                    method,
                    code = %violation.code,
                    path = %violation.path,
                    "Argument validation failed: {}", violation.message
                );
                return Err(AgentError::Validation(violation));
            }
        }

        let mut data = self.inner.context.clone();
        data.extend(ambient);
        let ctx = Context::new(self.clone(), data);

        debug!(method, owner = %entry.owner, "Dispatching");
        let result = (entry.call)(args, ctx).await.map_err(AgentError::from)?;

        if let Some(validators) = &self.inner.validators {
            if let Err(violation) = validators.validate_return(method, &result) {
                error!(
                    target: "veriforge::plugin_contract",
                    method,
                    owner = %entry.owner,
                    code = %violation.code,
                    path = %violation.path,
                    "Plugin returned a value violating its declared returnType: {}",
                    violation.message
                );
                return Err(AgentError::PluginReturnType(violation));
            }
        }

        Ok(result)
    }

    /// Registered method names, sorted.
    pub fn available_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.inner.methods.contains_key(method)
    }

    pub fn get_schema(&self) -> &SchemaDocument {
        &self.inner.schema
    }

    pub fn openapi(&self, info: &ApiInfo) -> Value {
        build_openapi(&self.inner.schema, info, &self.available_methods())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.bus.subscribe()
    }

    /// Deliver an event to every listening plugin, in registration order, then to bus
    /// subscribers. A failing listener is reported once through an `error` event; failures
    /// while handling `error` events are only logged.
    pub async fn emit(&self, event_type: &str, data: Value) -> AgentEvent {
        let event = AgentEvent::new(event_type, data);
        let failures = self.deliver(&event).await;

        if !event.is_error() {
            for (plugin, err) in failures {
                let report = AgentEvent::new(
                    event_types::ERROR,
                    json!({
                        "plugin": plugin,
                        "eventType": event.event_type,
                        "eventId": event.id,
                        "message": err.to_string(),
                    }),
                );
                self.deliver(&report).await;
            }
        }
        event
    }

    async fn deliver(&self, event: &AgentEvent) -> Vec<(String, anyhow::Error)> {
        EventLogger::log_event(&event.event_type, &event.data);

        let ctx = Context::new(self.clone(), self.inner.context.clone());
        let mut failures = Vec::new();
        for listener in &self.inner.listeners {
            if !listener.event_types.iter().any(|t| *t == event.event_type) {
                continue;
            }
            if let Err(err) = listener.plugin.on_event(event, &ctx).await {
                warn!(
                    plugin = listener.plugin.name(),
                    event = %event,
                    "Event listener failed: {err:#}"
                );
                failures.push((listener.plugin.name().to_string(), err));
            }
        }

        self.inner.bus.publish(event.clone());
        failures
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("methods", &self.available_methods())
            .field("validation", &self.inner.validators.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AUTHORIZED_DID;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use veriforge_schema::{MethodSchema, PluginSchema};

    /// Resolver double counting its invocations.
    #[derive(Default)]
    struct Resolver {
        calls: AtomicUsize,
        broken_return: bool,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ResolveArgs {
        did_url: String,
    }

    impl AgentPlugin for Resolver {
        fn name(&self) -> &str {
            "resolver"
        }

        fn methods(self: Arc<Self>) -> MethodMap {
            MethodMap::new().bind(&self, "resolveDid", |this, args: ResolveArgs, _ctx| async move {
                this.calls.fetch_add(1, Ordering::SeqCst);
                if this.broken_return {
                    return Ok(json!({"didDocument": null}));
                }
                Ok(json!({
                    "didDocument": {"id": args.did_url},
                    "didResolutionMetadata": {},
                    "didDocumentMetadata": {}
                }))
            })
        }

        fn schema(&self) -> Option<PluginSchema> {
            Some(
                PluginSchema::new()
                    .shared(
                        "DidResolutionResult",
                        json!({"type": "object", "required": ["didResolutionMetadata"]}),
                    )
                    .method(
                        "resolveDid",
                        MethodSchema::new(
                            "Resolves a DID URL",
                            json!({
                                "type": "object",
                                "properties": {"didUrl": {"type": "string"}},
                                "required": ["didUrl"]
                            }),
                        )
                        .returns(json!({"$ref": "#/components/schemas/DidResolutionResult"})),
                    ),
            )
        }
    }

    /// A plugin whose only method reaches a sibling through the context.
    struct Discovery;

    impl AgentPlugin for Discovery {
        fn name(&self) -> &str {
            "discovery"
        }

        fn methods(self: Arc<Self>) -> MethodMap {
            MethodMap::new()
                .raw("discoverDid", |args, ctx| async move {
                    let listed = ctx.agent().available_methods();
                    let resolved = ctx
                        .agent()
                        .execute("resolveDid", json!({"didUrl": args["query"]}))
                        .await?;
                    Ok(json!({"methods": listed, "resolved": resolved}))
                })
                .raw("whoami", |_args, ctx| async move {
                    Ok(json!(ctx.authorized_did()))
                })
        }
    }

    struct Failing;

    impl AgentPlugin for Failing {
        fn name(&self) -> &str {
            "kms"
        }

        fn methods(self: Arc<Self>) -> MethodMap {
            MethodMap::new().raw("keyManagerGet", |_args, _ctx| async move {
                Err(anyhow::anyhow!("KMS not found: nonexistent"))
            })
        }
    }

    struct Handler(&'static str);

    impl AgentPlugin for Handler {
        fn name(&self) -> &str {
            self.0
        }

        fn methods(self: Arc<Self>) -> MethodMap {
            MethodMap::new().raw("handleMessage", |_args, _ctx| async move { Ok(json!({})) })
        }
    }

    #[test]
    fn duplicate_methods_fail_construction() {
        let err = Agent::new(
            AgentOptions::default()
                .with_plugin(Handler("messaging-a"))
                .with_plugin(Handler("messaging-b")),
        )
        .unwrap_err();
        assert!(err.is_configuration_error());
        match err {
            AgentError::DuplicateMethod { method, first, second } => {
                assert_eq!(method, "handleMessage");
                assert_eq!(first, "messaging-a");
                assert_eq!(second, "messaging-b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_only_the_owning_plugin() {
        let resolver = Arc::new(Resolver::default());
        let agent = Agent::new(
            AgentOptions::default()
                .with_shared_plugin(resolver.clone())
                .with_plugin(Discovery)
                .with_plugin(Failing),
        )
        .unwrap();
        assert_eq!(
            agent.available_methods(),
            vec!["discoverDid", "keyManagerGet", "resolveDid", "whoami"]
        );

        let out = agent.execute("resolveDid", json!({"didUrl": "did:example:1"})).await.unwrap();
        assert_eq!(out["didDocument"]["id"], "did:example:1");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        let err = agent.execute("didManagerFind", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::MethodNotFound(ref m) if m == "didManagerFind"));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn plugins_call_siblings_through_the_context() {
        let resolver = Arc::new(Resolver::default());
        let agent = Agent::new(
            AgentOptions::default()
                .with_shared_plugin(resolver.clone())
                .with_plugin(Discovery),
        )
        .unwrap();

        let out = agent.execute("discoverDid", json!({"query": "did:example:2"})).await.unwrap();
        assert_eq!(out["resolved"]["didDocument"]["id"], "did:example:2");
        assert_eq!(out["methods"], json!(agent.available_methods()));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_plugin() {
        let resolver = Arc::new(Resolver::default());
        let agent =
            Agent::new(AgentOptions::default().with_shared_plugin(resolver.clone())).unwrap();

        let err = agent.execute("resolveDid", json!({})).await.unwrap_err();
        let violation = err.validation().expect("validation error");
        assert_eq!(violation.method, "resolveDid");
        assert_eq!(violation.code, "required");
        assert!(matches!(err, AgentError::Validation(_)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn return_type_violations_are_reported_after_the_call() {
        let resolver = Arc::new(Resolver { broken_return: true, ..Default::default() });
        let agent =
            Agent::new(AgentOptions::default().with_shared_plugin(resolver.clone())).unwrap();

        let err = agent.execute("resolveDid", json!({"didUrl": "did:x:1"})).await.unwrap_err();
        assert!(matches!(err, AgentError::PluginReturnType(_)));
        assert!(!err.is_client_error());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_validation_passes_everything_through() {
        let resolver = Arc::new(Resolver::default());
        let agent = Agent::new(
            AgentOptions::default()
                .with_shared_plugin(resolver.clone())
                .with_schema_validation(false),
        )
        .unwrap();
        // the plugin's own decoding still rejects the call
        let err = agent.execute("resolveDid", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn business_errors_surface_unmodified() {
        let agent = Agent::new(AgentOptions::default().with_plugin(Failing)).unwrap();
        let err = agent.execute("keyManagerGet", json!({"kid": "k"})).await.unwrap_err();
        assert_eq!(err.to_string(), "KMS not found: nonexistent");
        assert_eq!(err.code(), "plugin_error");
    }

    #[test]
    fn schema_document_is_the_union_of_fragments() {
        let agent = Agent::new(
            AgentOptions::default().with_plugin(Resolver::default()).with_plugin(Discovery),
        )
        .unwrap();
        let schema = agent.get_schema();
        assert!(schema.has_method("resolveDid"));
        assert!(!schema.has_method("discoverDid"));
        assert!(schema.shared_schemas().contains_key("DidResolutionResult"));
        assert!(schema.shared_schemas().contains_key("ValidationError"));
        assert!(schema.method_names().all(|m| agent.has_method(m)));

        let api = agent.openapi(&ApiInfo::default());
        assert!(api["paths"]["/resolveDid"]["post"].is_object());
        assert!(api["paths"]["/discoverDid"]["post"].is_object());
    }

    #[tokio::test]
    async fn overrides_replace_plugin_methods() {
        let agent = Agent::new(
            AgentOptions::default()
                .with_plugin(Failing)
                .with_overrides(MethodMap::new().raw("keyManagerGet", |args, _ctx| async move {
                    Ok(json!({"kid": args["kid"], "kms": "local"}))
                })),
        )
        .unwrap();
        let out = agent.execute("keyManagerGet", json!({"kid": "k1"})).await.unwrap();
        assert_eq!(out["kms"], "local");
    }

    #[test]
    fn authorized_methods_filter_the_surface() {
        let agent = Agent::new(
            AgentOptions::default()
                .with_plugin(Resolver::default())
                .with_plugin(Discovery)
                .with_authorized_methods(["discoverDid"]),
        )
        .unwrap();
        assert_eq!(agent.available_methods(), vec!["discoverDid"]);
        assert!(!agent.get_schema().has_method("resolveDid"));

        let err = Agent::new(
            AgentOptions::default()
                .with_plugin(Discovery)
                .with_authorized_methods(["dataStoreSaveMessage"]),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[tokio::test]
    async fn per_call_context_overrides_configured_fields() {
        let agent = Agent::new(
            AgentOptions::default()
                .with_plugin(Discovery)
                .with_context_value(AUTHORIZED_DID, json!("did:example:agent")),
        )
        .unwrap();
        assert_eq!(agent.execute("whoami", json!({})).await.unwrap(), "did:example:agent");

        let mut ambient = Map::new();
        ambient.insert(AUTHORIZED_DID.into(), json!("did:example:caller"));
        let out = agent.execute_with("whoami", json!({}), ambient).await.unwrap();
        assert_eq!(out, "did:example:caller");
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl AgentPlugin for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn methods(self: Arc<Self>) -> MethodMap {
            MethodMap::new()
        }

        fn event_types(&self) -> Vec<String> {
            vec!["savedMessage".into(), "error".into()]
        }

        async fn on_event(&self, event: &AgentEvent, _ctx: &Context) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(event.event_type.clone());
            if self.fail_on.is_some_and(|t| t == event.event_type || event.is_error()) {
                anyhow::bail!("listener broke on {}", event.event_type);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_reach_listeners_and_subscribers() {
        let recorder = Arc::new(Recorder::default());
        let agent = Agent::new(AgentOptions::default().with_shared_plugin(recorder.clone())).unwrap();
        let mut rx = agent.subscribe();

        agent.emit("validatedMessage", json!({"id": "m1"})).await;
        agent.emit("savedMessage", json!({"id": "m1"})).await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["savedMessage"]);
        assert_eq!(rx.recv().await.unwrap().event_type, "validatedMessage");
        assert_eq!(rx.recv().await.unwrap().event_type, "savedMessage");
    }

    #[tokio::test]
    async fn listener_failures_are_reported_once() {
        let recorder = Arc::new(Recorder { fail_on: Some("savedMessage"), ..Default::default() });
        let agent = Agent::new(AgentOptions::default().with_shared_plugin(recorder.clone())).unwrap();
        let mut rx = agent.subscribe();

        agent.emit("savedMessage", json!({"id": "m2"})).await;

        // the error event also fails in this listener, which must not loop
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["savedMessage", "error"]);
        assert_eq!(rx.recv().await.unwrap().event_type, "savedMessage");
        let report = rx.recv().await.unwrap();
        assert!(report.is_error());
        assert_eq!(report.data["plugin"], "recorder");
        assert_eq!(report.data["eventType"], "savedMessage");
        assert!(rx.try_recv().is_err());
    }
}
