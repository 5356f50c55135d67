//! Configuration-driven agent assembly.
//!
//! [`Bootstrap`] turns a prepared [`VeriforgeConfig`] into a running [`Agent`]: it starts the
//! logger, installs the message handler plugin with the configured chain, and applies the
//! agent section (ambient context, authorized methods, schema validation, event buffer).
//! Identity plugins need concrete stores and providers, so callers construct them through
//! the helpers here and add them with [`Bootstrap::with_plugin`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use veriforge_agent::{Agent, AgentOptions, AgentPlugin, MethodMap};
use veriforge_config::VeriforgeConfig;
use veriforge_config::defaults::{DEFAULT_EVENT_BUFFER, DEFAULT_LOG_LEVEL};
use veriforge_core::{AbstractDidStore, AbstractKeyStore, AgentError};
use veriforge_identity::{DidManager, KeyManager};
use veriforge_messaging::{MessageHandlerPlugin, chain_from_names, default_chain};

pub struct Bootstrap {
    config: VeriforgeConfig,
    plugins: Vec<Arc<dyn AgentPlugin>>,
    overrides: MethodMap,
}

impl Bootstrap {
    /// Load `path`, or `agent.yaml` in the config directory when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => veriforge_config::config_file_path(&veriforge_config::config_dir()),
        };
        let config = veriforge_config::load_and_prepare(&path).await?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: VeriforgeConfig) -> Self {
        Self { config, plugins: Vec::new(), overrides: MethodMap::new() }
    }

    pub fn config(&self) -> &VeriforgeConfig {
        &self.config
    }

    /// Start the global logger from the `logging` section.
    pub fn init_logging(&self) {
        let logging = self.config.logging.clone().unwrap_or_default();
        veriforge_logging::init_logger(
            logging.dir.as_deref(),
            logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
            logging.json.unwrap_or(false),
        );
    }

    /// A key manager over `store` with the configured default KMS.
    pub fn key_manager(&self, store: Arc<dyn AbstractKeyStore>) -> KeyManager {
        let manager = KeyManager::new(store);
        match self.config.key_manager.as_ref().and_then(|k| k.default_kms.clone()) {
            Some(kms) => manager.with_default_kms(kms),
            None => manager,
        }
    }

    /// A DID manager over `store` using the configured default provider.
    pub fn did_manager(&self, store: Arc<dyn AbstractDidStore>) -> Result<DidManager, AgentError> {
        let provider = self
            .config
            .did_manager
            .as_ref()
            .and_then(|d| d.default_provider.clone())
            .ok_or_else(|| AgentError::Config("didManager.defaultProvider is not set".into()))?;
        Ok(DidManager::new(store, provider))
    }

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

    /// The message handler plugin for the configured chain.
    pub fn message_handler(&self) -> Result<MessageHandlerPlugin, AgentError> {
        let messaging = self.config.messaging.clone().unwrap_or_default();
        let chain = match &messaging.handlers {
            Some(names) => chain_from_names(names)?,
            None => default_chain(),
        };
        info!(handlers = ?chain.names(), "Message handler chain");
        Ok(MessageHandlerPlugin::new(chain)
            .with_save_by_default(messaging.save_by_default.unwrap_or(false)))
    }

    pub fn agent_options(self) -> Result<AgentOptions, AgentError> {
        let handler = self.message_handler()?;
        let agent = self.config.agent.clone().unwrap_or_default();
        let buffer = self
            .config
            .events
            .as_ref()
            .and_then(|e| e.buffer)
            .unwrap_or(DEFAULT_EVENT_BUFFER);

        let mut options = AgentOptions::default()
            .with_plugin(handler)
            .with_overrides(self.overrides)
            .with_context(agent.context)
            .with_schema_validation(agent.schema_validation.unwrap_or(true))
            .with_event_buffer(buffer);
        for plugin in self.plugins {
            options = options.with_shared_plugin(plugin);
        }
        if let Some(methods) = agent.authorized_methods {
            options = options.with_authorized_methods(methods);
        }
        Ok(options)
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        Agent::new(self.agent_options()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veriforge_agent::Context;
    use veriforge_config::defaults::DEFAULT_HANDLERS;
    use veriforge_messaging::{HandleMessageArgs, MessageHandlerApi};

    fn prepared(value: serde_json::Value) -> Bootstrap {
        Bootstrap::from_config(veriforge_config::prepare(value).unwrap())
    }

    #[tokio::test]
    async fn default_config_exposes_handle_message() {
        let agent = prepared(json!({})).build().unwrap();
        assert_eq!(agent.available_methods(), vec!["handleMessage"]);

        let plain = json!({
            "id": "1",
            "type": "https://didcomm.org/basicmessage/2.0/message",
            "body": { "content": "hi" }
        });
        let message = agent
            .handle_message(&HandleMessageArgs::new(plain.to_string()))
            .await
            .unwrap();
        assert_eq!(message.message_type, "https://didcomm.org/basicmessage/2.0/message");
    }

    #[tokio::test]
    async fn configured_chain_limits_classification() {
        let agent = prepared(json!({ "messaging": { "handlers": ["jwt"] } })).build().unwrap();
        let plain = json!({ "id": "1", "type": "ping", "body": {} });
        let err = agent
            .handle_message(&HandleMessageArgs::new(plain.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedMessageType));
    }

    #[test]
    fn config_handler_names_match_the_messaging_crate() {
        assert_eq!(DEFAULT_HANDLERS, veriforge_messaging::HANDLER_NAMES);
        assert!(chain_from_names(&DEFAULT_HANDLERS).is_ok());

        let handlers = prepared(json!({})).config().messaging.clone().unwrap().handlers.unwrap();
        assert_eq!(handlers, veriforge_messaging::HANDLER_NAMES);
    }

    #[test]
    fn agent_section_is_applied() {
        let options = prepared(json!({
            "agent": {
                "schemaValidation": false,
                "context": { "tenant": "acme" },
                "authorizedMethods": ["handleMessage"]
            },
            "events": { "buffer": 8 }
        }))
        .agent_options()
        .unwrap();
        assert!(!options.schema_validation);
        assert_eq!(options.context["tenant"], "acme");
        assert_eq!(options.authorized_methods.unwrap(), vec!["handleMessage"]);
        assert_eq!(options.event_buffer, 8);
        assert_eq!(options.plugins.len(), 1);
    }

    #[test]
    fn overrides_reach_the_agent() {
        let overrides = MethodMap::new().typed("ping", |_args: serde_json::Value, _ctx: Context| async {
            Ok("pong")
        });
        let agent = prepared(json!({})).with_overrides(overrides).build().unwrap();
        assert!(agent.has_method("ping"));
    }

    #[test]
    fn did_manager_requires_a_default_provider() {
        let bootstrap = prepared(json!({}));
        assert!(bootstrap.config().did_manager.is_none());
        let err = bootstrap.did_manager(Arc::new(NoDids)).err().unwrap();
        assert!(err.is_configuration_error());
        let configured = prepared(json!({ "didManager": { "defaultProvider": "did:key" } }));
        assert!(configured.did_manager(Arc::new(NoDids)).is_ok());
    }

    struct NoDids;

    #[async_trait::async_trait]
    impl AbstractDidStore for NoDids {
        async fn import_did(&self, _identifier: veriforge_core::Identifier) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn get_did(&self, _query: veriforge_core::DidQuery) -> anyhow::Result<veriforge_core::Identifier> {
            anyhow::bail!("Identifier not found")
        }

        async fn delete_did(&self, _did: &str) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn list_dids(
            &self,
            _filter: veriforge_core::DidFilter,
        ) -> anyhow::Result<Vec<veriforge_core::Identifier>> {
            Ok(Vec::new())
        }
    }
}
