//! Config defaults: fills in every value the runtime relies on.

use crate::schema::{AgentSection, EventsConfig, LoggingConfig, MessagingConfig, VeriforgeConfig};

/// Broadcast capacity for agent events.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Message handlers, in chain order. Must equal `veriforge_messaging::HANDLER_NAMES`;
/// the runtime crate tests that they agree.
pub const DEFAULT_HANDLERS: [&str; 5] = ["url", "jwt", "w3c", "sdr", "didcomm"];

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config. Values the user set are kept.
pub fn apply_all_defaults(config: VeriforgeConfig) -> VeriforgeConfig {
    let config = apply_agent_defaults(config);
    let config = apply_event_defaults(config);
    let config = apply_messaging_defaults(config);
    apply_logging_defaults(config)
}

fn apply_agent_defaults(mut config: VeriforgeConfig) -> VeriforgeConfig {
    let agent = config.agent.get_or_insert_with(AgentSection::default);
    agent.schema_validation.get_or_insert(true);
    config
}

fn apply_event_defaults(mut config: VeriforgeConfig) -> VeriforgeConfig {
    let events = config.events.get_or_insert_with(EventsConfig::default);
    events.buffer.get_or_insert(DEFAULT_EVENT_BUFFER);
    config
}

fn apply_messaging_defaults(mut config: VeriforgeConfig) -> VeriforgeConfig {
    let messaging = config.messaging.get_or_insert_with(MessagingConfig::default);
    messaging
        .handlers
        .get_or_insert_with(|| DEFAULT_HANDLERS.iter().map(|s| s.to_string()).collect());
    messaging.save_by_default.get_or_insert(false);
    config
}

fn apply_logging_defaults(mut config: VeriforgeConfig) -> VeriforgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_an_empty_config() {
        let cfg = apply_all_defaults(VeriforgeConfig::default());
        assert_eq!(cfg.agent.unwrap().schema_validation, Some(true));
        assert_eq!(cfg.events.unwrap().buffer, Some(DEFAULT_EVENT_BUFFER));
        let messaging = cfg.messaging.unwrap();
        assert_eq!(messaging.handlers.unwrap(), DEFAULT_HANDLERS);
        assert_eq!(messaging.save_by_default, Some(false));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn keeps_user_values() {
        let cfg = VeriforgeConfig {
            messaging: Some(MessagingConfig {
                handlers: Some(vec!["didcomm".into()]),
                save_by_default: Some(true),
            }),
            ..Default::default()
        };
        let messaging = apply_all_defaults(cfg).messaging.unwrap();
        assert_eq!(messaging.handlers.unwrap(), vec!["didcomm"]);
        assert_eq!(messaging.save_by_default, Some(true));
    }
}
