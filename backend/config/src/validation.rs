//! Config validation: every problem found in one pass, with the field path it came from.

use std::collections::HashSet;

use crate::defaults::DEFAULT_HANDLERS;
use crate::schema::VeriforgeConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

pub fn validate(config: &VeriforgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_agent(config, &mut report);
    validate_events(config, &mut report);
    validate_messaging(config, &mut report);
    report
}

fn validate_agent(config: &VeriforgeConfig, report: &mut ValidationReport) {
    let Some(agent) = &config.agent else { return };
    if agent.schema_validation == Some(false) {
        report.warn(
            "agent.schemaValidation",
            "Schema validation is disabled; arguments reach plugins unchecked",
        );
    }
    if let Some(methods) = &agent.authorized_methods {
        for (i, method) in methods.iter().enumerate() {
            if method.trim().is_empty() {
                report.error(format!("agent.authorizedMethods[{i}]"), "Method name cannot be empty");
            }
        }
    }
}

fn validate_events(config: &VeriforgeConfig, report: &mut ValidationReport) {
    if let Some(0) = config.events.as_ref().and_then(|e| e.buffer) {
        report.error("events.buffer", "buffer must be >= 1");
    }
}

fn validate_messaging(config: &VeriforgeConfig, report: &mut ValidationReport) {
    let Some(handlers) = config.messaging.as_ref().and_then(|m| m.handlers.as_ref()) else {
        return;
    };
    if handlers.is_empty() {
        report.error("messaging.handlers", "At least one message handler is required");
    }
    let mut seen = HashSet::new();
    for (i, name) in handlers.iter().enumerate() {
        let path = format!("messaging.handlers[{i}]");
        if !DEFAULT_HANDLERS.contains(&name.as_str()) {
            report.error(
                &path,
                format!("Unknown message handler '{name}'. Use one of: {}", DEFAULT_HANDLERS.join(", ")),
            );
        } else if !seen.insert(name.as_str()) {
            report.warn(&path, format!("Handler '{name}' is listed more than once"));
        }
    }
}
