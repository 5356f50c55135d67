use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A schema violation found while validating method arguments or return values.
///
/// Only the first violation is reported. `code` is the JSON-Schema keyword that failed
/// (`required`, `type`, `enum`, ...), `path` is the JSON pointer into the validated value and
/// `description` locates the failing rule inside the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub method: String,
    pub code: String,
    pub path: String,
    pub description: String,
}

/// Top-level error type for the Veriforge agent runtime.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("duplicate method '{method}': exposed by both {first} and {second}")]
    DuplicateMethod {
        method: String,
        first: String,
        second: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid schema at {location}: {message}")]
    InvalidSchema { location: String, message: String },

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid arguments for {method}: {source}")]
    InvalidArguments {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(ValidationError),

    #[error("plugin return type error: {0}")]
    PluginReturnType(ValidationError),

    #[error("failed to decode result of {method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported message type")]
    UnsupportedMessageType,

    /// Anything raised by a plugin body or collaborator. Displayed unchanged.
    #[error(transparent)]
    Plugin(anyhow::Error),
}

impl AgentError {
    /// Stable snake_case tag for logs and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateMethod { .. } => "duplicate_method",
            Self::Config(_) => "configuration_error",
            Self::InvalidSchema { .. } => "invalid_schema",
            Self::MethodNotFound(_) => "method_not_found",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Validation(_) => "validation_error",
            Self::PluginReturnType(_) => "plugin_return_type_error",
            Self::Decode { .. } => "decode_error",
            Self::UnsupportedMessageType => "unsupported_message_type",
            Self::Plugin(_) => "plugin_error",
        }
    }

    /// Whether a transport should answer this error with a client-error response.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MethodNotFound(_)
                | Self::InvalidArguments { .. }
                | Self::Validation(_)
                | Self::UnsupportedMessageType
        )
    }

    /// Raised at construction time; no agent is produced when one of these occurs.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateMethod { .. } | Self::Config(_) | Self::InvalidSchema { .. }
        )
    }

    /// The structured validation payload, for either direction.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) | Self::PluginReturnType(v) => Some(v),
            _ => None,
        }
    }
}

/// Plugin errors that wrap an `AgentError` (e.g. from a nested `execute`) keep their kind.
impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AgentError>() {
            Ok(inner) => inner,
            Err(other) => Self::Plugin(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationError {
        ValidationError {
            message: "\"didUrl\" is a required property".into(),
            method: "resolveDid".into(),
            code: "required".into(),
            path: "".into(),
            description: "components.methods.resolveDid.arguments/required".into(),
        }
    }

    #[test]
    fn business_errors_display_unchanged() {
        let err = AgentError::from(anyhow::anyhow!("KMS not found: nonexistent"));
        assert_eq!(err.to_string(), "KMS not found: nonexistent");
        assert_eq!(err.code(), "plugin_error");
        assert!(!err.is_client_error());
    }

    #[test]
    fn nested_agent_errors_keep_their_kind() {
        let nested = anyhow::Error::from(AgentError::MethodNotFound("didManagerGet".into()));
        match AgentError::from(nested) {
            AgentError::MethodNotFound(m) => assert_eq!(m, "didManagerGet"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let err = AgentError::Validation(sample());
        assert!(err.is_client_error());
        assert_eq!(err.validation().unwrap().method, "resolveDid");

        let ret = AgentError::PluginReturnType(sample());
        assert!(!ret.is_client_error());
        assert_eq!(ret.code(), "plugin_return_type_error");
    }

    #[test]
    fn configuration_errors_classified() {
        let err = AgentError::DuplicateMethod {
            method: "handleMessage".into(),
            first: "a".into(),
            second: "b".into(),
        };
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("handleMessage"));
    }
}
