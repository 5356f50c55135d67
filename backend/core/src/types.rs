use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key algorithms understood by key management systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
    Secp256r1,
    X25519,
    Bls12381G1,
    Bls12381G2,
}

/// Key material as reported by a key management system, before the KMS name is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKeyInfo {
    pub kid: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub public_key_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A key known to the agent. `private_key_hex` is only present on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedKey {
    pub kid: String,
    pub kms: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub public_key_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ManagedKey {
    pub fn from_info(kms: impl Into<String>, info: ManagedKeyInfo) -> Self {
        Self {
            kid: info.kid,
            kms: kms.into(),
            key_type: info.key_type,
            public_key_hex: info.public_key_hex,
            private_key_hex: None,
            meta: info.meta,
        }
    }

    /// Copy without private material, safe to persist and return to callers.
    pub fn public(&self) -> Self {
        Self { private_key_hex: None, ..self.clone() }
    }
}

/// The counterparty key in a shared-secret computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub public_key_hex: String,
}

/// A service endpoint attached to a managed identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A DID managed by the agent together with its keys and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_key_id: Option<String>,
    #[serde(default)]
    pub keys: Vec<ManagedKey>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Lookup key for a stored identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DidQuery {
    Did(String),
    Alias {
        alias: String,
        provider: Option<String>,
    },
}

/// Filter for listing stored identifiers. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl DidFilter {
    pub fn matches(&self, identifier: &Identifier) -> bool {
        let alias_ok = match &self.alias {
            Some(alias) => identifier.alias.as_deref() == Some(alias.as_str()),
            None => true,
        };
        let provider_ok = match &self.provider {
            Some(provider) => &identifier.provider == provider,
            None => true,
        };
        alias_ok && provider_ok
    }
}

/// Options forwarded untouched to DID resolvers.
pub type ResolutionOptions = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// `invalidDid`, `notFound`, `unsupportedDidMethod`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of resolving a DID URL. Failures are reported in-band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionResult {
    pub did_document: Option<Value>,
    #[serde(default)]
    pub did_document_metadata: Map<String, Value>,
    #[serde(default)]
    pub did_resolution_metadata: DidResolutionMetadata,
}

impl DidResolutionResult {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            did_document: None,
            did_document_metadata: Map::new(),
            did_resolution_metadata: DidResolutionMetadata {
                error: Some(code.into()),
                message: Some(message.into()),
                ..Default::default()
            },
        }
    }

    pub fn document(document: Value) -> Self {
        Self {
            did_document: Some(document),
            did_document_metadata: Map::new(),
            did_resolution_metadata: DidResolutionMetadata {
                content_type: Some("application/did+ld+json".into()),
                ..Default::default()
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.did_resolution_metadata.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn managed_key_uses_wire_names() {
        let key = ManagedKey {
            kid: "k1".into(),
            kms: "local".into(),
            key_type: KeyType::Ed25519,
            public_key_hex: "abcd".into(),
            private_key_hex: Some("secret".into()),
            meta: None,
        };
        let v = serde_json::to_value(key.public()).unwrap();
        assert_eq!(v["type"], "Ed25519");
        assert_eq!(v["publicKeyHex"], "abcd");
        assert!(v.get("privateKeyHex").is_none());
    }

    #[test]
    fn did_filter_matches_alias_and_provider() {
        let id = Identifier {
            did: "did:key:z6Mk".into(),
            alias: Some("alice".into()),
            provider: "did:key".into(),
            controller_key_id: None,
            keys: vec![],
            services: vec![],
        };
        assert!(DidFilter::default().matches(&id));
        assert!(DidFilter { alias: Some("alice".into()), provider: None }.matches(&id));
        assert!(!DidFilter { alias: None, provider: Some("did:web".into()) }.matches(&id));
    }

    #[test]
    fn resolution_error_is_in_band() {
        let res = DidResolutionResult::error("notFound", "no such DID");
        assert!(res.is_error());
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v["didResolutionMetadata"]["error"], "notFound");
        assert_eq!(v["didDocument"], json!(null));
    }
}
