//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::interpret::{LEGACY_SUCCESS_CODES, SUCCESS_CODES};

/// Public endpoint of the build service.
pub const DEFAULT_ENDPOINT: &str = "https://build.phonegap.com/api/v1";

/// Where requests go and which status codes count as success.
///
/// Every field has a default, so a configuration document only needs to
/// name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub success_codes: Vec<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            success_codes: SUCCESS_CODES.to_vec(),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            ..Self::default()
        }
    }

    /// Configuration for older deployments that only answer 200 or 302 on
    /// success.
    pub fn legacy() -> Self {
        Self::default().with_success_codes(LEGACY_SUCCESS_CODES)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_success_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.success_codes = codes.into();
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_public_service() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.success_codes, vec![200, 201, 202, 302]);
    }

    #[test]
    fn legacy_narrows_success_codes() {
        assert_eq!(ClientConfig::legacy().success_codes, vec![200, 302]);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{"endpoint": "http://127.0.0.1:3000/api/v1"}"#).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:3000/api/v1");
        assert_eq!(config.success_codes, SUCCESS_CODES.to_vec());
    }

    #[test]
    fn full_document_overrides_everything() {
        let config =
            ClientConfig::from_json(r#"{"endpoint": "http://x", "success_codes": [200]}"#).unwrap();
        assert_eq!(config, ClientConfig::new("http://x").with_success_codes([200]));
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(ClientConfig::from_json(r#"{"success_codes": "all"}"#).is_err());
    }
}
