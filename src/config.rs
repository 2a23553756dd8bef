//! Provider configuration.
//!
//! The host sends the provider block as JSON. The OAuth token may instead
//! come from the `PUTIO_OAUTH_TOKEN` environment variable; the lookup is
//! passed in so callers decide where the environment comes from.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::client::DEFAULT_BASE_URL;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "PUTIO_OAUTH_TOKEN";

/// The provider block as written by the practitioner.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OAuth token for the put.io API.
    pub oauth_token: Option<String>,
    /// Override for the API root.
    pub base_url: Option<String>,
}

/// Configuration with every fallback applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// A non-empty OAuth token.
    pub token: String,
    /// The API root.
    pub base_url: String,
}

impl ProviderConfig {
    /// Decode the provider block. A null block is an empty configuration.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(config.clone())?)
    }

    /// Apply the environment fallback and reject an empty token.
    pub fn resolve<F>(self, env: F) -> Result<ResolvedConfig, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = self
            .oauth_token
            .or_else(|| env(TOKEN_ENV_VAR))
            .unwrap_or_default();

        if token.is_empty() {
            return Err(ProviderError::configuration(
                "Unable to find put.io token",
                "Cannot use token as an empty string",
            ));
        }

        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(ResolvedConfig { token, base_url })
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Interact with put.io.")
            .with_attribute(
                "oauth_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "OAuth token for put.io. Falls back to the {} environment variable.",
                        TOKEN_ENV_VAR
                    )),
            )
            .with_attribute(
                "base_url",
                Attribute::optional_string().with_description(format!(
                    "put.io API root. Defaults to {}.",
                    DEFAULT_BASE_URL
                )),
            )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("oauth_token", &self.oauth_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_declared_token_wins() {
        let config = ProviderConfig::from_value(&json!({"oauth_token": "declared"})).unwrap();
        let resolved = config
            .resolve(|_| Some("from-env".to_string()))
            .unwrap();

        assert_eq!(resolved.token, "declared");
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_env_fallback() {
        let config = ProviderConfig::from_value(&json!({"oauth_token": null})).unwrap();
        let resolved = config
            .resolve(|key| (key == TOKEN_ENV_VAR).then(|| "from-env".to_string()))
            .unwrap();

        assert_eq!(resolved.token, "from-env");
    }

    #[test]
    fn test_null_block_uses_env() {
        let config = ProviderConfig::from_value(&Value::Null).unwrap();
        let resolved = config.resolve(|_| Some("from-env".to_string())).unwrap();
        assert_eq!(resolved.token, "from-env");
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let err = ProviderConfig::default().resolve(no_env).unwrap_err();
        let diag = err.to_diagnostic();
        assert_eq!(diag.summary, "Unable to find put.io token");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Cannot use token as an empty string")
        );

        let declared_empty = ProviderConfig::from_value(&json!({"oauth_token": ""})).unwrap();
        assert!(declared_empty
            .resolve(|_| Some("from-env".to_string()))
            .is_err());
    }

    #[test]
    fn test_base_url_override() {
        let config = ProviderConfig::from_value(&json!({
            "oauth_token": "t",
            "base_url": "http://127.0.0.1:9999"
        }))
        .unwrap();
        assert_eq!(config.resolve(no_env).unwrap().base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_wrong_type_is_serialization_error() {
        let err = ProviderConfig::from_value(&json!({"oauth_token": 12})).unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::from_value(&json!({"oauth_token": "hunter2"})).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));

        let resolved = config.resolve(no_env).unwrap();
        assert!(!format!("{:?}", resolved).contains("hunter2"));
    }

    #[test]
    fn test_schema() {
        let schema = ProviderConfig::schema();
        assert!(schema.attribute("oauth_token").is_some_and(|a| a.flags.sensitive));
        assert!(validate(&schema, &json!({})).is_empty());
        assert_eq!(validate(&schema, &json!({"base_url": 1})).len(), 1);
    }
}
