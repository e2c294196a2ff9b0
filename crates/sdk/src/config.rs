//! Configuration types for the SDK.

use crate::error::{SdkError, SdkResult};
use std::time::Duration;
use url::Url;

/// Default Messages API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Default Messages API version header.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Model used by the chat bridge.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Ceiling, in tokens, for a tool result added to the conversation.
pub const DEFAULT_TOKEN_CEILING: usize = 150_000;

/// Environment variable holding the model API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Configuration for the Anthropic model adapter.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL of the Messages API.
    pub base_url: Url,
    /// API version header.
    pub api_version: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ModelConfig {
    /// Create a configuration with the given API key and defaults for the rest.
    pub fn new(api_key: impl Into<String>) -> SdkResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SdkError::Config(format!("{} must not be empty", API_KEY_ENV)));
        }

        Ok(Self {
            api_key,
            base_url: Url::parse(DEFAULT_API_BASE)?,
            api_version: DEFAULT_API_VERSION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        })
    }

    /// Read the API key from the environment.
    pub fn from_env() -> SdkResult<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| SdkError::Config(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, url: &str) -> SdkResult<Self> {
        self.base_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the messages endpoint.
    pub fn messages_url(&self) -> SdkResult<Url> {
        Ok(self.base_url.join("v1/messages")?)
    }
}

/// Limits applied by the conversation bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// `max_tokens` for the first model request of a query.
    pub max_tokens: u32,
    /// `max_tokens` for the request that follows a tool result.
    pub follow_up_max_tokens: u32,
    /// Tool results counting more tokens than this are cut to this many characters.
    pub token_ceiling: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            follow_up_max_tokens: 1000,
            token_ceiling: DEFAULT_TOKEN_CEILING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::new("sk-test").unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(
            config.messages_url().unwrap().as_str(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_model_config_custom_base() {
        let config = ModelConfig::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:9000/")
            .unwrap();

        assert_eq!(
            config.messages_url().unwrap().as_str(),
            "http://localhost:9000/v1/messages"
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(ModelConfig::new("  "), Err(SdkError::Config(_))));
    }

    #[test]
    fn test_bridge_defaults() {
        let config = BridgeConfig::default();

        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.follow_up_max_tokens, 1000);
        assert_eq!(config.token_ceiling, 150_000);
    }
}
