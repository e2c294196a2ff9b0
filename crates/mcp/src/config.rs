// Backend configuration and credential resolution

use crate::error::{McpError, McpResult};
use std::time::Duration;

/// Environment variable / process argument key carrying the API token.
pub const API_TOKEN_KEY: &str = "APIFY_API_TOKEN";

/// Search endpoint of the RAG Web Browser actor.
pub const DEFAULT_BASE_URL: &str = "https://rag-web-browser.apify.actor/search";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Configuration for the search backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Fixed search endpoint.
    pub base_url: String,
    /// API token, resolved once at startup.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(api_token: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return the token or a configuration error if none was resolved.
    pub fn require_token(&self) -> McpResult<&str> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                McpError::Configuration(format!(
                    "{} is required but not set. Please set it in your environment variables \
                     or pass it as a command-line argument ({}=<token>).",
                    API_TOKEN_KEY, API_TOKEN_KEY
                ))
            })
    }
}

/// Find a `APIFY_API_TOKEN=<value>` entry among process arguments.
pub fn token_from_args<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = format!("{}=", API_TOKEN_KEY);
    args.into_iter().find_map(|arg| {
        arg.as_ref()
            .strip_prefix(&prefix)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Resolve the token: environment value wins, then the process argument form.
pub fn resolve_token<I, S>(env_value: Option<String>, args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| token_from_args(args))
}
