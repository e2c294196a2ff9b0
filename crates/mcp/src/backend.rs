// Search backend: one outbound GET against the RAG Web Browser endpoint per invocation

use crate::config::BackendConfig;
use crate::error::{McpError, McpResult};
use reqwest::{header, Client};
use url::Url;

/// Executes a validated search and returns the raw JSON text.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> McpResult<String>;
}

/// HTTP client for the RAG Web Browser actor
#[derive(Debug, Clone)]
pub struct RagWebBrowserClient {
    client: Client,
    base_url: Url,
}

impl RagWebBrowserClient {
    /// Build the client. Fails with a configuration error when no token is set,
    /// so a missing credential is reported before any request is attempted.
    pub fn new(config: &BackendConfig) -> McpResult<Self> {
        let token = config.require_token()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            McpError::Configuration(format!("Invalid backend URL '{}': {}", config.base_url, e))
        })?;

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| McpError::Configuration("Invalid API token format".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .user_agent(concat!("ragweb-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn search_url(&self, query: &str, max_results: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("maxResults", &max_results.to_string());
        url
    }
}

#[async_trait::async_trait]
impl SearchBackend for RagWebBrowserClient {
    async fn search(&self, query: &str, max_results: u32) -> McpResult<String> {
        let url = self.search_url(query, max_results);
        tracing::info!(%url, "Calling RAG Web Browser");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            tracing::warn!(status = status.as_u16(), reason, "RAG Web Browser returned an error");
            return Err(McpError::RemoteService(reason.to_string()));
        }

        let body = response.text().await?;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&body) {
            return Err(McpError::RemoteService(format!("invalid JSON in response: {}", e)));
        }

        tracing::debug!(bytes = body.len(), "Received response from RAG Web Browser");
        Ok(body)
    }
}
