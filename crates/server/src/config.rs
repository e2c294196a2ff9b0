use crate::session::SessionManager;
use anyhow::{Context, Result};
use ragweb_mcp::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use ragweb_mcp::{BackendConfig, McpServer, RagWebBrowserClient};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub sse: SseSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseSection {
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_keep_alive_secs() -> u64 {
    15
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SseSection {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Backend settings with the credential supplied at startup
    pub fn backend_config(&self, api_token: Option<String>) -> BackendConfig {
        BackendConfig::new(api_token)
            .with_base_url(&self.backend.base_url)
            .with_timeout(Duration::from_secs(self.backend.timeout_secs))
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse.keep_alive_secs)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
    pub sessions: Arc<SessionManager>,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(config: &ServerConfig, api_token: Option<String>) -> Result<Self> {
        let backend = RagWebBrowserClient::new(&config.backend_config(api_token))
            .context("Failed to create RAG Web Browser client")?;

        Ok(Self::with_server(
            McpServer::with_backend(Arc::new(backend)),
            config.keep_alive(),
        ))
    }

    pub fn with_server(mcp: McpServer, keep_alive: Duration) -> Self {
        Self {
            mcp: Arc::new(mcp),
            sessions: Arc::new(SessionManager::new()),
            keep_alive,
        }
    }

    /// Stop dispatching and end every open stream
    pub async fn shutdown(&self) {
        self.mcp.close();
        self.sessions.close_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("ragweb.toml")).unwrap();

        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.backend.timeout_secs, 45);
        assert_eq!(config.keep_alive(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\ntimeout_secs = 10").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.sse.keep_alive_secs, 15);

        let backend = config.backend_config(Some("token".to_string()));
        assert_eq!(backend.timeout, Duration::from_secs(10));
        assert_eq!(backend.api_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend\n").unwrap();

        assert!(ServerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_token_fails_state() {
        let err = AppState::new(&ServerConfig::default(), None).err().unwrap();
        assert!(format!("{:#}", err).contains("APIFY_API_TOKEN"));
    }
}
