//! Error types for the RAG Web Browser SDK.

use ragweb_mcp::McpError;
use serde::{Deserialize, Serialize};

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Error types that can occur when using the SDK.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Protocol or transport failure talking to the MCP server.
    #[error(transparent)]
    Mcp(#[from] McpError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Model API returned an error response.
    #[error("Model API error (status {status}): {message}")]
    Model { status: u16, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SdkError {
    /// Create a model error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| body.to_string());

        Self::Model { status, message }
    }
}

/// Error body returned by the Messages API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
