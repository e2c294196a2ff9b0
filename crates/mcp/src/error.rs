//! Error types for the MCP server, its backend, and its transports.

use crate::protocol::JsonRpcError;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Error types raised while serving or calling MCP methods.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Missing or invalid configuration (e.g. no API token). Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invocation arguments did not match the declared schema.
    #[error("Invalid arguments: {}", .fields.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Validation { fields: Vec<FieldError> },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Method not found: {0}")]
    UnknownMethod(String),

    /// The remote search endpoint answered with a non-success status or bad body.
    #[error("Failed to call RAG Web Browser: {0}")]
    RemoteService(String),

    /// A stream transport message referenced no open session.
    #[error("No such session: {0}")]
    Session(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed")]
    ConnectionClosed,

    /// Error response received from a peer.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One offending field in a rejected invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl McpError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Stable tag placed in `error.data.kind` of protocol responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Validation { .. } => "ValidationError",
            Self::UnknownTool(_) => "UnknownToolError",
            Self::UnknownPrompt(_) => "UnknownPromptError",
            Self::UnknownMethod(_) => "UnknownMethodError",
            Self::RemoteService(_) => "RemoteServiceError",
            Self::Session(_) => "SessionError",
            Self::Transport(_) | Self::ConnectionClosed | Self::Io(_) | Self::Http(_) => {
                "TransportError"
            }
            Self::Rpc { .. } => "RpcError",
            Self::Json(_) => "InvalidParamsError",
        }
    }

    /// Convert into the JSON-RPC error sent back to the caller.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        if let Self::Rpc {
            code,
            message,
            data,
        } = self
        {
            return JsonRpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            };
        }

        let code = match self {
            Self::Validation { .. } | Self::UnknownTool(_) | Self::UnknownPrompt(_) => {
                JsonRpcError::INVALID_PARAMS
            }
            Self::UnknownMethod(_) => JsonRpcError::METHOD_NOT_FOUND,
            Self::Json(_) => JsonRpcError::INVALID_PARAMS,
            _ => JsonRpcError::INTERNAL_ERROR,
        };

        let mut data = serde_json::json!({ "kind": self.kind() });
        if let Self::Validation { fields } = self {
            data["fields"] = serde_json::to_value(fields).unwrap_or_default();
        }

        JsonRpcError::custom(code, self.to_string()).with_data(data)
    }

    /// Rebuild an error from a JSON-RPC error response.
    pub fn from_rpc_error(error: JsonRpcError) -> Self {
        Self::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = McpError::Validation {
            fields: vec![
                FieldError::new("query", "required field is missing"),
                FieldError::new("maxResults", "must be a positive integer"),
            ],
        };

        assert_eq!(
            err.to_string(),
            "Invalid arguments: query: required field is missing; maxResults: must be a positive integer"
        );

        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, JsonRpcError::INVALID_PARAMS);
        assert_eq!(rpc.kind(), Some("ValidationError"));
        assert_eq!(rpc.data.unwrap()["fields"][1]["field"], "maxResults");
    }

    #[test]
    fn test_unknown_method_code() {
        let rpc = McpError::UnknownMethod("resources/list".to_string()).to_rpc_error();
        assert_eq!(rpc.code, JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(rpc.kind(), Some("UnknownMethodError"));
        assert_eq!(rpc.message, "Method not found: resources/list");
    }

    #[test]
    fn test_rpc_error_round_trips_unchanged() {
        let original = JsonRpcError::custom(-32000, "custom")
            .with_data(serde_json::json!({"kind": "Whatever"}));
        let err = McpError::from_rpc_error(original.clone());
        assert_eq!(err.to_rpc_error(), original);
    }
}
