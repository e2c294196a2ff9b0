// Search tool: query Google through the RAG Web Browser and return crawled pages

use crate::backend::SearchBackend;
use crate::error::{McpError, McpResult};
use crate::protocol::CallToolResult;
use crate::schema::{ArgumentSchema, FieldSpec};
use crate::tools::Tool;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const TOOL_SEARCH: &str = "search";

pub const DEFAULT_MAX_RESULTS: u32 = 1;

pub const SEARCH_DESCRIPTION: &str =
    "Search phrase or a URL at Google and return crawled web pages as text or Markdown";

/// Argument schema shared by the `search` tool and prompt
pub fn search_arguments() -> ArgumentSchema {
    ArgumentSchema::new()
        .field(
            FieldSpec::string(
                "query",
                "Google Search keywords or a URL of a specific web page",
            )
            .required(),
        )
        .field(
            FieldSpec::integer(
                "maxResults",
                "The maximum number of top organic Google Search results whose web pages will be extracted (default: 1)",
            )
            .positive()
            .at_most(i64::from(u32::MAX))
            .with_default(DEFAULT_MAX_RESULTS),
        )
}

/// Validated `search` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    pub query: String,
    pub max_results: u32,
}

impl SearchArgs {
    pub fn from_validated(arguments: &Map<String, Value>) -> McpResult<Self> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::Validation {
                fields: vec![crate::error::FieldError::new("query", "required field is missing")],
            })?
            .to_string();

        let max_results = match arguments.get("maxResults").and_then(Value::as_u64) {
            Some(n) => u32::try_from(n).map_err(|_| McpError::Validation {
                fields: vec![crate::error::FieldError::new(
                    "maxResults",
                    format!("must be at most {}, got {}", u32::MAX, n),
                )],
            })?,
            None => DEFAULT_MAX_RESULTS,
        };

        Ok(Self { query, max_results })
    }
}

/// Tool that forwards a search to the backend
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    arguments: ArgumentSchema,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            arguments: search_arguments(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        TOOL_SEARCH
    }

    fn description(&self) -> &str {
        SEARCH_DESCRIPTION
    }

    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }

    async fn execute(&self, arguments: Map<String, Value>) -> McpResult<CallToolResult> {
        let args = SearchArgs::from_validated(&arguments)?;
        tracing::info!(query = %args.query, max_results = args.max_results, "Running search");

        match self.backend.search(&args.query, args.max_results).await {
            Ok(body) => Ok(CallToolResult::text(body)),
            Err(e @ McpError::RemoteService(_)) | Err(e @ McpError::Http(_)) => {
                tracing::error!(error = %e, "Search failed");
                Ok(CallToolResult::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend double recording every call
    pub(crate) struct MockBackend {
        response: McpResult<String>,
        pub(crate) calls: AtomicUsize,
        pub(crate) last: Mutex<Option<(String, u32)>>,
    }

    impl MockBackend {
        pub(crate) fn returning(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }

        pub(crate) fn failing(reason: &str) -> Self {
            Self {
                response: Err(McpError::RemoteService(reason.to_string())),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SearchBackend for MockBackend {
        async fn search(&self, query: &str, max_results: u32) -> McpResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((query.to_string(), max_results));
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(McpError::RemoteService(reason)) => {
                    Err(McpError::RemoteService(reason.clone()))
                }
                Err(other) => Err(McpError::transport(other.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_default_max_results() {
        let backend = Arc::new(MockBackend::returning("[]"));
        let tool = SearchTool::new(backend.clone());

        let args = tool.arguments().validate(&serde_json::json!({"query": "rust"})).unwrap();
        tool.execute(args).await.unwrap();

        assert_eq!(
            *backend.last.lock().unwrap(),
            Some(("rust".to_string(), DEFAULT_MAX_RESULTS))
        );
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_error_result() {
        let backend = Arc::new(MockBackend::failing("Bad Gateway"));
        let tool = SearchTool::new(backend.clone());

        let args = tool.arguments().validate(&serde_json::json!({"query": "rust"})).unwrap();
        let result = tool.execute(args).await.unwrap();

        assert!(result.is_error());
        assert_eq!(
            result.joined_text(),
            "Error: Failed to call RAG Web Browser: Bad Gateway"
        );
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_max_results_beyond_u32_rejected() {
        let schema = search_arguments();
        let err = schema
            .validate(&serde_json::json!({"query": "q", "maxResults": 5_000_000_000u64}))
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");

        let args = schema
            .validate(&serde_json::json!({"query": "q", "maxResults": u32::MAX}))
            .unwrap();
        assert_eq!(SearchArgs::from_validated(&args).unwrap().max_results, u32::MAX);
    }

    #[test]
    fn test_schema_matches_contract() {
        let tool = SearchTool::new(Arc::new(MockBackend::returning("[]")));
        let schema = tool.schema();

        assert_eq!(schema.name, "search");
        assert_eq!(schema.input_schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema.input_schema["properties"]["maxResults"]["default"], 1);
    }
}
