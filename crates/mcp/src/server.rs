// MCP server: method-name dispatch over a fixed tool/prompt registry

use crate::backend::SearchBackend;
use crate::error::{McpError, McpResult};
use crate::prompts::{PromptRegistry, SearchPrompt};
use crate::protocol::{
    CallToolParams, GetPromptParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListChangedCapability, ListPromptsResult, ListToolsResult,
    ServerCapabilities, ServerInfo, PROTOCOL_VERSION,
};
use crate::tools::{SearchTool, ToolRegistry};
use crate::transport::Transport;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const SERVER_NAME: &str = "ragweb-mcp";

/// Handler for one JSON-RPC method
#[async_trait::async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, params: Option<Value>) -> McpResult<Value>;
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    Ok(serde_json::from_value(params.unwrap_or(Value::Null))?)
}

struct Initialize {
    info: ServerInfo,
}

#[async_trait::async_trait]
impl MethodHandler for Initialize {
    async fn handle(&self, _params: Option<Value>) -> McpResult<Value> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChangedCapability { list_changed: false }),
                prompts: Some(ListChangedCapability { list_changed: false }),
            },
            server_info: self.info.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }
}

struct Ping;

#[async_trait::async_trait]
impl MethodHandler for Ping {
    async fn handle(&self, _params: Option<Value>) -> McpResult<Value> {
        Ok(serde_json::json!({}))
    }
}

struct ListTools {
    tools: Arc<ToolRegistry>,
}

#[async_trait::async_trait]
impl MethodHandler for ListTools {
    async fn handle(&self, _params: Option<Value>) -> McpResult<Value> {
        tracing::info!("List available tools");
        let result = ListToolsResult {
            tools: self.tools.list_schemas(),
        };
        Ok(serde_json::to_value(result)?)
    }
}

struct CallTool {
    tools: Arc<ToolRegistry>,
}

#[async_trait::async_trait]
impl MethodHandler for CallTool {
    async fn handle(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = parse_params(params)?;
        tracing::info!(tool = %params.name, "Tool call");
        let result = self.tools.call(&params.name, &params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

struct ListPrompts {
    prompts: Arc<PromptRegistry>,
}

#[async_trait::async_trait]
impl MethodHandler for ListPrompts {
    async fn handle(&self, _params: Option<Value>) -> McpResult<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list_schemas(),
        };
        Ok(serde_json::to_value(result)?)
    }
}

struct GetPrompt {
    prompts: Arc<PromptRegistry>,
}

#[async_trait::async_trait]
impl MethodHandler for GetPrompt {
    async fn handle(&self, params: Option<Value>) -> McpResult<Value> {
        let params: GetPromptParams = parse_params(params)?;
        tracing::info!(prompt = %params.name, "Get prompt");
        let result = self.prompts.get(&params.name, &params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Transport-agnostic MCP server
pub struct McpServer {
    handlers: HashMap<&'static str, Box<dyn MethodHandler>>,
    tool_count: usize,
    shutdown: CancellationToken,
}

impl McpServer {
    pub fn new(tools: ToolRegistry, prompts: PromptRegistry) -> Self {
        let tools = Arc::new(tools);
        let prompts = Arc::new(prompts);
        let info = ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let mut handlers: HashMap<&'static str, Box<dyn MethodHandler>> = HashMap::new();
        handlers.insert("initialize", Box::new(Initialize { info }));
        handlers.insert("ping", Box::new(Ping));
        handlers.insert("tools/list", Box::new(ListTools { tools: tools.clone() }));
        handlers.insert("tools/call", Box::new(CallTool { tools: tools.clone() }));
        handlers.insert("prompts/list", Box::new(ListPrompts { prompts: prompts.clone() }));
        handlers.insert("prompts/get", Box::new(GetPrompt { prompts }));

        Self {
            handlers,
            tool_count: tools.len(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Server exposing the `search` tool and prompt over one backend
    pub fn with_backend(backend: Arc<dyn SearchBackend>) -> Self {
        let tools = ToolRegistry::new().with(Arc::new(SearchTool::new(backend.clone())));
        let prompts = PromptRegistry::new().with(Arc::new(SearchPrompt::new(backend)));
        Self::new(tools, prompts)
    }

    pub fn tool_count(&self) -> usize {
        self.tool_count
    }

    /// Stop dispatching. Serve loops waiting for input return, a request
    /// already in a handler finishes first.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("MCP server closing");
            self.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Dispatch one request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if self.is_closed() {
            tracing::debug!(method = %request.method, "Dropping request after close");
            return None;
        }

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let outcome = match self.handlers.get(request.method.as_str()) {
            Some(handler) => handler.handle(request.params).await,
            None => Err(McpError::UnknownMethod(request.method.clone())),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    kind = e.kind(),
                    error = %e,
                    "Request failed"
                );
                JsonRpcResponse::error(id, e.to_rpc_error())
            }
        })
    }

    /// Dispatch one raw message, returning the serialized response if any.
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(message) {
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
            }
            Ok(value) if is_response(&value) => {
                tracing::debug!(id = %value["id"], "Ignoring response from peer");
                None
            }
            Ok(value) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<JsonRpcRequest>(value) {
                    Ok(request) => self.handle_request(request).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid request");
                        Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()))
                    }
                }
            }
        };

        response.and_then(|r| match serde_json::to_string(&r) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                None
            }
        })
    }

    /// Serve requests from `transport` one at a time until the peer goes away
    /// or the server is closed. The transport is closed on exit.
    pub async fn serve<T: Transport + ?Sized>(&self, transport: &mut T) -> McpResult<()> {
        transport.connect().await?;
        tracing::info!("MCP server started");

        let outcome = self.serve_loop(transport).await;
        if let Err(e) = transport.close().await {
            tracing::debug!(error = %e, "Transport close failed");
        }
        tracing::info!("MCP server stopped");
        outcome
    }

    async fn serve_loop<T: Transport + ?Sized>(&self, transport: &mut T) -> McpResult<()> {
        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = transport.recv() => received?,
            };
            let Some(message) = received else {
                tracing::info!("Peer disconnected");
                break;
            };
            if self.is_closed() {
                break;
            }
            if let Some(response) = self.handle_message(&message).await {
                transport.send(response).await?;
            }
        }
        Ok(())
    }
}

/// A response object (`result` or `error`, no `method`) sent by the peer
fn is_response(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        !obj.contains_key("method") && (obj.contains_key("result") || obj.contains_key("error"))
    })
}
