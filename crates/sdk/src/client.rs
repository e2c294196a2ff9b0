//! Protocol client for an MCP server reachable over any [`Transport`].

use crate::error::{SdkError, SdkResult};
use ragweb_mcp::protocol::{
    CallToolParams, CallToolResult, ClientInfo, GetPromptParams, GetPromptResult,
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListPromptsResult,
    ListToolsResult, PromptSchema, ServerInfo, ToolSchema, PROTOCOL_VERSION,
};
use ragweb_mcp::{McpError, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Client name announced during the handshake.
pub const CLIENT_NAME: &str = "ragweb-sdk";

/// An MCP client bound to one connected transport.
///
/// Requests are issued one at a time; each call waits for the response with
/// the matching id before returning.
pub struct McpClient<T: Transport> {
    transport: T,
    next_id: u64,
    server_info: Option<ServerInfo>,
}

impl<T: Transport> McpClient<T> {
    /// Connect the transport and complete the initialize handshake.
    pub async fn connect(mut transport: T) -> SdkResult<Self> {
        transport.connect().await?;

        let mut client = Self {
            transport,
            next_id: 1,
            server_info: None,
        };

        match client.initialize().await {
            Ok(()) => Ok(client),
            Err(e) => {
                client.close().await.ok();
                Err(e)
            }
        }
    }

    async fn initialize(&mut self) -> SdkResult<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: ClientInfo {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result: InitializeResult = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        tracing::info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = %result.protocol_version,
            "Connected to MCP server"
        );
        self.server_info = Some(result.server_info);

        self.notify("notifications/initialized", None).await
    }

    /// Server info reported during the handshake.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub async fn ping(&mut self) -> SdkResult<()> {
        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    pub async fn list_tools(&mut self) -> SdkResult<Vec<ToolSchema>> {
        let result: ListToolsResult = self.request("tools/list", None).await?;
        Ok(result.tools)
    }

    /// Call a tool. A result flagged `isError` is returned as is.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> SdkResult<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.request("tools/call", Some(serde_json::to_value(params)?))
            .await
    }

    pub async fn list_prompts(&mut self) -> SdkResult<Vec<PromptSchema>> {
        let result: ListPromptsResult = self.request("prompts/list", None).await?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(&mut self, name: &str, arguments: Value) -> SdkResult<GetPromptResult> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        self.request("prompts/get", Some(serde_json::to_value(params)?))
            .await
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> SdkResult<()> {
        self.transport.close().await?;
        Ok(())
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> SdkResult<()> {
        let notification = JsonRpcRequest::notification(method, params);
        self.transport
            .send(serde_json::to_string(&notification)?)
            .await?;
        Ok(())
    }

    async fn request<R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> SdkResult<R> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        tracing::debug!(id, method, "Sending request");
        self.transport.send(serde_json::to_string(&request)?).await?;

        loop {
            let message = self
                .transport
                .recv()
                .await?
                .ok_or(McpError::ConnectionClosed)?;

            let value: Value = match serde_json::from_str(&message) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unparseable message");
                    continue;
                }
            };

            if value.get("method").is_some() {
                tracing::debug!(method = ?value["method"], "Ignoring server-initiated message");
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_value(value)?;
            if response.id != Value::from(id) {
                tracing::warn!(expected = id, got = %response.id, "Discarding unmatched response");
                continue;
            }

            if let Some(error) = response.error {
                return Err(SdkError::Mcp(McpError::from_rpc_error(error)));
            }

            let result = response.result.unwrap_or(Value::Null);
            return Ok(serde_json::from_value(result)?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragweb_mcp::transport::{memory_pair, MemoryTransport};
    use ragweb_mcp::{McpResult, McpServer, SearchBackend};
    use std::sync::Arc;

    struct StaticBackend;

    #[async_trait::async_trait]
    impl SearchBackend for StaticBackend {
        async fn search(&self, query: &str, max_results: u32) -> McpResult<String> {
            Ok(serde_json::json!({"query": query, "maxResults": max_results}).to_string())
        }
    }

    async fn connected() -> (McpClient<MemoryTransport>, tokio::task::JoinHandle<McpResult<()>>) {
        let (client_end, mut server_end) = memory_pair(64 * 1024);
        let server = McpServer::with_backend(Arc::new(StaticBackend));
        let task = tokio::spawn(async move { server.serve(&mut server_end).await });

        let client = McpClient::connect(client_end).await.unwrap();
        (client, task)
    }

    #[tokio::test]
    async fn test_handshake_and_list_tools() {
        let (mut client, task) = connected().await;

        assert_eq!(client.server_info().unwrap().name, "ragweb-mcp");
        client.ping().await.unwrap();

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search");

        client.close().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_call_tool_returns_text() {
        let (mut client, _task) = connected().await;

        let result = client
            .call_tool("search", serde_json::json!({"query": "apify", "maxResults": 3}))
            .await
            .unwrap();

        assert!(!result.is_error());
        let body: Value = serde_json::from_str(&result.joined_text()).unwrap();
        assert_eq!(body["query"], "apify");
        assert_eq!(body["maxResults"], 3);
    }

    #[tokio::test]
    async fn test_error_response_becomes_rpc_error() {
        let (mut client, _task) = connected().await;

        let err = client
            .call_tool("search", serde_json::json!({"maxResults": 0}))
            .await
            .unwrap_err();

        match err {
            SdkError::Mcp(McpError::Rpc { code, data, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(data.unwrap()["kind"], "ValidationError");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prompts() {
        let (mut client, _task) = connected().await;

        let prompts = client.list_prompts().await.unwrap();
        assert_eq!(prompts[0].name, "search");

        let prompt = client
            .get_prompt("search", serde_json::json!({"query": "rust"}))
            .await
            .unwrap();
        assert_eq!(
            prompt.description.as_deref(),
            Some("Markdown content for search query: rust")
        );
    }

    #[tokio::test]
    async fn test_server_gone_is_connection_closed() {
        let (client_end, server_end) = memory_pair(1024);
        drop(server_end);

        let err = McpClient::connect(client_end).await.err().unwrap();
        assert!(matches!(
            err,
            SdkError::Mcp(McpError::ConnectionClosed) | SdkError::Mcp(McpError::Transport(_))
        ));
    }
}
