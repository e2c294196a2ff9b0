//! Model adapter: conversation types and the Anthropic Messages API client.

use crate::config::ModelConfig;
use crate::error::{SdkError, SdkResult};
use ragweb_mcp::protocol::ToolSchema;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content block of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: TurnContent::Blocks(blocks),
        }
    }
}

/// Tool advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<ToolSchema> for ModelTool {
    fn from(schema: ToolSchema) -> Self {
        Self {
            name: schema.name,
            description: schema.description,
            input_schema: schema.input_schema,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ModelTool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelReply {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Text and tool-call generator
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model identifier placed in requests
    fn model(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> SdkResult<ModelReply>;
}

/// Messages API client
pub struct AnthropicModel {
    client: Client,
    config: ModelConfig,
}

impl AnthropicModel {
    pub fn new(config: ModelConfig) -> SdkResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl ModelBackend for AnthropicModel {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &ModelRequest) -> SdkResult<ModelReply> {
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            tools = request.tools.len(),
            "Messages request"
        );

        let response = self
            .client
            .post(self.config.messages_url()?)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SdkError::from_response(status.as_u16(), &body));
        }

        let reply: ModelReply = serde_json::from_str(&body)?;
        tracing::debug!(
            blocks = reply.content.len(),
            stop_reason = ?reply.stop_reason,
            "Messages reply"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_for(server: &MockServer) -> AnthropicModel {
        let config = ModelConfig::new("sk-test")
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap();
        AnthropicModel::new(config).unwrap()
    }

    fn request() -> ModelRequest {
        ModelRequest {
            model: "claude-test".to_string(),
            max_tokens: 1024,
            messages: vec![Turn::user("What is Apify?")],
            tools: vec![ModelTool {
                name: "search".to_string(),
                description: "Search".to_string(),
                input_schema: json!({"type": "object"}),
            }],
        }
    }

    #[test]
    fn test_turn_serialization() {
        let turns = vec![
            Turn::user("hi"),
            Turn::blocks(
                Role::Assistant,
                vec![ContentBlock::ToolUse {
                    id: "tu_1".to_string(),
                    name: "search".to_string(),
                    input: json!({"query": "x"}),
                }],
            ),
            Turn::blocks(
                Role::User,
                vec![ContentBlock::ToolResult {
                    tool_use_id: "tu_1".to_string(),
                    content: "{}".to_string(),
                    is_error: false,
                }],
            ),
        ];

        assert_eq!(
            serde_json::to_value(&turns).unwrap(),
            json!([
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "tu_1", "name": "search", "input": {"query": "x"}}
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "tu_1", "content": "{}"}
                ]}
            ])
        );
    }

    #[tokio::test]
    async fn test_complete_parses_text_and_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "tools": [{"name": "search"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-test",
                "content": [
                    {"type": "text", "text": "Let me look."},
                    {"type": "tool_use", "id": "tu_1", "name": "search", "input": {"query": "apify"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = model_for(&server).complete(&request()).await.unwrap();

        assert_eq!(reply.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(reply.content[0], ContentBlock::text("Let me look."));
        assert!(matches!(
            &reply.content[1],
            ContentBlock::ToolUse { name, input, .. }
                if name == "search" && input["query"] == "apify"
        ));
    }

    #[tokio::test]
    async fn test_complete_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .mount(&server)
            .await;

        let err = model_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            SdkError::Model { status: 401, ref message } if message == "invalid x-api-key"
        ));
    }
}
