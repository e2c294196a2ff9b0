//! Conversation bridge: lets the model call MCP tools while answering a query.

use crate::client::McpClient;
use crate::config::BridgeConfig;
use crate::error::SdkResult;
use crate::model::{ContentBlock, ModelBackend, ModelRequest, ModelTool, Role, Turn, TurnContent};
use crate::tokens::TruncationPolicy;
use ragweb_mcp::protocol::{CallToolResult, ToolSchema};
use ragweb_mcp::Transport;
use serde_json::Value;
use std::sync::Arc;

/// Where the bridge is within the current query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    AwaitingModel,
    ExecutingTool,
    Done,
}

/// Source of tools the model may call
#[async_trait::async_trait]
pub trait ToolInvoker: Send {
    async fn list_tools(&mut self) -> SdkResult<Vec<ToolSchema>>;

    async fn call_tool(&mut self, name: &str, arguments: Value) -> SdkResult<CallToolResult>;
}

#[async_trait::async_trait]
impl<T: Transport> ToolInvoker for McpClient<T> {
    async fn list_tools(&mut self) -> SdkResult<Vec<ToolSchema>> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> SdkResult<CallToolResult> {
        McpClient::call_tool(self, name, arguments).await
    }
}

pub struct ConversationBridge<I: ToolInvoker> {
    model: Arc<dyn ModelBackend>,
    invoker: I,
    tools: Vec<ModelTool>,
    config: BridgeConfig,
    truncation: TruncationPolicy,
    state: BridgeState,
}

impl<I: ToolInvoker> ConversationBridge<I> {
    /// Discover the invoker's tools and build a bridge advertising all of them.
    pub async fn new(
        model: Arc<dyn ModelBackend>,
        mut invoker: I,
        config: BridgeConfig,
    ) -> SdkResult<Self> {
        let tools: Vec<ModelTool> = invoker
            .list_tools()
            .await?
            .into_iter()
            .map(ModelTool::from)
            .collect();
        tracing::info!(
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Bridge ready"
        );

        let truncation = TruncationPolicy::new(config.token_ceiling);
        Ok(Self {
            model,
            invoker,
            tools,
            config,
            truncation,
            state: BridgeState::Done,
        })
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn tools(&self) -> &[ModelTool] {
        &self.tools
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn invoker_mut(&mut self) -> &mut I {
        &mut self.invoker
    }

    /// Answer one user query. History starts fresh with every call.
    ///
    /// Each tool the model asks for is run in order. A successful result is
    /// fed back for exactly one follow-up reply; tool calls inside that
    /// follow-up are not executed. Tool failures are reported in the output
    /// and never abort the query. Only a failure of the first model request
    /// is returned as an error.
    pub async fn process_query(&mut self, query: &str) -> SdkResult<String> {
        self.state = BridgeState::AwaitingModel;
        let mut history = vec![Turn::user(query)];

        let reply = match self.complete(&history, self.config.max_tokens).await {
            Ok(reply) => reply,
            Err(e) => {
                self.state = BridgeState::Done;
                return Err(e);
            }
        };

        let mut output = Vec::new();
        let mut preceding = Vec::new();

        for block in reply.content {
            match block {
                ContentBlock::Text { text } => {
                    output.push(text.clone());
                    preceding.push(ContentBlock::Text { text });
                }
                ContentBlock::ToolUse { id, name, input } => {
                    self.state = BridgeState::ExecutingTool;
                    output.push(format!(
                        "[Calling tool: {} with arguments {}]",
                        name, input
                    ));

                    let text = match self.invoke(&name, input.clone()).await {
                        Ok(text) => text,
                        Err(reason) => {
                            tracing::warn!(tool = %name, %reason, "Tool call failed");
                            output.push(format!("[Error calling tool {}: {}]", name, reason));
                            continue;
                        }
                    };

                    let mut blocks = std::mem::take(&mut preceding);
                    blocks.push(ContentBlock::ToolUse { id: id.clone(), name, input });
                    push_assistant(&mut history, blocks);
                    history.push(Turn::blocks(
                        Role::User,
                        vec![ContentBlock::ToolResult {
                            tool_use_id: id,
                            content: self.truncation.apply(text),
                            is_error: false,
                        }],
                    ));

                    self.state = BridgeState::AwaitingModel;
                    match self.complete(&history, self.config.follow_up_max_tokens).await {
                        Ok(follow_up) => {
                            let texts = self.follow_up_text(follow_up.content);
                            output.extend(texts.iter().cloned());
                            push_assistant(
                                &mut history,
                                texts.into_iter().map(ContentBlock::text).collect(),
                            );
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Follow-up request failed");
                            output.push(format!("[Error getting follow-up response: {}]", e));
                        }
                    }
                }
                ContentBlock::ToolResult { .. } => {
                    tracing::debug!("Ignoring tool_result block in model reply");
                }
            }
        }

        self.state = BridgeState::Done;
        Ok(output.join("\n"))
    }

    async fn complete(
        &self,
        history: &[Turn],
        max_tokens: u32,
    ) -> SdkResult<crate::model::ModelReply> {
        let request = ModelRequest {
            model: self.model.model().to_string(),
            max_tokens,
            messages: history.to_vec(),
            tools: self.tools.clone(),
        };
        self.model.complete(&request).await
    }

    /// Text of a successful call, or the reason it failed
    async fn invoke(&mut self, name: &str, arguments: Value) -> Result<String, String> {
        match self.invoker.call_tool(name, arguments).await {
            Ok(result) if result.is_error() => {
                let text = result.joined_text();
                Err(text.strip_prefix("Error: ").unwrap_or(&text).to_string())
            }
            Ok(result) => Ok(result.joined_text()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn follow_up_text(&self, content: Vec<ContentBlock>) -> Vec<String> {
        content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::ToolUse { name, .. } => {
                    // Only one level of tool use per query
                    tracing::warn!(
                        tool = %name,
                        "Follow-up requested another tool call; not executed"
                    );
                    None
                }
                ContentBlock::ToolResult { .. } => None,
            })
            .collect()
    }
}

/// Append assistant blocks, merging into a trailing assistant turn
fn push_assistant(history: &mut Vec<Turn>, blocks: Vec<ContentBlock>) {
    if blocks.is_empty() {
        return;
    }

    if let Some(last) = history.last_mut() {
        if last.role == Role::Assistant {
            match &mut last.content {
                TurnContent::Blocks(existing) => existing.extend(blocks),
                TurnContent::Text(text) => {
                    let mut merged = vec![ContentBlock::text(std::mem::take(text))];
                    merged.extend(blocks);
                    last.content = TurnContent::Blocks(merged);
                }
            }
            return;
        }
    }

    history.push(Turn::blocks(Role::Assistant, blocks));
}
