//! # ragweb SDK
//!
//! Client side of the RAG Web Browser MCP server: a protocol client over
//! pipe or SSE transports, and a conversation bridge that lets Claude call
//! the server's `search` tool while answering.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ragweb_sdk::{ChildProcessTransport, McpClient, SdkResult};
//!
//! #[tokio::main]
//! async fn main() -> SdkResult<()> {
//!     let transport = ChildProcessTransport::new("ragweb-mcp").with_api_token("apify_api_...");
//!     let mut client = McpClient::connect(transport).await?;
//!
//!     for tool in client.list_tools().await? {
//!         println!("{}: {}", tool.name, tool.description);
//!     }
//!
//!     let result = client
//!         .call_tool("search", serde_json::json!({"query": "web browser for Anthropic"}))
//!         .await?;
//!     println!("{}", result.joined_text());
//!
//!     client.close().await
//! }
//! ```
//!
//! ## Chat Bridge
//!
//! ```rust,no_run
//! use ragweb_sdk::{AnthropicModel, BridgeConfig, ChildProcessTransport, ConversationBridge, McpClient, ModelConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> ragweb_sdk::SdkResult<()> {
//! let client = McpClient::connect(ChildProcessTransport::new("ragweb-mcp")).await?;
//! let model = Arc::new(AnthropicModel::new(ModelConfig::from_env()?)?);
//!
//! let mut bridge = ConversationBridge::new(model, client, BridgeConfig::default()).await?;
//! println!("{}", bridge.process_query("What is Apify?").await?);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod repl;
pub mod tokens;
pub mod transport;

pub use bridge::{BridgeState, ConversationBridge, ToolInvoker};
pub use client::McpClient;
pub use config::{BridgeConfig, ModelConfig};
pub use error::{SdkError, SdkResult};
pub use model::{AnthropicModel, ContentBlock, ModelBackend, Role, Turn};
pub use repl::ChatRepl;
pub use tokens::{CharacterEstimator, TokenCounter, TruncationPolicy};
pub use transport::{ChildProcessTransport, SseClientTransport};

// Re-export protocol types for convenience
pub use ragweb_mcp::protocol::{CallToolResult, PromptSchema, ToolContent, ToolSchema};
pub use ragweb_mcp::Transport;
