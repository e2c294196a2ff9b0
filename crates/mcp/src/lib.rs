// MCP (Model Context Protocol) server for the RAG Web Browser
// Exposes a `search` tool and prompt to agent clients over stdio or SSE

pub mod backend;
pub mod config;
pub mod error;
pub mod prompts;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;

pub use backend::{RagWebBrowserClient, SearchBackend};
pub use config::BackendConfig;
pub use error::{McpError, McpResult};
pub use server::McpServer;
pub use transport::Transport;
