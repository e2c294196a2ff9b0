//! Client-side transports for reaching an MCP server.

pub mod child;
pub mod sse;

pub use child::ChildProcessTransport;
pub use sse::SseClientTransport;
