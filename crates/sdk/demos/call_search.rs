//! Connect to the MCP server over stdio, list its tools and call `search`.
//!
//! Run with: `cargo run --example call_search -- [path/to/ragweb-mcp]`
//! `APIFY_API_TOKEN` must be set.

use ragweb_sdk::{ChildProcessTransport, McpClient, SdkError};

#[tokio::main]
async fn main() -> Result<(), SdkError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let server = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ragweb-mcp".to_string());
    let token = std::env::var("APIFY_API_TOKEN")
        .map_err(|_| SdkError::Config("APIFY_API_TOKEN is not set".to_string()))?;

    let transport = ChildProcessTransport::new(server).with_api_token(&token);
    let mut client = McpClient::connect(transport).await?;

    // List available tools
    let tools = client.list_tools().await?;
    println!("Available tools:");
    for tool in &tools {
        println!("  {} - {}", tool.name, tool.description);
    }

    // Call a tool
    println!("\nCalling rag web browser ...");
    let result = client
        .call_tool(
            "search",
            serde_json::json!({ "query": "web browser for Anthropic" }),
        )
        .await?;
    println!("Tool result: {}", serde_json::to_string(&result)?);

    client.close().await
}
