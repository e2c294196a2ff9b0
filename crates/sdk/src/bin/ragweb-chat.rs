// Interactive chat: Claude answers questions, calling the RAG Web Browser tool as needed

use anyhow::{Context, Result};
use clap::Parser;
use ragweb_sdk::{
    AnthropicModel, BridgeConfig, ChatRepl, ChildProcessTransport, ConversationBridge, McpClient,
    ModelConfig, SseClientTransport, Transport,
};
use std::sync::Arc;
use tokio::io::BufReader;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "ragweb-chat")]
#[command(about = "Chat with Claude using the RAG Web Browser MCP server", long_about = None)]
struct Args {
    /// MCP server executable to spawn over stdio
    #[arg(long, default_value = "ragweb-mcp")]
    server: String,

    /// Connect to a running SSE server instead, e.g. http://localhost:3001/sse
    #[arg(long)]
    sse_url: Option<Url>,

    /// Model identifier
    #[arg(long, default_value = ragweb_sdk::config::DEFAULT_MODEL)]
    model: String,

    /// Tool results above this many tokens are truncated
    #[arg(long, default_value_t = ragweb_sdk::config::DEFAULT_TOKEN_CEILING)]
    token_ceiling: usize,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: String,

    /// Apify API token handed to the spawned server
    #[arg(long, env = "APIFY_API_TOKEN", hide_env_values = true)]
    apify_api_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let transport: Box<dyn Transport> = match &args.sse_url {
        Some(url) => Box::new(SseClientTransport::new(url.clone())),
        None => {
            let mut child = ChildProcessTransport::new(&args.server);
            if let Some(token) = &args.apify_api_token {
                child = child.with_api_token(token);
            }
            Box::new(child)
        }
    };

    let client = McpClient::connect(transport)
        .await
        .context("Failed to connect to MCP server")?;

    let model_config = ModelConfig::new(args.anthropic_api_key)?.with_model(args.model);
    let model = Arc::new(AnthropicModel::new(model_config)?);

    let config = BridgeConfig {
        token_ceiling: args.token_ceiling,
        ..BridgeConfig::default()
    };
    let mut bridge = ConversationBridge::new(model, client, config).await?;

    let names: Vec<_> = bridge.tools().iter().map(|t| t.name.as_str()).collect();
    println!("Connected to server with tools: {:?}", names);

    let outcome = ChatRepl::new()
        .run(
            &mut bridge,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await;

    bridge.invoker_mut().close().await.ok();
    outcome.context("Chat loop failed")
}
