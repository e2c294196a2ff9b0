// Standalone MCP server binary speaking line-delimited JSON-RPC on stdio

use anyhow::{Context, Result};
use ragweb_mcp::config::{resolve_token, API_TOKEN_KEY};
use ragweb_mcp::transport::StdioTransport;
use ragweb_mcp::{BackendConfig, McpServer, RagWebBrowserClient};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragweb_mcp=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("RAG Web Browser MCP server starting...");

    let token = resolve_token(std::env::var(API_TOKEN_KEY).ok(), std::env::args().skip(1));
    let config = BackendConfig::new(token);
    let backend = RagWebBrowserClient::new(&config)
        .with_context(|| format!("{} is required", API_TOKEN_KEY))?;

    let server = Arc::new(McpServer::with_backend(Arc::new(backend)));
    tracing::info!("Registered {} tools", server.tool_count());

    let mut transport = StdioTransport::stdio();
    let serving = {
        let server = server.clone();
        async move { server.serve(&mut transport).await }
    };
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => result?,
        _ = shutdown_signal() => {
            // Let the loop finish its current request and close the transport
            server.close();
            serving.await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
