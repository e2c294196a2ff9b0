use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod session;

use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "ragweb")]
#[command(about = "RAG Web Browser MCP server over Server-Sent Events", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ragweb.toml")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Apify API token for the RAG Web Browser
    #[arg(long, env = "APIFY_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragweb=info,ragweb_mcp=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting RAG Web Browser SSE server");

    // Load configuration
    let config = ServerConfig::load(&args.config)?;
    let state = AppState::new(&config, args.api_token)?;

    let addr = format!("{}:{}", args.host, args.port);
    api::serve(&addr, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
