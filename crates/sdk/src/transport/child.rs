//! Pipe transport to a spawned server process.

use ragweb_mcp::config::API_TOKEN_KEY;
use ragweb_mcp::transport::{ConnectionState, LineTransport};
use ragweb_mcp::{McpError, McpResult, Transport};
use std::process::Stdio;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Line-delimited JSON over a child's stdin/stdout. The child lives as long
/// as the transport and is killed on close or drop.
pub struct ChildProcessTransport {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    child: Option<Child>,
    io: Option<LineTransport<ChildStdout, ChildStdin>>,
    state: ConnectionState,
}

impl ChildProcessTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            child: None,
            io: None,
            state: ConnectionState::New,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Hand the search credential to the server as `APIFY_API_TOKEN=<token>`
    /// and through its environment.
    pub fn with_api_token(self, token: &str) -> Self {
        self.arg(format!("{}={}", API_TOKEN_KEY, token))
            .env(API_TOKEN_KEY, token)
    }

    /// Process id of the running child
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn io(&mut self) -> McpResult<&mut LineTransport<ChildStdout, ChildStdin>> {
        self.state.ensure_connected()?;
        self.io.as_mut().ok_or(McpError::ConnectionClosed)
    }
}

#[async_trait::async_trait]
impl Transport for ChildProcessTransport {
    async fn connect(&mut self) -> McpResult<()> {
        self.state.begin()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            self.state = ConnectionState::Closed;
            McpError::transport(format!("failed to spawn '{}': {}", self.program, e))
        })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                self.state = ConnectionState::Closed;
                return Err(McpError::transport("failed to capture child stdio"));
            }
        };

        let mut io = LineTransport::new(stdout, stdin);
        io.connect().await?;

        tracing::info!(program = %self.program, pid = ?child.id(), "Spawned MCP server");
        self.child = Some(child);
        self.io = Some(io);
        Ok(())
    }

    async fn send(&mut self, message: String) -> McpResult<()> {
        self.io()?.send(message).await
    }

    async fn recv(&mut self) -> McpResult<Option<String>> {
        self.io()?.recv().await
    }

    async fn close(&mut self) -> McpResult<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;

        if let Some(mut io) = self.io.take() {
            if let Err(e) = io.close().await {
                tracing::debug!(error = %e, "Closing child stdin failed");
            }
        }

        if let Some(mut child) = self.child.take() {
            // kill() also reaps the process
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to stop MCP server process");
            }
        }
        Ok(())
    }
}
