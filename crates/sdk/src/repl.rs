//! Interactive chat loop around a [`ConversationBridge`].

use crate::bridge::{ConversationBridge, ToolInvoker};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const EXIT_WORDS: [&str; 3] = ["quit", "q", "exit"];

pub struct ChatRepl {
    prompt: String,
}

impl Default for ChatRepl {
    fn default() -> Self {
        Self {
            prompt: "You: ".to_string(),
        }
    }
}

impl ChatRepl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Read queries line by line until an exit word or end of input.
    pub async fn run<I, R, W>(
        &self,
        bridge: &mut ConversationBridge<I>,
        input: R,
        mut output: W,
    ) -> std::io::Result<()>
    where
        I: ToolInvoker,
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output
            .write_all(b"MCP Client Started!\nType your queries or 'quit|q|exit' to exit.\n")
            .await?;

        let mut lines = input.lines();
        loop {
            output.write_all(self.prompt.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit(query) {
                break;
            }

            let reply = match bridge.process_query(query).await {
                Ok(answer) => format!("\nAssistant: {}\n\n", answer),
                Err(e) => {
                    tracing::error!(error = %e, "Query failed");
                    format!("\nError processing query: {}\n\n", e)
                }
            };
            output.write_all(reply.as_bytes()).await?;
        }

        output.write_all(b"\nGoodbye!\n").await?;
        output.flush().await
    }
}

fn is_exit(line: &str) -> bool {
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}
