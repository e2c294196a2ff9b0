//! Line-delimited JSON transport over any async reader/writer pair.

use super::{ConnectionState, Transport};
use crate::error::{McpError, McpResult};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Transport over this process's own stdin/stdout.
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

/// In-process transport end created by [`memory_pair`].
pub type MemoryTransport = LineTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// One JSON message per line.
pub struct LineTransport<R, W> {
    reader: FramedRead<R, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
    state: ConnectionState,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(reader, LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
            state: ConnectionState::New,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

/// Two connected in-memory transports, e.g. a client and a server in one process.
pub fn memory_pair(buffer: usize) -> (MemoryTransport, MemoryTransport) {
    let (a, b) = tokio::io::duplex(buffer);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);
    (
        LineTransport::new(a_read, a_write),
        LineTransport::new(b_read, b_write),
    )
}

#[async_trait::async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&mut self) -> McpResult<()> {
        self.state.begin()
    }

    async fn send(&mut self, message: String) -> McpResult<()> {
        self.state.ensure_connected()?;
        tracing::trace!(bytes = message.len(), "Sending line");
        self.writer
            .send(message)
            .await
            .map_err(|e| McpError::transport(format!("write failed: {}", e)))
    }

    async fn recv(&mut self) -> McpResult<Option<String>> {
        self.state.ensure_connected()?;
        loop {
            match self.reader.next().await {
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => return Ok(Some(line)),
                Some(Err(e)) => return Err(McpError::transport(format!("read failed: {}", e))),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        SinkExt::<String>::close(&mut self.writer)
            .await
            .map_err(|e| McpError::transport(format!("close failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pair_exchanges_lines() {
        let (mut a, mut b) = memory_pair(1024);
        a.connect().await.unwrap();
        b.connect().await.unwrap();

        a.send(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string())
            .await
            .unwrap();

        let got = b.recv().await.unwrap();
        assert_eq!(got.as_deref(), Some(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#));
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let (mut a, _b) = memory_pair(64);
        assert!(a.send("{}".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (mut a, mut b) = memory_pair(64);
        a.connect().await.unwrap();
        b.connect().await.unwrap();

        a.close().await.unwrap();
        assert_eq!(b.recv().await.unwrap(), None);
        assert!(matches!(
            a.send("{}".to_string()).await,
            Err(McpError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_blank_lines_skipped() {
        let input: &[u8] = b"\n\n{\"a\":1}\n";
        let mut transport = LineTransport::new(input, tokio::io::sink());
        transport.connect().await.unwrap();

        assert_eq!(transport.recv().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(transport.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let (mut a, _b) = memory_pair(64);
        a.connect().await.unwrap();
        assert!(a.connect().await.is_err());
    }
}
