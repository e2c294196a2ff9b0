//! Transport layer: one capability interface, independent implementations.
//!
//! The server and client drive [`Transport::recv`] in their own loops, so the
//! loop body is the message handler for whichever transport is attached.

pub mod stdio;

pub use stdio::{memory_pair, LineTransport, MemoryTransport, StdioTransport};

use crate::error::{McpError, McpResult};

/// Bidirectional channel carrying one serialized protocol message per frame.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Establish the channel. Succeeds once per instance.
    async fn connect(&mut self) -> McpResult<()>;

    /// Deliver one message to the peer.
    async fn send(&mut self, message: String) -> McpResult<()>;

    /// Next message from the peer, `None` once the peer has gone away.
    async fn recv(&mut self) -> McpResult<Option<String>>;

    /// Tear the channel down. Further sends fail.
    async fn close(&mut self) -> McpResult<()>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn connect(&mut self) -> McpResult<()> {
        (**self).connect().await
    }

    async fn send(&mut self, message: String) -> McpResult<()> {
        (**self).send(message).await
    }

    async fn recv(&mut self) -> McpResult<Option<String>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> McpResult<()> {
        (**self).close().await
    }
}

/// Lifecycle shared by transport implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    New,
    Connected,
    Closed,
}

impl ConnectionState {
    /// Move `New -> Connected`; any other starting state is an error.
    pub fn begin(&mut self) -> McpResult<()> {
        match self {
            Self::New => {
                *self = Self::Connected;
                Ok(())
            }
            Self::Connected => Err(McpError::transport(
                "already connected; create a new transport to reconnect",
            )),
            Self::Closed => Err(McpError::transport(
                "transport closed; create a new transport to reconnect",
            )),
        }
    }

    pub fn ensure_connected(&self) -> McpResult<()> {
        match self {
            Self::Connected => Ok(()),
            Self::New => Err(McpError::transport("not connected")),
            Self::Closed => Err(McpError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_once() {
        let mut state = ConnectionState::default();
        assert!(state.ensure_connected().is_err());

        state.begin().unwrap();
        assert!(state.ensure_connected().is_ok());
        assert!(state.begin().is_err());

        state = ConnectionState::Closed;
        assert!(matches!(state.ensure_connected(), Err(McpError::ConnectionClosed)));
        assert!(state.begin().is_err());
    }
}
