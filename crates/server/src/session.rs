// SSE sessions: one open stream per token, POSTed messages routed to it

use chrono::{DateTime, Utc};
use ragweb_mcp::transport::ConnectionState;
use ragweb_mcp::{McpError, McpResult, Transport};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Buffered messages per direction before senders wait
const CHANNEL_CAPACITY: usize = 32;

struct Session {
    inbound: mpsc::Sender<String>,
    opened_at: DateTime<Utc>,
}

/// Summary of an open session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub opened_at: DateTime<Utc>,
}

/// Session table keyed by correlation token
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

/// A freshly opened session: the server's transport plus the stream feed
pub struct OpenedSession {
    pub session_id: Uuid,
    pub transport: SseTransport,
    pub outbound: mpsc::Receiver<String>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session under a fresh token.
    pub async fn open(&self) -> OpenedSession {
        let session_id = Uuid::new_v4();
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        self.sessions.write().await.insert(
            session_id,
            Session {
                inbound: inbound_tx,
                opened_at: Utc::now(),
            },
        );
        tracing::info!(%session_id, "SSE session opened");

        OpenedSession {
            session_id,
            transport: SseTransport::new(inbound_rx, outbound_tx),
            outbound: outbound_rx,
        }
    }

    /// Route one posted message to its session.
    pub async fn deliver(&self, session_id: &Uuid, message: String) -> McpResult<()> {
        let sender = self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.inbound.clone())
            .ok_or_else(|| McpError::Session(session_id.to_string()))?;

        if sender.send(message).await.is_err() {
            // Stream task already gone
            self.remove(session_id).await;
            return Err(McpError::Session(session_id.to_string()));
        }
        Ok(())
    }

    pub async fn remove(&self, session_id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(%session_id, "SSE session closed");
        }
        removed
    }

    /// Drop every session. Their serve loops see end of input and finish.
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        tracing::info!(count = sessions.len(), "Closing all SSE sessions");
        sessions.clear();
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, s)| SessionInfo {
                session_id: *id,
                opened_at: s.opened_at,
            })
            .collect();
        sessions.sort_by_key(|s| s.opened_at);
        sessions
    }
}

/// Server side of one SSE session
pub struct SseTransport {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
    state: ConnectionState,
}

impl SseTransport {
    fn new(inbound: mpsc::Receiver<String>, outbound: mpsc::Sender<String>) -> Self {
        Self {
            inbound,
            outbound,
            state: ConnectionState::New,
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn connect(&mut self) -> McpResult<()> {
        self.state.begin()
    }

    async fn send(&mut self, message: String) -> McpResult<()> {
        self.state.ensure_connected()?;
        self.outbound
            .send(message)
            .await
            .map_err(|_| McpError::ConnectionClosed)
    }

    async fn recv(&mut self) -> McpResult<Option<String>> {
        self.state.ensure_connected()?;
        tokio::select! {
            message = self.inbound.recv() => Ok(message),
            // Client dropped the event stream
            _ = self.outbound.closed() => Ok(None),
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        self.state = ConnectionState::Closed;
        self.inbound.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_routes_to_session() {
        let manager = SessionManager::new();
        let mut opened = manager.open().await;
        opened.transport.connect().await.unwrap();

        manager
            .deliver(&opened.session_id, "{\"id\":1}".to_string())
            .await
            .unwrap();

        assert_eq!(
            opened.transport.recv().await.unwrap().as_deref(),
            Some("{\"id\":1}")
        );
    }

    #[tokio::test]
    async fn test_unknown_session_leaves_others_untouched() {
        let manager = SessionManager::new();
        let mut first = manager.open().await;
        first.transport.connect().await.unwrap();

        let err = manager
            .deliver(&Uuid::new_v4(), "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Session(_)));
        assert_eq!(manager.count().await, 1);

        manager.deliver(&first.session_id, "{}".to_string()).await.unwrap();
        assert_eq!(first.transport.recv().await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_send_reaches_stream() {
        let manager = SessionManager::new();
        let mut opened = manager.open().await;
        opened.transport.connect().await.unwrap();

        opened.transport.send("hello".to_string()).await.unwrap();
        assert_eq!(opened.outbound.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_dropped_stream_ends_recv() {
        let manager = SessionManager::new();
        let OpenedSession {
            mut transport,
            outbound,
            ..
        } = manager.open().await;
        transport.connect().await.unwrap();

        drop(outbound);
        assert_eq!(transport.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_all_ends_recv() {
        let manager = SessionManager::new();
        let mut opened = manager.open().await;
        opened.transport.connect().await.unwrap();

        manager.close_all().await;
        assert_eq!(manager.count().await, 0);
        assert_eq!(opened.transport.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deliver_after_transport_gone_removes_session() {
        let manager = SessionManager::new();
        let opened = manager.open().await;
        let id = opened.session_id;
        drop(opened);

        assert!(manager.deliver(&id, "{}".to_string()).await.is_err());
        assert_eq!(manager.count().await, 0);
    }
}
