//! Stream transport client: events from `GET /sse`, messages via `POST /message`.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use ragweb_mcp::transport::ConnectionState;
use ragweb_mcp::{McpError, McpResult, Transport};
use reqwest::{header, Client};
use std::pin::Pin;
use tokio_stream::Stream;
use url::Url;

type EventStream = Pin<Box<dyn Stream<Item = McpResult<eventsource_stream::Event>> + Send>>;

pub struct SseClientTransport {
    client: Client,
    sse_url: Url,
    post_url: Option<Url>,
    events: Option<EventStream>,
    state: ConnectionState,
}

impl SseClientTransport {
    pub fn new(sse_url: Url) -> Self {
        Self::with_client(Client::new(), sse_url)
    }

    pub fn with_client(client: Client, sse_url: Url) -> Self {
        Self {
            client,
            sse_url,
            post_url: None,
            events: None,
            state: ConnectionState::New,
        }
    }

    /// Where messages are posted, known once the endpoint event arrived
    pub fn endpoint(&self) -> Option<&Url> {
        self.post_url.as_ref()
    }

    async fn next_event(&mut self) -> McpResult<Option<eventsource_stream::Event>> {
        let events = self.events.as_mut().ok_or(McpError::ConnectionClosed)?;
        events.next().await.transpose()
    }
}

#[async_trait::async_trait]
impl Transport for SseClientTransport {
    async fn connect(&mut self) -> McpResult<()> {
        self.state.begin()?;

        let response = self
            .client
            .get(self.sse_url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            self.state = ConnectionState::Closed;
            return Err(McpError::transport(format!(
                "event stream request failed: {}",
                response.status()
            )));
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| event.map_err(|e| McpError::transport(format!("event stream: {}", e))));
        self.events = Some(Box::pin(stream));

        // The first event names the POST endpoint for this session
        loop {
            match self.next_event().await? {
                Some(event) if event.event == "endpoint" => {
                    let post_url = self.sse_url.join(event.data.trim()).map_err(|e| {
                        McpError::transport(format!("invalid endpoint '{}': {}", event.data, e))
                    })?;
                    tracing::info!(endpoint = %post_url, "SSE session established");
                    self.post_url = Some(post_url);
                    return Ok(());
                }
                Some(event) => {
                    tracing::debug!(event = %event.event, "Ignoring event before endpoint");
                }
                None => {
                    self.state = ConnectionState::Closed;
                    return Err(McpError::transport("event stream ended before endpoint event"));
                }
            }
        }
    }

    async fn send(&mut self, message: String) -> McpResult<()> {
        self.state.ensure_connected()?;
        let url = self.post_url.clone().ok_or(McpError::ConnectionClosed)?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::transport(format!(
                "message rejected ({}): {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn recv(&mut self) -> McpResult<Option<String>> {
        self.state.ensure_connected()?;
        loop {
            match self.next_event().await? {
                Some(event) if event.event == "message" => return Ok(Some(event.data)),
                Some(event) => {
                    tracing::debug!(event = %event.event, "Ignoring event");
                }
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> McpResult<()> {
        self.state = ConnectionState::Closed;
        self.events = None;
        self.post_url = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;
        server
    }

    fn sse_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/sse", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_connect_reads_endpoint_then_messages() {
        let server = sse_server(
            "event: endpoint\ndata: /message?session_id=abc\n\n\
             : keep-alive\n\n\
             event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n",
        )
        .await;

        let mut transport = SseClientTransport::new(sse_url(&server));
        transport.connect().await.unwrap();
        assert_eq!(
            transport.endpoint().unwrap().as_str(),
            format!("{}/message?session_id=abc", server.uri())
        );

        assert_eq!(
            transport.recv().await.unwrap().as_deref(),
            Some(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
        );
        assert_eq!(transport.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_posts_to_session_endpoint() {
        let server = sse_server("event: endpoint\ndata: /message?session_id=abc\n\n").await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .and(query_param("session_id", "abc"))
            .and(body_string("{\"id\":1}"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mut transport = SseClientTransport::new(sse_url(&server));
        transport.connect().await.unwrap();
        transport.send("{\"id\":1}".to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_message_is_error() {
        let server = sse_server("event: endpoint\ndata: /message?session_id=gone\n\n").await;
        Mock::given(method("POST"))
            .and(path("/message"))
            .respond_with(ResponseTemplate::new(404).set_body_string("No such session: gone"))
            .mount(&server)
            .await;

        let mut transport = SseClientTransport::new(sse_url(&server));
        transport.connect().await.unwrap();

        let err = transport.send("{}".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_stream_without_endpoint_fails() {
        let server = sse_server("event: message\ndata: {}\n\n").await;

        let mut transport = SseClientTransport::new(sse_url(&server));
        assert!(transport.connect().await.is_err());
    }
}
