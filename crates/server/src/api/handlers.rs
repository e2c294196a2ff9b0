use super::{ApiError, ApiResult};
use crate::config::AppState;
use crate::session::OpenedSession;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::Stream;
use ragweb_mcp::McpError;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

/// Open an event stream and start serving its session
pub async fn open_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let OpenedSession {
        session_id,
        mut transport,
        mut outbound,
    } = state.sessions.open().await;

    let server = state.mcp.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        if let Err(e) = server.serve(&mut transport).await {
            tracing::warn!(%session_id, error = %e, "SSE session failed");
        }
        sessions.remove(&session_id).await;
    });

    let endpoint = format!("/message?session_id={}", session_id);
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));

        while let Some(message) = outbound.recv().await {
            yield Ok::<_, Infallible>(Event::default().event("message").data(message));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keep-alive"),
    )
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub session_id: Option<String>,
}

/// Accept one client message for an open session
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let token = query
        .session_id
        .ok_or_else(|| ApiError::bad_request("session_id query parameter is required"))?;

    let session_id =
        Uuid::parse_str(&token).map_err(|_| ApiError::not_found(McpError::Session(token.clone())))?;

    state
        .sessions
        .deliver(&session_id, body)
        .await
        .map_err(ApiError::not_found)?;

    Ok((StatusCode::ACCEPTED, "Accepted"))
}
