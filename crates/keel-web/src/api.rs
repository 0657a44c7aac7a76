//! REST endpoint handlers.
//!
//! `/api/chat` answers with a server-sent event stream. Every frame is a
//! `data:` line holding either `{"content": "..."}` or, once, a terminal
//! `{"error": "..."}`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use keel::chat::ChatService;
use keel::provider::{ChunkStream, ProviderChunk};
use keel::registry::ModelListing;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

// ── Errors ─────────────────────────────────────────────────────────

/// JSON error body: `{"error": "..."}`.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler failures, rendered as a status code plus [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Handlers ───────────────────────────────────────────────────────

/// GET /api/models: Registered models and the default id.
pub async fn get_models(State(app): State<AppState>) -> Json<ModelListing> {
    Json(app.chat.registry().listing())
}

/// Request body for POST /api/chat.
#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session")]
    pub session_id: String,
    /// Registry id. Omitted means the registry default.
    #[serde(default)]
    pub model: Option<String>,
}

/// POST /api/chat: Run one chat turn and stream the reply.
///
/// Returns 400 for an unreadable body, an empty message or an unknown
/// model. Once streaming has started, provider failures arrive in-band as an
/// `error` frame, and the reply is only recorded when the stream completes.
pub async fn post_chat(
    State(app): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(body) = body?;
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".into()));
    }

    let turn = app
        .chat
        .begin_turn(&body.session_id, &body.message, body.model.as_deref())
        .await
        .map_err(|e| {
            debug!("Rejected chat request: {e}");
            ApiError::BadRequest("Invalid model selection".into())
        })?;

    info!(
        "Session '{}': streaming from {} with {} context message(s)",
        body.session_id,
        turn.provider.name(),
        turn.context.len()
    );
    let chunks = turn.provider.converse_stream(turn.context);
    Ok(Sse::new(reply_events(chunks, app.chat, body.session_id)))
}

struct ReplyState {
    chunks: ChunkStream,
    chat: Arc<ChatService>,
    session_id: String,
    reply: String,
    finished: bool,
}

fn frame(value: serde_json::Value) -> Event {
    Event::default().data(value.to_string())
}

/// Forward provider chunks as SSE frames, recording the full reply when the
/// provider finishes cleanly. Dropping the stream (client disconnect) drops
/// the provider stream with it and records nothing.
fn reply_events(
    chunks: ChunkStream,
    chat: Arc<ChatService>,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let state = ReplyState {
        chunks,
        chat,
        session_id,
        reply: String::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        match st.chunks.next().await {
            Some(ProviderChunk::Content(text)) => {
                st.reply.push_str(&text);
                let event = frame(serde_json::json!({ "content": text }));
                Some((Ok(event), st))
            }
            Some(ProviderChunk::Error(e)) => {
                let message = format!("Model error: {e}");
                error!("Session '{}': {message}", st.session_id);
                st.finished = true;
                let event = frame(serde_json::json!({ "error": message }));
                Some((Ok(event), st))
            }
            None => {
                debug!(
                    "Session '{}': reply complete ({} chars)",
                    st.session_id,
                    st.reply.len()
                );
                st.chat.finish_turn(&st.session_id, st.reply);
                None
            }
        }
    })
}

/// Request body for POST /api/clear.
#[derive(Deserialize, Debug)]
pub struct ClearRequest {
    #[serde(default = "default_session")]
    pub session_id: String,
}

/// POST /api/clear: Empty a session's conversation.
pub async fn post_clear(
    State(app): State<AppState>,
    body: Result<Json<ClearRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    app.chat.clear(&body.session_id);
    Ok(Json(serde_json::json!({ "status": "success" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert_eq!(req.session_id, "default");
        assert!(req.model.is_none());
    }

    #[test]
    fn chat_request_with_model_and_session() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","session_id":"s1","model":"claude"}"#)
                .unwrap();
        assert_eq!(req.session_id, "s1");
        assert_eq!(req.model.as_deref(), Some("claude"));
    }

    #[test]
    fn clear_request_defaults_session() {
        let req: ClearRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.session_id, "default");
    }

    #[test]
    fn bad_request_renders_json_error() {
        let resp = ApiError::BadRequest("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
