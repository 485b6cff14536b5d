//! Chat API Handlers
//!
//! `POST /api/chat` runs one conversation turn, buffered by default and
//! over SSE when the client asks for a stream. `GET /api/chat-init`
//! seeds a fresh conversation. `POST /api/execute-tool` runs confirmed
//! tool calls and returns the follow-up answer.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use mcpress_chat::TurnOutcome;
use mcpress_core::error::ChatError;
use mcpress_core::message::{ChatMessage, ToolCall};

use crate::handlers::{error_response, forbidden, success};
use crate::sse::frame;
use crate::state::SharedState;

/// Header that forces SSE streaming regardless of `Accept`.
pub const STREAM_HEADER: &str = "x-mcpress-stream";

const EVENT_BUFFER: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// Full conversation history.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Legacy single-message form.
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /api/chat
pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Response {
    if !state.gate.can_chat() {
        return forbidden();
    }
    let messages = match resolve_messages(body) {
        Ok(messages) => messages,
        Err(err) => return error_response(&err),
    };

    let span = info_span!("chat", request_id = %Uuid::new_v4());
    if wants_stream(&headers) {
        stream_chat(state, messages).instrument(span).await
    } else {
        buffered_chat(state, messages).instrument(span).await
    }
}

/// GET /api/chat-init
pub async fn chat_init_handler(State(state): State<SharedState>) -> Response {
    if !state.gate.can_chat() {
        return forbidden();
    }
    let (messages, greeting) = state.orchestrator.init_conversation().await;
    success(json!({
        "messages": messages,
        "display_initial_message": greeting,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteToolBody {
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Absent means the client confirmed implicitly.
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

/// POST /api/execute-tool
pub async fn execute_tool_handler(
    State(state): State<SharedState>,
    Json(body): Json<ExecuteToolBody>,
) -> Response {
    if !state.gate.can_execute_tools() {
        return forbidden();
    }
    let span = info_span!("execute_tool", request_id = %Uuid::new_v4());
    async move {
        info!(
            count = body.tool_calls.len(),
            confirmed = body.confirmed,
            "tool execution request"
        );
        match state
            .orchestrator
            .resume_with_tools(body.tool_calls, body.messages, body.confirmed)
            .await
        {
            Ok(message) => success(json!({ "message": message })),
            Err(err) => error_response(&err),
        }
    }
    .instrument(span)
    .await
}

async fn buffered_chat(state: SharedState, messages: Vec<ChatMessage>) -> Response {
    info!(count = messages.len(), "chat request");
    match state.orchestrator.run_turn(messages).await {
        Ok(TurnOutcome::Reply { content }) => success(json!({ "message": content })),
        Ok(TurnOutcome::NeedsConfirmation {
            tool_calls,
            messages,
        }) => success(json!({
            "message": "",
            "tool_calls": tool_calls,
            "messages": messages,
            "requires_confirmation": true,
        })),
        Err(err) => error_response(&err),
    }
}

async fn stream_chat(state: SharedState, messages: Vec<ChatMessage>) -> Response {
    info!(count = messages.len(), "streaming chat request");
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(
        async move {
            orchestrator.stream_turn(messages, tx).await;
        }
        .in_current_span(),
    );

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let (name, data) = frame(&event);
            yield Ok::<Event, Infallible>(Event::default().event(name).data(data));
        }
    };
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        )
        .into_response()
}

/// The history to run the turn against, from either body form.
fn resolve_messages(body: ChatBody) -> Result<Vec<ChatMessage>, ChatError> {
    if !body.messages.is_empty() {
        return Ok(body.messages);
    }
    match body.message {
        Some(text) if !text.trim().is_empty() => Ok(vec![ChatMessage::user(text)]),
        _ => Err(ChatError::malformed("request carries no messages")),
    }
}

/// SSE when the client accepts `text/event-stream` or forces it with the
/// stream header.
fn wants_stream(headers: &HeaderMap) -> bool {
    let accepts_sse = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("text/event-stream"))
        .unwrap_or(false);
    let forced = headers
        .get(STREAM_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);
    accepts_sse || forced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_detection_honors_accept_and_header() {
        let mut headers = HeaderMap::new();
        assert!(!wants_stream(&headers));

        headers.insert(header::ACCEPT, "text/event-stream".parse().unwrap());
        assert!(wants_stream(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "application/json".parse().unwrap());
        assert!(!wants_stream(&headers));
        headers.insert(STREAM_HEADER, "1".parse().unwrap());
        assert!(wants_stream(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(STREAM_HEADER, "0".parse().unwrap());
        assert!(!wants_stream(&headers));
    }

    #[test]
    fn legacy_message_becomes_a_user_turn() {
        let body = ChatBody {
            messages: Vec::new(),
            message: Some("hello".to_string()),
        };
        let messages = resolve_messages(body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].text(), "hello");
    }

    #[test]
    fn empty_bodies_are_malformed() {
        let body = ChatBody {
            messages: Vec::new(),
            message: None,
        };
        assert!(matches!(
            resolve_messages(body),
            Err(ChatError::MalformedInput(_))
        ));

        let body = ChatBody {
            messages: Vec::new(),
            message: Some("   ".to_string()),
        };
        assert!(matches!(
            resolve_messages(body),
            Err(ChatError::MalformedInput(_))
        ));
    }

    #[test]
    fn explicit_messages_win_over_legacy_field() {
        let body = ChatBody {
            messages: vec![ChatMessage::user("from history")],
            message: Some("ignored".to_string()),
        };
        let messages = resolve_messages(body).unwrap();
        assert_eq!(messages[0].text(), "from history");
    }
}
