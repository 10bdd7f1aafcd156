//! Chat streaming endpoint (`POST /api/chat/stream`).
//!
//! Runs one turn and relays its event stream to the client as Server-Sent
//! Events, one JSON record per event. The turn itself runs in a spawned
//! task; dropping the SSE response drops the event receiver, which cancels
//! the turn without persisting a partial exchange.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use emberchat_core::ChatMessage;
use emberchat_engine::TurnResult;
use emberchat_store::ConversationStore;

use crate::server::AppState;

/// Buffered events between the turn task and the SSE writer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

/// Handler for `POST /api/chat/stream`.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatStreamRequest>,
) -> Response {
    if let Some(id) = request.conversation_id {
        if !state.active_turns.try_begin(id).await {
            return error_response(
                StatusCode::CONFLICT,
                "a turn is already in flight for this conversation",
            );
        }
    }

    // Resolve the caller's history up front so a bad conversation id fails
    // with a status code instead of an event-stream error.
    let history: Vec<ChatMessage> = match request.conversation_id {
        None => Vec::new(),
        Some(id) => match state.store.get(id).await {
            Ok(Some(conversation)) => conversation.messages.iter().map(ChatMessage::from).collect(),
            Ok(None) => {
                state.active_turns.end(id).await;
                return error_response(StatusCode::NOT_FOUND, "Conversation not found");
            }
            Err(e) => {
                state.active_turns.end(id).await;
                warn!(error = %e, "Failed to load conversation history");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
            }
        },
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let controller = state.controller.clone();
    let active_turns = state.active_turns.clone();
    let conversation_id = request.conversation_id;
    let message = request.message;

    tokio::spawn(async move {
        match controller
            .run_turn(conversation_id, &history, &message, &tx)
            .await
        {
            Ok(TurnResult::Completed(outcome)) => {
                if let Some(warning) = outcome.store_warning {
                    warn!(conversation = ?outcome.conversation_id, %warning, "Turn completed");
                }
            }
            Ok(TurnResult::Cancelled) => {
                debug!(conversation = ?conversation_id, "Client disconnected mid-turn");
            }
            Err(e) => {
                // Already relayed to the client as an error event.
                debug!(conversation = ?conversation_id, error = %e, "Turn failed");
            }
        }
        if let Some(id) = conversation_id {
            active_turns.end(id).await;
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization() {
        let request: ChatStreamRequest = serde_json::from_str(r#"{"message":"Hi"}"#).unwrap();
        assert_eq!(request.message, "Hi");
        assert!(request.conversation_id.is_none());

        let id = Uuid::new_v4();
        let request: ChatStreamRequest = serde_json::from_str(&format!(
            r#"{{"message":"again","conversation_id":"{id}"}}"#
        ))
        .unwrap();
        assert_eq!(request.conversation_id, Some(id));
    }
}
