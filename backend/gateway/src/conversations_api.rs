//! Conversation REST endpoints (`/api/conversations`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use emberchat_store::ConversationStore;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Handler for `GET /api/conversations`.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    match state.store.list(params.skip, params.limit).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Handler for `GET /api/conversations/{id}`.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.store.get(id).await {
        Ok(Some(conversation)) => Json(conversation).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// Handler for `DELETE /api/conversations/{id}`.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.store.delete(id).await {
        Ok(true) => Json(serde_json::json!({
            "message": "Conversation deleted successfully"
        }))
        .into_response(),
        Ok(false) => not_found(),
        Err(e) => internal_error(e),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Conversation not found" })),
    )
        .into_response()
}

fn internal_error(e: emberchat_core::ChatError) -> Response {
    warn!(error = %e, "Conversation store request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "detail": e.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.skip, 0);
        assert_eq!(params.limit, 50);
    }
}
