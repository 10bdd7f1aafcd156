//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument};

use emberchat_engine::TurnController;
use emberchat_store::ConversationStore;

use crate::active_turns::ActiveTurns;
use crate::{chat_api, conversations_api, health_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TurnController>,
    pub store: Arc<dyn ConversationStore>,
    pub active_turns: ActiveTurns,
}

impl AppState {
    pub fn new(controller: Arc<TurnController>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            controller,
            store,
            active_turns: ActiveTurns::new(),
        }
    }
}

/// Build the gateway router. CORS is permissive for local development.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/stream", post(chat_api::chat_stream))
        .route(
            "/api/conversations",
            get(conversations_api::list_conversations),
        )
        .route(
            "/api/conversations/:id",
            get(conversations_api::get_conversation).delete(conversations_api::delete_conversation),
        )
        .route("/api/health", get(health_api::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the Axum HTTP server for the gateway.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
