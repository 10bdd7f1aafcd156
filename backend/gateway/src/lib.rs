//! EmberChat Gateway HTTP API Server
//!
//! Exposes the SSE chat stream, the conversation REST API, and the health
//! endpoint consumed by the web frontend and the `status` CLI command.

pub mod active_turns;
pub mod chat_api;
pub mod conversations_api;
pub mod health_api;
pub mod server;

pub use active_turns::ActiveTurns;
pub use server::{build_router, start_server, AppState};
