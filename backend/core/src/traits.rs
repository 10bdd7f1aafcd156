use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChatError;
use crate::message::ChatMessage;

/// Incremental content deltas from a streaming completion. The stream ends
/// after the backend's terminal marker (or stream closure); a mid-stream
/// failure is surfaced as a single `Err` item.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// One chat-completion request to an inference backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub keep_alive: i64,
}

/// A completed (non-streamed) response from an inference backend.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// Trait for chat-completion backends.
///
/// The backend handle is constructed once at startup and passed explicitly to
/// whoever runs turns; there is no process-wide singleton.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send one blocking completion request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Send one streaming completion request and return its delta stream.
    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream, ChatError>;
}
