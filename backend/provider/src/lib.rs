//! Inference backend clients for EmberChat.
//!
//! Currently a single backend: a locally hosted Ollama server speaking the
//! `/api/chat` protocol.

pub mod ollama;

pub use ollama::OllamaBackend;
