//! Structured logging for EmberChat.
//!
//! Wraps `tracing` to provide console output plus a rolling NDJSON file log,
//! with environment-based level control.

pub mod logger;

pub use logger::init_logger;
