//! Conversation persistence for EmberChat.
//!
//! The `ConversationStore` trait is the seam between the turn pipeline and
//! durable history. `SqliteStore` is the production implementation;
//! `InMemoryStore` backs tests.

pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteStore;
pub use store::{ConversationStore, InMemoryStore};
