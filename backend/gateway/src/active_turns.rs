//! In-flight turn registry.
//!
//! Enforces the one-turn-per-conversation rule at the HTTP boundary: a
//! second `POST /api/chat/stream` for a conversation whose turn is still
//! streaming is rejected rather than queued.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

/// Tracks conversations with a turn currently in flight.
#[derive(Clone, Default)]
pub struct ActiveTurns {
    turns: Arc<Mutex<HashSet<Uuid>>>,
}

impl ActiveTurns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a conversation for one turn. Returns false if a turn is
    /// already in flight for it.
    pub async fn try_begin(&self, conversation_id: Uuid) -> bool {
        self.turns.lock().await.insert(conversation_id)
    }

    /// Release a conversation once its turn has terminated.
    pub async fn end(&self, conversation_id: Uuid) {
        self.turns.lock().await.remove(&conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_begin_rejected_until_end() {
        let active = ActiveTurns::new();
        let id = Uuid::new_v4();

        assert!(active.try_begin(id).await);
        assert!(!active.try_begin(id).await);

        active.end(id).await;
        assert!(active.try_begin(id).await);
    }

    #[tokio::test]
    async fn test_distinct_conversations_are_independent() {
        let active = ActiveTurns::new();
        assert!(active.try_begin(Uuid::new_v4()).await);
        assert!(active.try_begin(Uuid::new_v4()).await);
    }
}
