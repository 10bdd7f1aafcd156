/// SQLite-backed durable conversation store.
///
/// Uses `rusqlite` to persist conversations and their messages. The
/// connection is guarded by a `tokio::sync::Mutex`, which also serializes
/// writes; a turn's user/assistant pair is written inside one transaction so
/// it commits together or not at all.
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use async_trait::async_trait;
use emberchat_core::{ChatError, Conversation, ConversationSummary, Role, StoredMessage};

use crate::store::ConversationStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS conversations (
        id          TEXT PRIMARY KEY,
        title       TEXT NOT NULL,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id TEXT NOT NULL,
        role            TEXT NOT NULL,
        content         TEXT NOT NULL,
        created_at      INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ChatError::Store(format!("failed to open database: {e}")))?;

        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .map_err(|e| ChatError::Store(format!("failed to initialize schema: {e}")))?;

        info!("SqliteStore opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self, ChatError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChatError::Store(format!("failed to open in-memory database: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| ChatError::Store(format!("failed to initialize schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create(&self, title: &str) -> Result<Conversation, ChatError> {
        let conn = self.conn.lock().await;
        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id.to_string(), title, now.timestamp_micros()],
        )
        .map_err(store_err)?;
        debug!(conversation_id = %id, "Created conversation");
        Ok(Conversation {
            id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        })
    }

    async fn append_turn(
        &self,
        conversation_id: Uuid,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ChatError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(store_err)?;
        let now = Utc::now().timestamp_micros();
        let id = conversation_id.to_string();

        let updated = tx
            .execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )
            .map_err(store_err)?;
        if updated == 0 {
            return Err(ChatError::Store(format!(
                "unknown conversation: {conversation_id}"
            )));
        }

        tx.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, 'user', ?2, ?3)",
            params![id, user_text, now],
        )
        .map_err(store_err)?;
        tx.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, 'assistant', ?2, ?3)",
            params![id, assistant_text, now],
        )
        .map_err(store_err)?;

        tx.commit().map_err(store_err)?;
        debug!(conversation_id = %conversation_id, "Appended turn");
        Ok(())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ConversationSummary>, ChatError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at, updated_at FROM conversations
                 ORDER BY updated_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            )
            .map_err(store_err)?;
        let summaries = stmt
            .query_map(params![limit as i64, skip as i64], row_to_summary)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        Ok(summaries)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conversation>, ChatError> {
        let conn = self.conn.lock().await;
        let summary = conn
            .query_row(
                "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?1",
                params![id.to_string()],
                row_to_summary,
            )
            .optional()
            .map_err(store_err)?;

        let Some(summary) = summary else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT id, role, content, created_at FROM messages
                 WHERE conversation_id = ?1 ORDER BY id ASC",
            )
            .map_err(store_err)?;
        let messages = stmt
            .query_map(params![id.to_string()], row_to_message)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;

        Ok(Some(Conversation {
            id: summary.id,
            title: summary.title,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            messages,
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ChatError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(store_err)?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![id.to_string()],
        )
        .map_err(store_err)?;
        let deleted = tx
            .execute(
                "DELETE FROM conversations WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        Ok(deleted > 0)
    }
}

fn store_err(e: rusqlite::Error) -> ChatError {
    ChatError::Store(e.to_string())
}

fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<ConversationSummary> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    Ok(ConversationSummary {
        id,
        title: row.get(1)?,
        created_at: micros_to_datetime(row.get(2)?),
        updated_at: micros_to_datetime(row.get(3)?),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<StoredMessage> {
    let role_str: String = row.get(1)?;
    let role: Role = role_str
        .parse()
        .map_err(|e: anyhow::Error| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    Ok(StoredMessage {
        id: row.get(0)?,
        role,
        content: row.get(2)?,
        created_at: micros_to_datetime(row.get(3)?),
    })
}

fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
