use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records emitted on the consumer-facing stream for one turn.
///
/// Wire format is one JSON object per record, discriminated by `type`.
/// A turn emits zero or more `Content` records in backend order, an optional
/// `ConversationId` when the turn created the conversation, and exactly one
/// terminal record: `Done` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The conversation this turn was persisted under (new conversations only).
    ConversationId { conversation_id: Uuid },
    /// An incremental fragment of the assistant reply.
    Content { content: String },
    /// The turn completed normally.
    Done,
    /// The turn failed; no further records follow.
    Error { error: String },
}

impl ChatEvent {
    /// Whether this record terminates the turn's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done | ChatEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_wire_format() {
        let ev = ChatEvent::Content {
            content: "He".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&ev).unwrap(),
            r#"{"type":"content","content":"He"}"#
        );
    }

    #[test]
    fn test_done_wire_format() {
        assert_eq!(
            serde_json::to_string(&ChatEvent::Done).unwrap(),
            r#"{"type":"done"}"#
        );
    }

    #[test]
    fn test_error_wire_format() {
        let ev = ChatEvent::Error {
            error: "backend unreachable".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&ev).unwrap(),
            r#"{"type":"error","error":"backend unreachable"}"#
        );
    }

    #[test]
    fn test_conversation_id_roundtrip() {
        let id = Uuid::new_v4();
        let ev = ChatEvent::ConversationId {
            conversation_id: id,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.starts_with(r#"{"type":"conversation_id""#));
        let back: ChatEvent = serde_json::from_str(&json).unwrap();
        match back {
            ChatEvent::ConversationId { conversation_id } => assert_eq!(conversation_id, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ChatEvent::Done.is_terminal());
        assert!(ChatEvent::Error {
            error: "x".to_string()
        }
        .is_terminal());
        assert!(!ChatEvent::Content {
            content: "x".to_string()
        }
        .is_terminal());
    }
}
