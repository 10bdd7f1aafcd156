//! History windowing: the bounded message context sent to the inference
//! backend on each turn.

use crate::message::{ChatMessage, Role};

/// Build the outgoing message list for one turn.
///
/// Returns exactly one system message, followed by the last `turns` complete
/// (user, assistant) pairs from `history` in chronological order, followed by
/// a trailing unanswered user message if `history` ends with one. Older pairs
/// are dropped first; the system message is never dropped. Pure function of
/// its inputs.
pub fn build_outgoing_messages(
    history: &[ChatMessage],
    system_prompt: &str,
    turns: usize,
) -> Vec<ChatMessage> {
    let mut remaining = history;

    // The user message about to be answered, if present.
    let trailing = match remaining.last() {
        Some(last) if last.role == Role::User => {
            remaining = &remaining[..remaining.len() - 1];
            Some(last)
        }
        _ => None,
    };

    // Walk backwards collecting complete (user, assistant) pairs.
    let mut start = remaining.len();
    let mut collected = 0;
    while collected < turns && start >= 2 {
        if remaining[start - 1].role == Role::Assistant && remaining[start - 2].role == Role::User {
            start -= 2;
            collected += 1;
        } else {
            break;
        }
    }

    let mut out = Vec::with_capacity(1 + (remaining.len() - start) + trailing.is_some() as usize);
    out.push(ChatMessage::system(system_prompt));
    out.extend(remaining[start..].iter().cloned());
    if let Some(msg) = trailing {
        out.push(msg.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_history(pairs: usize) -> Vec<ChatMessage> {
        let mut history = Vec::new();
        for i in 0..pairs {
            history.push(ChatMessage::user(format!("question {i}")));
            history.push(ChatMessage::assistant(format!("answer {i}")));
        }
        history
    }

    #[test]
    fn test_empty_history_yields_system_only() {
        let out = build_outgoing_messages(&[], "be helpful", 4);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[0].content, "be helpful");
    }

    #[test]
    fn test_k2_empty_history_with_pending_user() {
        let history = vec![ChatMessage::user("Hi")];
        let out = build_outgoing_messages(&history, "sys", 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[1].role, Role::User);
        assert_eq!(out[1].content, "Hi");
    }

    #[test]
    fn test_window_drops_oldest_pairs_first() {
        let mut history = turn_history(5);
        history.push(ChatMessage::user("latest"));
        let out = build_outgoing_messages(&history, "sys", 2);
        // system + 2 pairs + trailing user
        assert_eq!(out.len(), 6);
        assert_eq!(out[1].content, "question 3");
        assert_eq!(out[2].content, "answer 3");
        assert_eq!(out[3].content, "question 4");
        assert_eq!(out[4].content, "answer 4");
        assert_eq!(out[5].content, "latest");
    }

    #[test]
    fn test_fewer_pairs_than_window() {
        let history = turn_history(2);
        let out = build_outgoing_messages(&history, "sys", 4);
        assert_eq!(out.len(), 5);
        assert_eq!(out[1].content, "question 0");
        assert_eq!(out[4].content, "answer 1");
    }

    #[test]
    fn test_zero_turns_keeps_system_and_pending_only() {
        let mut history = turn_history(3);
        history.push(ChatMessage::user("now"));
        let out = build_outgoing_messages(&history, "sys", 0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[1].content, "now");
    }

    #[test]
    fn test_message_count_property() {
        // 1 + 2 * min(K, N/2) + trailing, for alternating histories.
        for k in 0..6usize {
            for pairs in 0..6usize {
                for pending in [false, true] {
                    let mut history = turn_history(pairs);
                    if pending {
                        history.push(ChatMessage::user("pending"));
                    }
                    let out = build_outgoing_messages(&history, "sys", k);
                    let expected = 1 + 2 * k.min(pairs) + pending as usize;
                    assert_eq!(out.len(), expected, "k={k} pairs={pairs} pending={pending}");
                    assert_eq!(out[0].role, Role::System);
                }
            }
        }
    }

    #[test]
    fn test_chronological_order_preserved() {
        let mut history = turn_history(3);
        history.push(ChatMessage::user("tail"));
        let out = build_outgoing_messages(&history, "sys", 10);
        let roles: Vec<Role> = out.iter().map(|m| m.role).collect();
        assert_eq!(roles[0], Role::System);
        for pair in roles[1..roles.len() - 1].chunks(2) {
            assert_eq!(pair, [Role::User, Role::Assistant]);
        }
        assert_eq!(*roles.last().unwrap(), Role::User);
    }
}
