//! Turn controller: one request/response cycle from user text to a
//! finalized, persisted exchange.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use emberchat_config::Settings;
use emberchat_core::{
    build_outgoing_messages, ChatBackend, ChatError, ChatEvent, ChatMessage, ChatRequest,
};
use emberchat_store::ConversationStore;

use crate::relay::{strip_reasoning, ThinkFilter};

/// Phase of the per-turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingFirstByte,
    Streaming,
    Finalizing,
    Error,
}

/// Everything the controller needs from resolved settings.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    pub model: String,
    pub system_prompt: String,
    pub history_turns: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub keep_alive: i64,
    pub streaming: bool,
    pub first_byte_timeout: Duration,
    pub turn_timeout: Option<Duration>,
}

impl From<&Settings> for TurnOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            model: settings.model_name.clone(),
            system_prompt: settings.system_prompt.clone(),
            history_turns: settings.history_turns,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            keep_alive: settings.keep_alive,
            streaming: settings.streaming,
            first_byte_timeout: settings.first_byte_timeout(),
            turn_timeout: settings.turn_timeout(),
        }
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Conversation the turn was persisted under; `None` if persistence
    /// failed before a conversation existed.
    pub conversation_id: Option<Uuid>,
    pub assistant_text: String,
    pub created_conversation: bool,
    /// Set when the reply was delivered but history could not be saved.
    pub store_warning: Option<String>,
}

/// How a turn ended, short of an error.
#[derive(Debug)]
pub enum TurnResult {
    Completed(TurnOutcome),
    /// The consumer went away mid-turn; nothing was persisted.
    Cancelled,
}

enum Relay {
    Completed(String),
    Cancelled,
}

/// Orchestrates one turn at a time: builds the outgoing window, relays the
/// filtered stream to the consumer, and finalizes the exchange into the
/// store. Not re-entrant for a single conversation; callers enforce the
/// one-turn-in-flight rule.
pub struct TurnController {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn ConversationStore>,
    options: TurnOptions,
}

impl TurnController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn ConversationStore>,
        options: TurnOptions,
    ) -> Self {
        Self {
            backend,
            store,
            options,
        }
    }

    pub fn options(&self) -> &TurnOptions {
        &self.options
    }

    /// Run one turn. `history` is the caller's view of the conversation so
    /// far (finalized messages only); events are emitted to `events` in
    /// order, ending with exactly one `Done` or `Error`.
    #[instrument(skip(self, history, user_text, events), fields(conversation = ?conversation_id))]
    pub async fn run_turn(
        &self,
        conversation_id: Option<Uuid>,
        history: &[ChatMessage],
        user_text: &str,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<TurnResult, ChatError> {
        let mut phase = TurnPhase::Idle;

        let mut window = history.to_vec();
        window.push(ChatMessage::user(user_text));
        let outgoing = build_outgoing_messages(
            &window,
            &self.options.system_prompt,
            self.options.history_turns,
        );
        let request = ChatRequest {
            model: self.options.model.clone(),
            messages: outgoing,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            keep_alive: self.options.keep_alive,
        };

        let relay = async {
            if self.options.streaming {
                self.relay_streaming(&request, events, &mut phase).await
            } else {
                self.relay_blocking(&request, events, &mut phase).await
            }
        };
        let relayed = match self.options.turn_timeout {
            Some(limit) => match tokio::time::timeout(limit, relay).await {
                Ok(result) => result,
                Err(_) => Err(ChatError::BackendUnreachable(format!(
                    "turn exceeded {limit:?}"
                ))),
            },
            None => relay.await,
        };

        let assistant_text = match relayed {
            Ok(Relay::Completed(text)) => text,
            Ok(Relay::Cancelled) => {
                debug!("Consumer went away; turn abandoned");
                return Ok(TurnResult::Cancelled);
            }
            Err(e) => {
                phase = TurnPhase::Error;
                warn!(phase = ?phase, error = %e, "Turn failed");
                let _ = events
                    .send(ChatEvent::Error {
                        error: e.to_string(),
                    })
                    .await;
                return Err(e);
            }
        };

        phase = TurnPhase::Finalizing;
        debug!(phase = ?phase, chars = assistant_text.len(), "Finalizing turn");
        let outcome = self
            .finalize(conversation_id, user_text, &assistant_text, events)
            .await;
        let _ = events.send(ChatEvent::Done).await;
        Ok(TurnResult::Completed(outcome))
    }

    async fn relay_streaming(
        &self,
        request: &ChatRequest,
        events: &mpsc::Sender<ChatEvent>,
        phase: &mut TurnPhase,
    ) -> Result<Relay, ChatError> {
        let mut stream = self.backend.stream(request).await?;
        *phase = TurnPhase::AwaitingFirstByte;
        debug!(phase = ?phase, "Dispatched streaming request");

        let mut filter = ThinkFilter::new();
        let mut accumulator = String::new();

        let mut next = tokio::time::timeout(self.options.first_byte_timeout, stream.next())
            .await
            .map_err(|_| {
                ChatError::BackendUnreachable(format!(
                    "no response from inference backend within {:?}",
                    self.options.first_byte_timeout
                ))
            })?;

        loop {
            match next {
                None => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(delta)) => {
                    *phase = TurnPhase::Streaming;
                    let visible = filter.push(&delta);
                    if !visible.is_empty() {
                        accumulator.push_str(&visible);
                        let sent = events.send(ChatEvent::Content { content: visible }).await;
                        if sent.is_err() {
                            return Ok(Relay::Cancelled);
                        }
                    }
                }
            }
            next = stream.next().await;
        }

        let tail = filter.finish();
        if !tail.is_empty() {
            accumulator.push_str(&tail);
            let sent = events.send(ChatEvent::Content { content: tail }).await;
            if sent.is_err() {
                return Ok(Relay::Cancelled);
            }
        }

        Ok(Relay::Completed(accumulator))
    }

    async fn relay_blocking(
        &self,
        request: &ChatRequest,
        events: &mpsc::Sender<ChatEvent>,
        phase: &mut TurnPhase,
    ) -> Result<Relay, ChatError> {
        *phase = TurnPhase::AwaitingFirstByte;
        debug!(phase = ?phase, "Dispatched blocking request");
        let response = self.backend.complete(request).await?;
        *phase = TurnPhase::Streaming;

        let text = strip_reasoning(&response.content);
        if !text.is_empty() {
            let sent = events
                .send(ChatEvent::Content {
                    content: text.clone(),
                })
                .await;
            if sent.is_err() {
                return Ok(Relay::Cancelled);
            }
        }
        Ok(Relay::Completed(text))
    }

    /// Persist the finalized exchange. Store failures downgrade to a warning:
    /// the reply was already delivered, only history is lost.
    async fn finalize(
        &self,
        conversation_id: Option<Uuid>,
        user_text: &str,
        assistant_text: &str,
        events: &mpsc::Sender<ChatEvent>,
    ) -> TurnOutcome {
        let (id, created) = match conversation_id {
            Some(id) => (id, false),
            None => match self.store.create(&derive_title(user_text)).await {
                Ok(conversation) => (conversation.id, true),
                Err(e) => {
                    warn!(error = %e, "Failed to create conversation");
                    return TurnOutcome {
                        conversation_id: None,
                        assistant_text: assistant_text.to_string(),
                        created_conversation: false,
                        store_warning: Some(format!("conversation history was not saved: {e}")),
                    };
                }
            },
        };

        match self.store.append_turn(id, user_text, assistant_text).await {
            Ok(()) => {
                if created {
                    let _ = events
                        .send(ChatEvent::ConversationId {
                            conversation_id: id,
                        })
                        .await;
                }
                TurnOutcome {
                    conversation_id: Some(id),
                    assistant_text: assistant_text.to_string(),
                    created_conversation: created,
                    store_warning: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist turn");
                // Don't leave an empty conversation behind.
                if created {
                    let _ = self.store.delete(id).await;
                }
                TurnOutcome {
                    conversation_id,
                    assistant_text: assistant_text.to_string(),
                    created_conversation: false,
                    store_warning: Some(format!("conversation history was not saved: {e}")),
                }
            }
        }
    }
}

/// Derive a conversation title from the first user message: the first six
/// words, capped at 50 characters.
pub fn derive_title(message: &str) -> String {
    let title = message
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        return "New Conversation".to_string();
    }
    if title.chars().count() > 50 {
        let truncated: String = title.chars().take(47).collect();
        return format!("{truncated}...");
    }
    title
}
