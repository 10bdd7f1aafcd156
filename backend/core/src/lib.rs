pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod traits;

pub use error::ChatError;
pub use event::ChatEvent;
pub use history::build_outgoing_messages;
pub use message::{ChatMessage, Conversation, ConversationSummary, Role, StoredMessage};
pub use traits::{ChatBackend, ChatRequest, ChatResponse, DeltaStream};
