//! Interactive terminal chat session.
//!
//! Streams the assistant reply token-by-token and keeps the session's
//! conversation in memory; finalized turns persist through the same turn
//! controller and store as the gateway.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use uuid::Uuid;

use emberchat_config::Settings;
use emberchat_core::{ChatEvent, ChatMessage};
use emberchat_engine::{TurnController, TurnOptions, TurnResult};
use emberchat_provider::OllamaBackend;
use emberchat_store::SqliteStore;

const EXIT_COMMANDS: [&str; 4] = ["/exit", "exit", "quit", "/quit"];

pub async fn run(settings: &Settings) -> Result<()> {
    let backend = Arc::new(OllamaBackend::new().with_base_url(&settings.base_url));
    let store = Arc::new(SqliteStore::open(&settings.db_path)?);
    let controller = TurnController::new(backend, store, TurnOptions::from(settings));

    println!("Model: {}", settings.model_name);
    println!("Ollama URL: {}", settings.base_url);
    println!("Type '/exit', 'exit', or 'quit' to quit.\n");

    let mut editor = DefaultEditor::new()?;
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut conversation_id: Option<Uuid> = None;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nBye!");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&input.to_lowercase().as_str()) {
            println!("Bye!");
            break;
        }
        editor.add_history_entry(&input).ok();

        print!("Assistant: ");
        std::io::stdout().flush()?;

        let (tx, mut rx) = mpsc::channel(32);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ChatEvent::Content { content } => {
                        print!("{content}");
                        std::io::stdout().flush().ok();
                    }
                    ChatEvent::Done => println!(),
                    ChatEvent::Error { error } => println!("\nerror: {error}"),
                    ChatEvent::ConversationId { .. } => {}
                }
            }
        });

        let result = controller
            .run_turn(conversation_id, &history, &input, &tx)
            .await;
        drop(tx);
        printer.await.ok();

        match result {
            Ok(TurnResult::Completed(outcome)) => {
                if let Some(warning) = &outcome.store_warning {
                    eprintln!("warning: {warning}");
                }
                conversation_id = outcome.conversation_id.or(conversation_id);
                history.push(ChatMessage::user(input.as_str()));
                history.push(ChatMessage::assistant(outcome.assistant_text.as_str()));
            }
            Ok(TurnResult::Cancelled) => {}
            Err(_) => {
                // The error text was already printed from the event stream;
                // the session continues.
            }
        }
    }

    Ok(())
}
