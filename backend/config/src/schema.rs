use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resolved runtime settings for EmberChat.
///
/// All fields have defaults so a missing config file is a valid first-run
/// state; the YAML file overrides defaults and env vars override the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ollama model identifier.
    pub model_name: String,
    /// Ollama base URL.
    pub base_url: String,
    /// Ollama keep_alive value (-1 keeps the model loaded indefinitely).
    pub keep_alive: i64,
    /// Whether to stream completions incrementally.
    pub streaming: bool,
    /// History window depth K: complete (user, assistant) pairs per request.
    pub history_turns: usize,
    /// Seconds to wait for the backend's first byte before failing the turn.
    pub first_byte_timeout_secs: u64,
    /// Optional cap on total turn duration, in seconds.
    pub turn_timeout_secs: Option<u64>,
    /// System prompt prepended to every outgoing window.
    pub system_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap (Ollama `num_predict`).
    pub max_tokens: u32,
    /// Gateway bind address.
    pub bind_address: String,
    /// Gateway port.
    pub port: u16,
    /// SQLite database path for conversation history.
    pub db_path: String,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Directory for the rolling NDJSON log file.
    pub log_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_name: "gemma:2b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            keep_alive: -1,
            streaming: true,
            history_turns: 4,
            first_byte_timeout_secs: 30,
            turn_timeout_secs: None,
            system_prompt: "You are a helpful assistant. Reply to user queries in a clear and informative manner.".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            db_path: "chat_history.db".to_string(),
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Settings {
    /// Time-to-first-byte timeout as a `Duration`.
    pub fn first_byte_timeout(&self) -> Duration {
        Duration::from_secs(self.first_byte_timeout_secs)
    }

    /// Total-turn timeout as a `Duration`, if configured.
    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.history_turns, 4);
        assert!(settings.streaming);
        assert_eq!(settings.first_byte_timeout(), Duration::from_secs(30));
        assert!(settings.turn_timeout().is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let settings: Settings =
            serde_yaml::from_str("model_name: qwen3:8b\ntemperature: 0.2\n").unwrap();
        assert_eq!(settings.model_name, "qwen3:8b");
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.base_url, "http://localhost:11434");
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let settings: Settings = serde_yaml::from_str("model_provider: ollama\n").unwrap();
        assert_eq!(settings.model_name, "gemma:2b");
    }
}
