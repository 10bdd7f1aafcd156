//! Typed environment-variable overrides.
//!
//! Each supported variable maps to one settings field with an explicit type
//! coercion. Overrides are applied as a pure function over a provided map so
//! the logic is testable without touching process state.

use std::collections::HashMap;

use emberchat_core::ChatError;

use crate::schema::Settings;

/// Apply env overrides on top of file-derived settings.
///
/// A variable that is present but fails its type coercion is a fatal
/// `ChatError::Config`; absent variables leave the field untouched.
pub fn apply_env_overrides(
    mut settings: Settings,
    env: &HashMap<String, String>,
) -> Result<Settings, ChatError> {
    if let Some(v) = env.get("MODEL_NAME") {
        settings.model_name = v.clone();
    }
    if let Some(v) = env.get("SYSTEM_PROMPT") {
        settings.system_prompt = v.clone();
    }
    if let Some(v) = env.get("OLLAMA_BASE_URL") {
        settings.base_url = v.clone();
    }
    if let Some(v) = env.get("STREAMING") {
        settings.streaming = parse_bool(v);
    }
    if let Some(v) = env.get("HISTORY_TURNS") {
        settings.history_turns = parse_num(v, "HISTORY_TURNS")?;
    }
    if let Some(v) = env.get("TEMPERATURE") {
        settings.temperature = parse_num(v, "TEMPERATURE")?;
    }
    if let Some(v) = env.get("TIMEOUT") {
        settings.first_byte_timeout_secs = parse_num(v, "TIMEOUT")?;
    }
    if let Some(v) = env.get("TURN_TIMEOUT") {
        settings.turn_timeout_secs = Some(parse_num(v, "TURN_TIMEOUT")?);
    }
    if let Some(v) = env.get("MAX_TOKENS") {
        settings.max_tokens = parse_num(v, "MAX_TOKENS")?;
    }
    if let Some(v) = env.get("EMBERCHAT_BIND") {
        settings.bind_address = v.clone();
    }
    if let Some(v) = env.get("EMBERCHAT_PORT") {
        settings.port = parse_num(v, "EMBERCHAT_PORT")?;
    }
    if let Some(v) = env.get("EMBERCHAT_DB") {
        settings.db_path = v.clone();
    }
    if let Some(v) = env.get("RUST_LOG") {
        settings.log_level = v.clone();
    }
    Ok(settings)
}

/// Truthy strings: "true", "1", "yes", "on" (case-insensitive); everything
/// else is false.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_num<T: std::str::FromStr>(value: &str, var: &str) -> Result<T, ChatError> {
    value
        .parse()
        .map_err(|_| ChatError::Config(format!("invalid value for {var}: {value:?}")))
}
