//! Settings validation with field-path error messages.

use emberchat_core::ChatError;
use thiserror::Error;

use crate::schema::Settings;

/// A single validation failure with its field path.
#[derive(Debug, Error)]
#[error("'{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All failures found in one validation pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
}

impl ValidationReport {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.to_string(),
            message: message.into(),
        });
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a fatal `ChatError::Config` listing every failure.
    pub fn into_result(self) -> Result<(), ChatError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ChatError::Config(joined))
    }
}

/// Validate resolved settings. Every error here is fatal at startup.
pub fn validate(settings: &Settings) -> ValidationReport {
    let mut report = ValidationReport::default();

    if settings.model_name.trim().is_empty() {
        report.push("model_name", "must not be empty");
    }
    if settings.base_url.trim().is_empty() {
        report.push("base_url", "must not be empty");
    } else if !settings.base_url.starts_with("http://") && !settings.base_url.starts_with("https://")
    {
        report.push("base_url", "must be an http(s) URL");
    }
    if !(0.0..=2.0).contains(&settings.temperature) {
        report.push("temperature", "must be between 0.0 and 2.0");
    }
    if settings.max_tokens == 0 {
        report.push("max_tokens", "must be greater than zero");
    }
    if settings.first_byte_timeout_secs == 0 {
        report.push("first_byte_timeout_secs", "must be greater than zero");
    }
    if settings.turn_timeout_secs == Some(0) {
        report.push("turn_timeout_secs", "must be greater than zero when set");
    }
    if settings.port == 0 {
        report.push("port", "must be greater than zero");
    }
    if settings.db_path.trim().is_empty() {
        report.push("db_path", "must not be empty");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_bad_temperature_rejected() {
        let settings = Settings {
            temperature: 3.5,
            ..Default::default()
        };
        let report = validate(&settings);
        assert!(!report.is_ok());
        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let settings = Settings {
            base_url: "localhost:11434".to_string(),
            ..Default::default()
        };
        assert!(!validate(&settings).is_ok());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let settings = Settings {
            model_name: "".to_string(),
            max_tokens: 0,
            ..Default::default()
        };
        let report = validate(&settings);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_zero_history_turns_allowed() {
        let settings = Settings {
            history_turns: 0,
            ..Default::default()
        };
        assert!(validate(&settings).is_ok());
    }
}
