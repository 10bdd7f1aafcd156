//! `emberchat-config` — EmberChat runtime configuration.
//!
//! Provides:
//! - Typed settings schema covering the model, backend endpoint, history
//!   window, timeouts, server binding, and persistence path
//! - YAML read with missing-file fallback to defaults
//! - Typed environment-variable overrides
//! - Startup validation (invalid settings are fatal)

pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::apply_env_overrides;
pub use io::{load_settings, resolve_config_path};
pub use schema::Settings;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use emberchat_core::ChatError;

/// Load the config file, apply env overrides, and validate.
///
/// This is the main entry point for resolving settings at startup. Any
/// failure here is a `ChatError::Config` and fatal to the process.
pub async fn load_and_prepare(path: &Path) -> Result<Settings, ChatError> {
    let settings = load_settings(path).await?;
    let env: std::collections::HashMap<String, String> = std::env::vars().collect();
    let settings = apply_env_overrides(settings, &env)?;
    validate(&settings).into_result()?;
    Ok(settings)
}
