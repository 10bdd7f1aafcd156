//! Config file location and loading.

use std::path::{Path, PathBuf};

use emberchat_core::ChatError;
use tokio::fs;
use tracing::{debug, info};

use crate::schema::Settings;

/// Default config file name.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config file path.
/// Priority: explicit path > `EMBERCHAT_CONFIG` env > `./config.yaml` >
/// `~/.emberchat/config.yaml`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var("EMBERCHAT_CONFIG") {
        return PathBuf::from(path);
    }
    let cwd = PathBuf::from(CONFIG_FILE_NAME);
    if cwd.exists() {
        return cwd;
    }
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".emberchat").join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return candidate;
        }
    }
    cwd
}

/// Load and parse settings from disk.
///
/// Returns defaults if the file doesn't exist (first run).
pub async fn load_settings(path: &Path) -> Result<Settings, ChatError> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| ChatError::Config(format!("failed to read {}: {e}", path.display())))?;

    let settings: Settings = serde_yaml::from_str(&raw)
        .map_err(|e| ChatError::Config(format!("failed to parse {}: {e}", path.display())))?;

    info!(path = %path.display(), "Loaded config");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let settings = load_settings(Path::new("/nonexistent/config.yaml"))
            .await
            .unwrap();
        assert_eq!(settings.model_name, Settings::default().model_name);
    }

    #[tokio::test]
    async fn test_load_yaml_file() {
        let dir = std::env::temp_dir().join("emberchat-config-test");
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("config.yaml");
        fs::write(&path, "model_name: llama3:8b\nport: 9000\n")
            .await
            .unwrap();

        let settings = load_settings(&path).await.unwrap();
        assert_eq!(settings.model_name, "llama3:8b");
        assert_eq!(settings.port, 9000);

        fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_malformed_yaml_is_config_error() {
        let dir = std::env::temp_dir().join("emberchat-config-test");
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("broken.yaml");
        fs::write(&path, "model_name: [unclosed\n").await.unwrap();

        let err = load_settings(&path).await.unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));

        fs::remove_file(&path).await.ok();
    }
}
