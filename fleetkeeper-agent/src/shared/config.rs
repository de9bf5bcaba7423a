use std::path::{Path, PathBuf};

use fleetkeeper_core::Settings;

use crate::shared::error::ConfigError;

pub const SETTINGS_PATH_ENV: &str = "SETTINGS_PATH";
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

pub fn settings_path_from_env() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

/// Read and validate the settings file.
pub async fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Settings::from_json(&raw).map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter(settings: &Settings) -> String {
    let level = settings.log_filter_level();
    format!(
        "fleetkeeper_agent={level},fleetkeeper_core={level},{level}",
        level = level
    )
}
