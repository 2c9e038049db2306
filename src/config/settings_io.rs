use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::settings::Settings;

pub const API_KEY_ENV: &str = "MOSAIC_AGENT_API_KEY";

pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("mosaic_match");
    path.push("settings.json");
    path
}

/// Loads settings from `path`, or the default location when `None`.
/// A missing file gives defaults; a malformed one is an error.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);

    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str::<Settings>(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            Settings::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            settings.agent.api_key = Some(key);
        }
    }

    Ok(settings)
}

pub fn save_settings(settings: &Settings, path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "could not create settings directory");
        }
    }

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings.negotiation, Settings::default().negotiation);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.negotiation.max_rounds = 6;
        settings.max_concurrent_calls = 2;
        save_settings(&settings, Some(&path)).unwrap();

        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded.negotiation.max_rounds, 6);
        assert_eq!(loaded.max_concurrent_calls, 2);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("invalid settings file"));
    }
}
