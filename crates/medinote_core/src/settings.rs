//! Runtime configuration.
//!
//! # Responsibility
//! - Define the tunables of autosave, image handling and the LLM client.
//! - Load them from a JSON file with environment overrides.
//!
//! # Invariants
//! - A missing settings file yields defaults, never an error.
//! - `Settings::validate` runs on every load path.

use crate::error::ValidationError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `llm.api_key`.
pub const ENV_LLM_API_KEY: &str = "MEDINOTE_LLM_API_KEY";
/// Environment variable overriding `llm.endpoint`.
pub const ENV_LLM_ENDPOINT: &str = "MEDINOTE_LLM_ENDPOINT";

/// Shortest accepted autosave debounce interval.
pub const MIN_AUTOSAVE_INTERVAL_MS: u64 = 100;

/// Debounced autosave tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl AutosaveSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2_000,
        }
    }
}

/// Image upload and geometry tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub max_upload_bytes: u64,
    pub default_width: u32,
    pub min_dimension: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * 1024 * 1024,
            default_width: 300,
            min_dimension: 50,
        }
    }
}

/// LLM endpoint used by the assistant persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    pub model: String,
    /// Empty means "not configured".
    pub api_key: String,
    pub timeout_secs: u64,
    /// Upper bound for document context sent with a prompt.
    pub max_context_chars: usize,
}

impl LlmSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            max_context_chars: 12_000,
        }
    }
}

/// Complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub autosave: AutosaveSettings,
    pub images: ImageSettings,
    pub llm: LlmSettings,
}

impl Settings {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.autosave.interval_ms < MIN_AUTOSAVE_INTERVAL_MS {
            return Err(ValidationError::InvalidSetting(format!(
                "autosave.interval_ms must be at least {MIN_AUTOSAVE_INTERVAL_MS}"
            )));
        }
        if self.images.min_dimension == 0 {
            return Err(ValidationError::InvalidSetting(
                "images.min_dimension must be positive".to_string(),
            ));
        }
        if self.images.default_width < self.images.min_dimension {
            return Err(ValidationError::InvalidSetting(
                "images.default_width is below images.min_dimension".to_string(),
            ));
        }
        if self.images.max_upload_bytes == 0 {
            return Err(ValidationError::InvalidSetting(
                "images.max_upload_bytes must be positive".to_string(),
            ));
        }
        if self.llm.endpoint.trim().is_empty() {
            return Err(ValidationError::InvalidSetting(
                "llm.endpoint cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies `MEDINOTE_LLM_*` overrides from a variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_LLM_API_KEY).filter(|value| !value.trim().is_empty()) {
            self.llm.api_key = key.trim().to_string();
        }
        if let Some(endpoint) = lookup(ENV_LLM_ENDPOINT).filter(|value| !value.trim().is_empty()) {
            self.llm.endpoint = endpoint.trim().to_string();
        }
    }
}

/// Settings loading failure.
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(ValidationError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read settings: {err}"),
            Self::Parse(err) => write!(f, "failed to parse settings: {err}"),
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

/// Parses settings JSON; absent keys take defaults.
pub fn parse_settings(json: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = serde_json::from_str(json).map_err(SettingsError::Parse)?;
    settings.validate().map_err(SettingsError::Invalid)?;
    Ok(settings)
}

/// Loads settings from `path`, then applies process environment overrides.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let mut settings = match std::fs::read_to_string(path) {
        Ok(json) => parse_settings(&json)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("event=settings_load module=settings status=defaults reason=file_missing");
            Settings::default()
        }
        Err(err) => return Err(SettingsError::Io(err)),
    };
    settings.apply_env_overrides(|name| std::env::var(name).ok());
    settings.validate().map_err(SettingsError::Invalid)?;
    info!(
        "event=settings_load module=settings status=ok autosave_enabled={} autosave_interval_ms={} llm_configured={}",
        settings.autosave.enabled,
        settings.autosave.interval_ms,
        settings.llm.has_api_key()
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::{parse_settings, Settings, SettingsError, ENV_LLM_API_KEY};

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = parse_settings(r#"{"autosave":{"interval_ms":500}}"#).unwrap();
        assert_eq!(settings.autosave.interval_ms, 500);
        assert!(settings.autosave.enabled);
        assert_eq!(settings.images.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn too_short_interval_is_rejected() {
        let err = parse_settings(r#"{"autosave":{"interval_ms":5}}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn env_override_sets_api_key() {
        let mut settings = Settings::default();
        assert!(!settings.llm.has_api_key());
        settings.apply_env_overrides(|name| {
            (name == ENV_LLM_API_KEY).then(|| " sk-test ".to_string())
        });
        assert_eq!(settings.llm.api_key, "sk-test");
    }
}
