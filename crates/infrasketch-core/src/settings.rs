use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

const SETTINGS_FILE: &str = "settings.json";

/// Provider settings for the external AI generation service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

impl AiSettings {
    /// Overlay `INFRASKETCH_AI_PROVIDER`, `INFRASKETCH_AI_MODEL` and `INFRASKETCH_AI_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        let vars = [
            ("INFRASKETCH_AI_PROVIDER", &mut self.provider),
            ("INFRASKETCH_AI_MODEL", &mut self.model),
            ("INFRASKETCH_AI_KEY", &mut self.api_key),
        ];
        for (var, field) in vars {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = value;
                }
            }
        }
        self
    }
}

/// Settings from `<root>/settings.json`; missing or unreadable files yield defaults.
pub fn read_settings(root: &Path) -> AiSettings {
    let path = root.join(SETTINGS_FILE);
    if !path.exists() {
        return AiSettings::default();
    }
    match fs::read_to_string(&path).map(|s| serde_json::from_str::<AiSettings>(&s)) {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            AiSettings::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read settings");
            AiSettings::default()
        }
    }
}

pub fn write_settings(root: &Path, settings: &AiSettings) -> Result<(), StoreError> {
    fs::create_dir_all(root)?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(root.join(SETTINGS_FILE), json)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
