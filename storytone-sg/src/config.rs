//! Configuration resolution for storytone-sg
//!
//! Every setting resolves ENV → TOML → default. Provider credentials have no
//! defaults; a missing mandatory key fails startup with a remediation
//! message rather than failing the first generation run.

use std::path::PathBuf;
use storytone_common::config::{load_config_file, resolve_data_folder, TomlConfig};
use storytone_common::{Error, Result};

use crate::services::speech::DEFAULT_AZURE_VOICE;
use crate::services::text_generator::DEFAULT_GEMINI_MODEL;

/// Environment variable naming the data folder
pub const DATA_ENV: &str = "STORYTONE_DATA";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5733;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_host: String,
    pub port: u16,
    pub data_folder: PathBuf,

    pub gemini_api_key: String,
    pub gemini_model: String,

    pub azure_speech_key: String,
    pub azure_speech_region: String,
    pub azure_voice_name: String,

    /// Optional: without an endpoint the music chain degrades to the silent
    /// bed generator
    pub music_endpoint: Option<String>,
    pub music_api_key: Option<String>,
}

impl ServiceConfig {
    /// Resolve the full configuration from environment and TOML
    pub fn load() -> Result<Self> {
        // A missing config file is fine; env vars and defaults cover it
        let toml = load_config_file().unwrap_or_default();

        let data_folder = resolve_data_folder(DATA_ENV);
        let port = resolve_port(&toml);

        let providers = &toml.providers;

        Ok(Self {
            bind_host: env_var("STORYTONE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_folder,
            gemini_api_key: resolve_required(
                "STORYTONE_GEMINI_API_KEY",
                providers.gemini_api_key.clone(),
                "gemini_api_key",
            )?,
            gemini_model: env_var("STORYTONE_GEMINI_MODEL")
                .or_else(|| providers.gemini_model.clone())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            azure_speech_key: resolve_required(
                "STORYTONE_AZURE_SPEECH_KEY",
                providers.azure_speech_key.clone(),
                "azure_speech_key",
            )?,
            azure_speech_region: resolve_required(
                "STORYTONE_AZURE_SPEECH_REGION",
                providers.azure_speech_region.clone(),
                "azure_speech_region",
            )?,
            azure_voice_name: env_var("STORYTONE_AZURE_VOICE")
                .or_else(|| providers.azure_voice_name.clone())
                .unwrap_or_else(|| DEFAULT_AZURE_VOICE.to_string()),
            music_endpoint: env_var("STORYTONE_MUSIC_ENDPOINT")
                .or_else(|| providers.music_endpoint.clone()),
            music_api_key: env_var("STORYTONE_MUSIC_API_KEY")
                .or_else(|| providers.music_api_key.clone()),
        })
    }

    /// Where story artifacts are written and served from
    pub fn stories_dir(&self) -> PathBuf {
        self.data_folder.join("stories")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join("storytone.db")
    }
}

fn resolve_port(toml: &TomlConfig) -> u16 {
    if let Some(raw) = env_var("STORYTONE_PORT") {
        match raw.parse() {
            Ok(port) => return port,
            Err(_) => {
                tracing::warn!(value = %raw, "Invalid STORYTONE_PORT, falling back");
            }
        }
    }
    toml.port.unwrap_or(DEFAULT_PORT)
}

/// Non-empty environment variable lookup
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// ENV → TOML resolution for a mandatory setting
fn resolve_required(env_name: &str, toml_value: Option<String>, toml_key: &str) -> Result<String> {
    if let Some(value) = env_var(env_name) {
        return Ok(value);
    }
    if let Some(value) = toml_value.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }
    Err(Error::Config(format!(
        "{key} not configured. Set the {env} environment variable or add \
         `{key} = \"...\"` to the [providers] table of \
         ~/.config/storytone/storytone.toml",
        key = toml_key,
        env = env_name,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_takes_priority_over_toml() {
        std::env::set_var("STORYTONE_TEST_KEY", "from-env");
        let value = resolve_required(
            "STORYTONE_TEST_KEY",
            Some("from-toml".to_string()),
            "test_key",
        )
        .unwrap();
        assert_eq!(value, "from-env");
        std::env::remove_var("STORYTONE_TEST_KEY");
    }

    #[test]
    #[serial]
    fn toml_fills_in_when_env_is_absent() {
        std::env::remove_var("STORYTONE_TEST_KEY");
        let value = resolve_required(
            "STORYTONE_TEST_KEY",
            Some("from-toml".to_string()),
            "test_key",
        )
        .unwrap();
        assert_eq!(value, "from-toml");
    }

    #[test]
    #[serial]
    fn missing_mandatory_key_names_the_remediation() {
        std::env::remove_var("STORYTONE_TEST_KEY");
        let err = resolve_required("STORYTONE_TEST_KEY", None, "test_key").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("STORYTONE_TEST_KEY"));
        assert!(message.contains("test_key"));
    }

    #[test]
    #[serial]
    fn blank_env_values_are_ignored() {
        std::env::set_var("STORYTONE_TEST_KEY", "   ");
        let value = resolve_required(
            "STORYTONE_TEST_KEY",
            Some("from-toml".to_string()),
            "test_key",
        )
        .unwrap();
        assert_eq!(value, "from-toml");
        std::env::remove_var("STORYTONE_TEST_KEY");
    }
}
