//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// On-disk TOML configuration.
///
/// Lives at `~/.config/storytone/storytone.toml` (per-user) or
/// `/etc/storytone/storytone.toml` (system-wide, Linux only). Every field is
/// optional; environment variables take priority over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Where stories, artifacts, and the database live
    pub data_folder: Option<String>,
    /// HTTP listen port
    pub port: Option<u16>,
    /// Generation provider credentials and endpoints
    #[serde(default)]
    pub providers: ProviderToml,
}

/// `[providers]` table of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderToml {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub azure_speech_key: Option<String>,
    pub azure_speech_region: Option<String>,
    pub azure_voice_name: Option<String>,
    pub music_endpoint: Option<String>,
    pub music_api_key: Option<String>,
}

/// Data folder resolution priority:
/// 1. Environment variable (highest priority)
/// 2. TOML config file
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(env_var_name: &str) -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            tracing::debug!(source = env_var_name, "Data folder resolved from environment");
            return PathBuf::from(path);
        }
    }

    // Priority 2: TOML config file
    if let Ok(config) = load_config_file() {
        if let Some(folder) = config.data_folder {
            tracing::debug!("Data folder resolved from TOML config");
            return PathBuf::from(folder);
        }
    }

    // Priority 3: OS-dependent compiled default
    default_data_folder()
}

/// Load the TOML config file from the platform config location
pub fn load_config_file() -> Result<TomlConfig> {
    let path = config_file_path()
        .ok_or_else(|| Error::Config("No config file found".to_string()))?;
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Locate the config file for the platform, if one exists
fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("storytone").join("storytone.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/storytone/storytone.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    // ~/.local/share/storytone on Linux, ~/Library/Application Support/storytone
    // on macOS, %LOCALAPPDATA%\storytone on Windows
    dirs::data_local_dir()
        .map(|d| d.join("storytone"))
        .unwrap_or_else(|| PathBuf::from("./storytone_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_toml_config() {
        let config: TomlConfig = toml::from_str(
            r#"
            data_folder = "/var/lib/storytone"
            port = 5733

            [providers]
            gemini_api_key = "key-123"
            azure_speech_region = "eastus"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_folder.as_deref(), Some("/var/lib/storytone"));
        assert_eq!(config.port, Some(5733));
        assert_eq!(config.providers.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.providers.azure_speech_region.as_deref(), Some("eastus"));
        assert!(config.providers.music_endpoint.is_none());
    }

    #[test]
    fn empty_toml_is_valid() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.data_folder.is_none());
        assert!(config.providers.gemini_api_key.is_none());
    }

    #[test]
    fn default_data_folder_is_not_empty() {
        assert!(!default_data_folder().as_os_str().is_empty());
    }
}
