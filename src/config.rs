//! Application configuration
//!
//! Stored as toml at `~/.config/axis-controls/config.toml`. A missing file is
//! created with defaults; a malformed one is logged and replaced by defaults in
//! memory so start-up never aborts on configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::controller::device_sampler::SamplerSettings;
use crate::controller::mapping_db::MappingDbSettings;

const APP_DIR: &str = "axis-controls";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Which global axis profile to use
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub name: String,
    /// Store file, defaults to the profile directory entry for `name`
    pub path: Option<PathBuf>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub frame_interval_ms: u64,
    pub sampler: SamplerSettings,
    pub profile: ProfileSettings,
    pub mapping_db: MappingDbSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            sampler: SamplerSettings::default(),
            profile: ProfileSettings::default(),
            mapping_db: MappingDbSettings::default(),
        }
    }
}

pub fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

fn config_dir() -> PathBuf {
    get_home_dir().join(".config").join(APP_DIR)
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Global store file of the configured profile
    pub fn profile_path(&self) -> PathBuf {
        match &self.profile.path {
            Some(path) => path.clone(),
            None => config_dir()
                .join("profiles")
                .join(format!("{}.toml", self.profile.name)),
        }
    }

    /// Writes the defaults unless a config already exists
    pub async fn ensure_default_config(path: &Path) -> Result<(), ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        if !exists {
            info!("Creating default config at {}", path.display());
            AppConfig::default().save(path).await?;
        }
        Ok(())
    }

    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        Self::ensure_default_config(path).await?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => {
                debug!("Loaded config from {}: {:?}", path.display(), config);
                Ok(config)
            }
            Err(e) => {
                warn!(
                    "Malformed config at {}, using defaults: {}",
                    path.display(),
                    e
                );
                Ok(AppConfig::default())
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(
            &path,
            "frame_interval_ms = 8\n[profile]\nname = \"rover\"\n[mapping_db]\nenabled = true\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config.frame_interval_ms, 8);
        assert_eq!(config.profile.name, "rover");
        assert!(config.mapping_db.enabled);
        assert_eq!(config.sampler, SamplerSettings::default());
        assert!(config.profile_path().ends_with("profiles/rover.toml"));
    }

    #[tokio::test]
    async fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "frame_interval_ms = \"soon\"").await.unwrap();

        let config = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn saved_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.profile.path = Some(dir.path().join("axes.toml"));
        config.sampler.smoothing_rate = 6.0;
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.profile_path(), dir.path().join("axes.toml"));
    }
}
