//! Configuration management for Slate.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a missing file or a
//! partially filled one is always usable.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Slate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Directory scanning settings
    pub scan: ScanConfig,

    /// Worker pool settings
    pub processing: ProcessingConfig,

    /// Progress reporting settings
    pub pipeline: PipelineConfig,

    /// Thumbnail generation settings
    pub thumbnail: ThumbnailConfig,

    /// Gallery output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.slate.slate-gallery/config.toml
    /// - Linux: ~/.config/slate-gallery/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\slate\slate-gallery\config\config.toml
    ///
    /// Falls back to ~/.slate_gallery/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "slate", "slate-gallery")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".slate_gallery").join("config.toml")
            })
    }

    /// Get the resolved data directory (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        expand(&self.general.data_dir)
    }

    /// Directory that holds one JSON file per scanned directory set.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir().join("cache")
    }

    /// Get the resolved gallery output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.output.dir)
    }

    /// Directory thumbnails are written to.
    pub fn thumbnail_dir(&self) -> PathBuf {
        match &self.thumbnail.dir {
            Some(dir) => expand(dir),
            None => self.output_dir().join("thumbnails"),
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
