//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the scan cache (`<data_dir>/cache`)
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.slate_gallery"),
        }
    }
}

/// Directory scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions recognised as images (case-insensitive, no dot)
    pub supported_formats: Vec<String>,

    /// Glob patterns matched against file and directory names.
    /// Matching directories are not descended into.
    pub exclude_patterns: Vec<String>,

    /// Filename prefix of platform resource-fork files, which are never images
    pub resource_fork_prefix: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "tiff".to_string(),
                "bmp".to_string(),
                "gif".to_string(),
            ],
            exclude_patterns: Vec::new(),
            resource_fork_prefix: "._".to_string(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Explicit worker count. When unset, twice the available cores are used,
    /// capped at `max_workers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_workers: Option<usize>,

    /// Upper bound for the derived worker count
    pub max_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: None,
            max_workers: 16,
        }
    }
}

impl ProcessingConfig {
    /// Resolve the effective worker count.
    ///
    /// Most of the work is file decode/encode, so twice the core count is used
    /// when no explicit value is configured.
    pub fn worker_count(&self) -> usize {
        if let Some(workers) = self.parallel_workers {
            return workers.max(1);
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores * 2).min(self.max_workers).max(1)
    }
}

/// Pipeline settings for progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the bounded progress channel
    pub progress_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_buffer: 64,
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Whether to generate thumbnails during gallery generation
    pub enabled: bool,

    /// Square bounding box in pixels (longest edge)
    pub size: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Output directory; defaults to `<output.dir>/thumbnails`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 600,
            quality: 90,
            dir: None,
        }
    }
}

/// Gallery output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the gallery document is written to
    pub dir: PathBuf,

    /// Layout flag forwarded to the renderer
    pub lazy_loading: bool,

    /// Pretty-print the gallery JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./gallery"),
            lazy_loading: true,
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
