//! Error types for the Slate scanning and gallery pipeline.
//!
//! Errors are organized by stage. Most per-item conditions never surface as an
//! error at all: they are absorbed at the component boundary and reported as an
//! empty result plus a log record. What remains here is what a caller can act on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Slate operations.
#[derive(Error, Debug)]
pub enum SlateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Cache persistence errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image could not be opened or decoded
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Metadata extraction failed
    #[error("Metadata extraction failed for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Thumbnail generation or write failed
    #[error("Thumbnail failed for {path}: {message}")]
    Thumbnail { path: PathBuf, message: String },

    /// The output root itself is unusable; the whole generation fails
    #[error("Output directory {path} is unusable: {message}")]
    OutputRoot { path: PathBuf, message: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Worker task failed to complete (panicked or was aborted)
    #[error("Worker failed for {path}: {message}")]
    Worker { path: PathBuf, message: String },
}

/// Cache persistence errors.
///
/// Only `save` produces these; reading a missing or corrupt cache is a cache miss.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Writing or renaming the cache file failed
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache document could not be serialized
    #[error("Cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience type alias for Slate results.
pub type Result<T> = std::result::Result<T, SlateError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
