//! Slate Core - photo directory scanning, caching and gallery preparation.
//!
//! Slate walks directory trees of photographs, groups images by folder into
//! *slates*, reads capture date, focal length and orientation, produces
//! bounded display copies, and keeps a cache so repeat runs stay cheap.
//!
//! # Architecture
//!
//! ```text
//! roots → DirectoryScanner (or CacheStore) → ProcessingCoordinator → CacheStore
//!                                              ├ MetadataExtractor
//!                                              ├ ThumbnailGenerator
//!                                              └ StatAggregator → GalleryRenderer
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use slate_core::{CancelFlag, Config, GenerateOptions, SlateGallery};
//!
//! #[tokio::main]
//! async fn main() -> slate_core::Result<()> {
//!     let config = Config::load()?;
//!     let gallery = SlateGallery::new(config);
//!     let roots = vec!["./photos".into()];
//!
//!     let cancel = CancelFlag::new();
//!     let report = gallery.load_or_scan(&roots, false, &cancel, None).await?;
//!     let options = GenerateOptions::from_config(gallery.config());
//!     let build = gallery.generate(&report.slates, &[], &options, &cancel, None).await?;
//!     println!("{} images", build.image_count());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

// Re-exports for convenient access
pub use cache::{CacheStatus, CacheStore, StaleReason};
pub use config::Config;
pub use error::{CacheError, ConfigError, PipelineError, PipelineResult, Result, SlateError};
pub use output::{GalleryRenderer, JsonGalleryWriter, OutputFormat, RenderOutcome};
pub use pipeline::{
    BoundingBox, CancelFlag, DirectoryScanner, ProcessOptions, ProcessingCoordinator,
    ProgressUpdate, StatAggregator, ThumbnailRequest,
};
pub use types::{
    GalleryBuild, GalleryImage, GallerySlate, Image, Orientation, Slate, SlateMap,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where a scan report's slates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlateSource {
    Cache,
    Scan,
}

/// Result of `SlateGallery::scan` and `SlateGallery::load_or_scan`.
#[derive(Debug)]
pub struct ScanReport {
    pub slates: SlateMap,
    pub source: SlateSource,
    /// Roots that did not exist
    pub missing_roots: Vec<PathBuf>,
    /// Images dropped during the metadata pass
    pub failed: usize,
    /// Images whose tags came from the previous cache
    pub reused_tags: usize,
    /// The scan was cancelled; nothing was cached
    pub cancelled: bool,
    /// Cache file written by this scan
    pub cache_path: Option<PathBuf>,
}

impl ScanReport {
    pub fn image_count(&self) -> usize {
        self.slates.values().map(|s| s.images.len()).sum()
    }
}

/// Knobs for one gallery generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub thumbnails: bool,
    pub thumbnail_size: u32,
    pub lazy_loading: bool,
}

impl GenerateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            thumbnails: config.thumbnail.enabled,
            thumbnail_size: config.thumbnail.size,
            lazy_loading: config.output.lazy_loading,
        }
    }
}

/// Entry point wiring scanner, cache and coordinator together.
pub struct SlateGallery {
    config: Config,
    scanner: Arc<DirectoryScanner>,
    cache: CacheStore,
}

impl SlateGallery {
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing Slate v{}", VERSION);
        Self {
            scanner: Arc::new(DirectoryScanner::new(config.scan.clone())),
            cache: CacheStore::new(config.cache_dir()),
            config,
        }
    }

    /// Create a new instance with configuration from the default location.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn cache_status(&self, roots: &[PathBuf]) -> CacheStatus {
        self.cache.status(roots)
    }

    fn coordinator(&self, progress: Option<mpsc::Sender<ProgressUpdate>>) -> ProcessingCoordinator {
        let coordinator = ProcessingCoordinator::new(&self.config);
        match progress {
            Some(sender) => coordinator.with_progress(sender),
            None => coordinator,
        }
    }

    /// Scan `roots`, read metadata for every image and refresh the cache.
    ///
    /// Tags from the previous cache are reused for files whose mtime is
    /// unchanged. The directory snapshot stored with the cache is taken
    /// before the walk. A cancelled scan is returned as is and not cached.
    pub async fn scan(
        &self,
        roots: &[PathBuf],
        cancel: &CancelFlag,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<ScanReport> {
        let start = std::time::Instant::now();
        let snapshot = CacheStore::dir_snapshot(roots);
        let scanner = Arc::clone(&self.scanner);
        let owned_roots = roots.to_vec();
        let outcome = tokio::task::spawn_blocking(move || scanner.scan_roots(&owned_roots))
            .await
            .map_err(|e| PipelineError::Worker {
                path: roots.first().cloned().unwrap_or_default(),
                message: e.to_string(),
            })?;

        let mut slates = outcome.slates;
        if let Some(previous) = self.cache.load(roots) {
            pipeline::carry_forward(&mut slates, &previous);
        }

        let stats = Arc::new(StatAggregator::new());
        let batch = self
            .coordinator(progress)
            .process_slates(slates, &ProcessOptions::default(), &stats, cancel)
            .await;

        let every_root_missing = !roots.is_empty() && outcome.missing_roots.len() == roots.len();
        let cache_path = if batch.cancelled || every_root_missing {
            None
        } else {
            match self.cache.save_at(roots, &batch.slates, snapshot) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to save cache: {}", e);
                    None
                }
            }
        };

        tracing::info!(
            "Scanned {} slates in {:?}",
            batch.slates.len(),
            start.elapsed()
        );
        Ok(ScanReport {
            slates: batch.slates,
            source: SlateSource::Scan,
            missing_roots: outcome.missing_roots,
            failed: batch.failed,
            reused_tags: batch.reused_tags,
            cancelled: batch.cancelled,
            cache_path,
        })
    }

    /// Use the cache when it is valid (or stale and `accept_stale` is set),
    /// otherwise scan.
    pub async fn load_or_scan(
        &self,
        roots: &[PathBuf],
        accept_stale: bool,
        cancel: &CancelFlag,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<ScanReport> {
        let usable = match self.cache.status(roots) {
            CacheStatus::Valid => true,
            CacheStatus::Stale(reason) => {
                tracing::info!("Cache is stale: {}", reason);
                accept_stale
            }
            CacheStatus::Missing => false,
        };

        if usable {
            if let Some(slates) = self.cache.load(roots) {
                tracing::info!("Loaded {} slates from cache", slates.len());
                return Ok(ScanReport {
                    slates,
                    source: SlateSource::Cache,
                    missing_roots: Vec::new(),
                    failed: 0,
                    reused_tags: 0,
                    cancelled: false,
                    cache_path: Some(self.cache.cache_path(roots)),
                });
            }
        }
        self.scan(roots, cancel, progress).await
    }

    /// Process the selected slates (all when `selected` is empty) into a
    /// renderable gallery with histograms.
    ///
    /// Fails only when the thumbnail directory itself cannot be created.
    pub async fn generate(
        &self,
        slates: &SlateMap,
        selected: &[String],
        options: &GenerateOptions,
        cancel: &CancelFlag,
        progress: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<GalleryBuild> {
        let chosen: SlateMap = slates
            .iter()
            .filter(|(name, _)| selected.is_empty() || selected.contains(name))
            .map(|(name, slate)| (name.clone(), slate.clone()))
            .collect();
        for name in selected {
            if !slates.contains_key(name) {
                tracing::warn!("Unknown slate: {}", name);
            }
        }

        let bbox = BoundingBox::square(options.thumbnail_size);
        let process_options = if options.thumbnails {
            let dir = self.config.thumbnail_dir();
            std::fs::create_dir_all(&dir).map_err(|e| PipelineError::OutputRoot {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            ProcessOptions {
                thumbnails: Some(ThumbnailRequest {
                    dir,
                    boxes: vec![bbox],
                }),
            }
        } else {
            ProcessOptions::default()
        };

        let stats = Arc::new(StatAggregator::new());
        let batch = self
            .coordinator(progress)
            .process_slates(chosen, &process_options, &stats, cancel)
            .await;

        let display_key = options.thumbnails.then(|| bbox.label());
        let gallery_slates = batch
            .slates
            .values()
            .map(|slate| GallerySlate {
                slate: slate.name.clone(),
                images: slate
                    .images
                    .iter()
                    .map(|image| GalleryImage::from_image(image, display_key.as_deref()))
                    .collect(),
            })
            .collect();

        Ok(GalleryBuild {
            slates: gallery_slates,
            focal_lengths: stats.focal_length_entries(),
            unknown_focal_lengths: stats.unknown_focal_lengths(),
            dates: stats.date_entries(),
            unknown_dates: stats.unknown_dates(),
            failed: batch.failed,
            cancelled: batch.cancelled,
        })
    }

    /// Renderer writing `gallery.json` under the configured output directory.
    ///
    /// Scan roots and the thumbnail directory are the allowed locations.
    pub fn json_writer(&self, roots: &[PathBuf]) -> JsonGalleryWriter {
        let mut allowed = roots.to_vec();
        allowed.push(self.config.thumbnail_dir());
        JsonGalleryWriter::new(self.config.output_dir(), &allowed, self.config.output.pretty)
    }
}
