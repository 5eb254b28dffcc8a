//! Single-image work unit: metadata, orientation and thumbnails.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::config::Config;
use crate::error::PipelineError;
use crate::types::{Image, Orientation};

use super::metadata::MetadataExtractor;
use super::thumbnail::{BoundingBox, ThumbnailGenerator};

/// Where and at which sizes thumbnails should be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    pub dir: PathBuf,
    pub boxes: Vec<BoundingBox>,
}

/// Options for controlling image processing behavior.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Generate thumbnails; `None` skips them
    pub thumbnails: Option<ThumbnailRequest>,
}

/// Outcome of processing one image. Never persisted.
#[derive(Debug)]
pub enum ProcessingResult {
    Success {
        image: Image,
        /// Tags came from the previous scan instead of the file
        reused_tags: bool,
    },
    Failure {
        path: PathBuf,
        reason: PipelineError,
    },
}

/// Processes one image at a time. Blocking; callers run it off the async runtime.
pub struct ImageProcessor {
    thumbnail_gen: ThumbnailGenerator,
}

impl ImageProcessor {
    /// Create a new image processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            thumbnail_gen: ThumbnailGenerator::new(&config.thumbnail),
        }
    }

    /// Build a fully populated `Image` from a discovered or cached one.
    ///
    /// Raw tags carried on `image` are reused when its recorded mtime still
    /// matches the file; otherwise the file is read again.
    pub fn process(&self, image: &Image, options: &ProcessOptions) -> ProcessingResult {
        let path = image.path.as_path();
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {:?}", path);

        let mtime_ns = match file_mtime_ns(path) {
            Ok(mtime_ns) => mtime_ns,
            Err(reason) => return failure(path, reason),
        };

        let (tags, reused_tags) = match (&image.exif, image.mtime_ns) {
            (Some(tags), Some(cached)) if cached == mtime_ns => (tags.clone(), true),
            _ => (MetadataExtractor::extract_tags(path).unwrap_or_default(), false),
        };

        let orientation = MetadataExtractor::orientation(path, Some(&tags));
        if orientation == Orientation::Unknown {
            return failure(
                path,
                PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: "not a readable image".to_string(),
                },
            );
        }

        let thumbnails = match &options.thumbnails {
            Some(request) => self.thumbnail_gen.generate(
                path,
                &request.dir,
                &request.boxes,
                Some(tags.orientation.unwrap_or(1)),
            ),
            None => image.thumbnails.clone(),
        };

        let processed = Image {
            path: path.to_path_buf(),
            mtime_ns: Some(mtime_ns),
            focal_length: tags.focal_length,
            orientation,
            captured_at: MetadataExtractor::capture_date(&tags),
            thumbnails,
            exif: Some(tags),
        };

        tracing::trace!("Processed {:?} in {:?}", path, start.elapsed());
        ProcessingResult::Success {
            image: processed,
            reused_tags,
        }
    }
}

fn failure(path: &Path, reason: PipelineError) -> ProcessingResult {
    ProcessingResult::Failure {
        path: path.to_path_buf(),
        reason,
    }
}

/// Modification time in nanoseconds since the epoch.
pub(crate) fn file_mtime_ns(path: &Path) -> Result<u64, PipelineError> {
    let metadata =
        std::fs::metadata(path).map_err(|_| PipelineError::FileNotFound(path.to_path_buf()))?;
    let modified = metadata.modified().map_err(|e| PipelineError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0))
}
