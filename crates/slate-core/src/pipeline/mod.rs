//! Image processing pipeline components.
//!
//! - **discovery**: Find image files and group them into slates
//! - **metadata**: Extract EXIF tags, capture date and orientation
//! - **thumbnail**: Generate bounded JPEG display copies
//! - **hash**: Deterministic naming for thumbnails and cache files
//! - **processor**: Per-image work unit
//! - **coordinator**: Bounded parallel processing across slates
//! - **stats**: Focal-length and capture-date histograms
//! - **channel**: Progress updates and cancellation

pub mod channel;
pub mod coordinator;
pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod processor;
pub mod stats;
pub mod thumbnail;

// Re-exports for convenient access
pub use channel::{progress_channel, CancelFlag, ProgressUpdate};
pub use coordinator::{carry_forward, BatchOutcome, ProcessingCoordinator};
pub use discovery::{DirectoryScanner, ScanOutcome, ROOT_SLATE};
pub use hash::Hasher;
pub use metadata::MetadataExtractor;
pub use processor::{ImageProcessor, ProcessOptions, ProcessingResult, ThumbnailRequest};
pub use stats::StatAggregator;
pub use thumbnail::{BoundingBox, ThumbnailGenerator};
