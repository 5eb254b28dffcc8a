//! Core data types for the Slate pipeline.
//!
//! Scan results, cache records and the gallery payload handed to a renderer
//! are all explicit structs so that every field is checked at compile time.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Slate name to slate. Ordered by name so iteration is reproducible.
pub type SlateMap = BTreeMap<String, Slate>;

/// Current on-disk cache format.
///
/// Version 1 had no metadata block and may list images as bare path
/// strings; version 2 adds per-image mtime and raw EXIF tags.
pub const CACHE_VERSION: u32 = 2;

/// Cache document key reserved for the metadata block; never a slate name.
pub const METADATA_KEY: &str = "_metadata";

/// Viewing orientation of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    #[default]
    Unknown,
}

impl Orientation {
    /// Resolve from an EXIF orientation code. 90° rotations (6 and 8) are portrait.
    pub fn from_exif_code(code: u32) -> Self {
        match code {
            6 | 8 => Orientation::Portrait,
            _ => Orientation::Landscape,
        }
    }

    /// Resolve from pixel dimensions. Square images are landscape.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Unknown => "unknown",
        }
    }
}

/// The raw EXIF tags Slate cares about, as read from the file.
///
/// Stored in the cache so unchanged files never need to be re-read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifTags {
    /// Focal length in millimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,

    /// Orientation code (1-8)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time_original: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time_digitized: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
}

impl ExifTags {
    pub fn is_empty(&self) -> bool {
        self.focal_length.is_none()
            && self.orientation.is_none()
            && self.date_time_original.is_none()
            && self.date_time_digitized.is_none()
            && self.date_time.is_none()
    }
}

/// One image inside a slate.
///
/// Built once by the scanner (path only) and rebuilt wholesale by the
/// processor; never mutated field by field from worker threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Absolute path to the source file (identity)
    pub path: PathBuf,

    /// Source modification time (nanoseconds since epoch) when tags were read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_ns: Option<u64>,

    /// Raw EXIF tags, when the image has been processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifTags>,

    /// Focal length in millimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,

    #[serde(default)]
    pub orientation: Orientation,

    /// Best available capture timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<NaiveDateTime>,

    /// Generated display copies keyed by bounding box ("600x600")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnails: BTreeMap<String, PathBuf>,
}

impl Image {
    /// An image that has been discovered but not processed yet.
    pub fn discovered(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mtime_ns: None,
            exif: None,
            focal_length: None,
            orientation: Orientation::Unknown,
            captured_at: None,
            thumbnails: BTreeMap::new(),
        }
    }

    /// Just the filename portion of the path.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Order images by filename, then by full path so equal names stay stable.
pub(crate) fn sort_by_filename(images: &mut [Image]) {
    images.sort_by(|a, b| {
        a.file_name()
            .cmp(&b.file_name())
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// A named bucket of images from one scanned directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slate {
    /// Slate name; the key of the slate map, so not repeated on disk
    #[serde(skip)]
    pub name: String,

    /// Images ordered by filename
    #[serde(deserialize_with = "images_or_paths")]
    pub images: Vec<Image>,
}

/// An image as stored on disk: a full record, or a bare path in v1 caches.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageEntry {
    Path(PathBuf),
    Full(Image),
}

fn images_or_paths<'de, D>(deserializer: D) -> Result<Vec<Image>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ImageEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            ImageEntry::Path(path) => Image::discovered(path),
            ImageEntry::Full(image) => image,
        })
        .collect())
}

impl Slate {
    pub fn new(name: impl Into<String>, images: Vec<Image>) -> Self {
        Self {
            name: name.into(),
            images,
        }
    }
}

/// Metadata block stored under `_metadata` in every cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default = "legacy_version")]
    pub version: u32,

    /// When the scan was saved (seconds since epoch)
    pub scan_time: f64,

    /// Total images across all slates
    pub file_count: usize,

    /// Newest modification time among the watched directories at save time
    pub dir_mtime: f64,

    /// Sorted root directories, present for composite caches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dirs: Option<Vec<String>>,
}

fn legacy_version() -> u32 {
    1
}

/// The whole cache document: metadata plus one key per slate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CacheMetadata>,

    #[serde(flatten)]
    pub slates: SlateMap,
}

impl CacheRecord {
    /// Copy map keys into each slate's `name`, which is not stored on disk.
    pub(crate) fn restore_names(mut self) -> Self {
        for (name, slate) in self.slates.iter_mut() {
            slate.name = name.clone();
        }
        self
    }
}

/// Focal length usable as an ordered histogram key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocalLength(pub f64);

impl PartialEq for FocalLength {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FocalLength {}

impl PartialOrd for FocalLength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FocalLength {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One focal-length histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalLengthEntry {
    pub value: f64,
    pub count: usize,
}

/// One capture-date histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateEntry {
    /// Calendar day, serialized as YYYY-MM-DD
    pub value: NaiveDate,
    pub count: usize,
    /// DD/MM/YY form for display
    pub display_date: String,
}

/// An image record enriched for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub original_path: PathBuf,
    pub filename: String,
    /// Thumbnail when one was generated, otherwise the original
    pub display_path: PathBuf,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnails: BTreeMap<String, PathBuf>,
    pub focal_length: Option<f64>,
    pub orientation: Orientation,
    pub date_taken: Option<NaiveDateTime>,
}

impl GalleryImage {
    /// Build from a processed image, preferring the thumbnail for `display_key`.
    pub fn from_image(image: &Image, display_key: Option<&str>) -> Self {
        let display_path = display_key
            .and_then(|key| image.thumbnails.get(key))
            .cloned()
            .unwrap_or_else(|| image.path.clone());
        Self {
            original_path: image.path.clone(),
            filename: image.file_name(),
            display_path,
            thumbnails: image.thumbnails.clone(),
            focal_length: image.focal_length,
            orientation: image.orientation,
            date_taken: image.captured_at,
        }
    }
}

/// A slate ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GallerySlate {
    pub slate: String,
    pub images: Vec<GalleryImage>,
}

/// Everything a renderer needs from one generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryBuild {
    pub slates: Vec<GallerySlate>,
    /// Ascending by focal length
    pub focal_lengths: Vec<FocalLengthEntry>,
    pub unknown_focal_lengths: usize,
    /// Ascending by day
    pub dates: Vec<DateEntry>,
    pub unknown_dates: usize,
    /// Images dropped because processing failed
    #[serde(skip)]
    pub failed: usize,
    #[serde(skip)]
    pub cancelled: bool,
}

impl GalleryBuild {
    pub fn image_count(&self) -> usize {
        self.slates.iter().map(|s| s.images.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_exif_code() {
        assert_eq!(Orientation::from_exif_code(6), Orientation::Portrait);
        assert_eq!(Orientation::from_exif_code(8), Orientation::Portrait);
        assert_eq!(Orientation::from_exif_code(1), Orientation::Landscape);
        assert_eq!(Orientation::from_exif_code(3), Orientation::Landscape);
    }

    #[test]
    fn test_orientation_from_dimensions() {
        assert_eq!(Orientation::from_dimensions(100, 200), Orientation::Portrait);
        assert_eq!(Orientation::from_dimensions(200, 100), Orientation::Landscape);
        assert_eq!(Orientation::from_dimensions(100, 100), Orientation::Landscape);
    }

    #[test]
    fn test_cache_record_json_shape() {
        let mut slates = SlateMap::new();
        slates.insert(
            "/".to_string(),
            Slate::new("/", vec![Image::discovered("/photos/a.jpg")]),
        );
        let record = CacheRecord {
            metadata: Some(CacheMetadata {
                version: CACHE_VERSION,
                scan_time: 1.5,
                file_count: 1,
                dir_mtime: 1.0,
                root_dirs: None,
            }),
            slates,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_metadata"]["file_count"], 1);
        assert!(value["_metadata"].get("root_dirs").is_none());
        assert_eq!(value["/"]["images"][0]["path"], "/photos/a.jpg");

        let back: CacheRecord = serde_json::from_value(value).unwrap();
        let back = back.restore_names();
        assert_eq!(back.slates.len(), 1);
        assert_eq!(back.slates["/"].name, "/");
    }

    #[test]
    fn test_legacy_record_has_no_metadata() {
        let json = r#"{"trip": {"images": [{"path": "/p/a.jpg"}]}}"#;
        let record: CacheRecord = serde_json::from_str(json).unwrap();
        assert!(record.metadata.is_none());
        assert_eq!(record.slates["trip"].images[0].orientation, Orientation::Unknown);
    }

    #[test]
    fn test_bare_path_images_are_discovered() {
        let json = r#"{"trip": {"images": ["/p/a.jpg", {"path": "/p/b.jpg", "orientation": "portrait"}]}}"#;
        let record: CacheRecord = serde_json::from_str(json).unwrap();
        let images = &record.slates["trip"].images;
        assert_eq!(images[0], Image::discovered("/p/a.jpg"));
        assert_eq!(images[1].orientation, Orientation::Portrait);
    }

    #[test]
    fn test_metadata_timestamps_survive_json() {
        for i in 0..5000u32 {
            let secs = std::time::Duration::new(
                1_600_000_000 + u64::from(i) * 977,
                i * 199_999 % 1_000_000_000,
            );
            let metadata = CacheMetadata {
                version: CACHE_VERSION,
                scan_time: secs.as_secs_f64(),
                file_count: 0,
                dir_mtime: secs.as_secs_f64(),
                root_dirs: None,
            };
            let json = serde_json::to_string(&metadata).unwrap();
            let back: CacheMetadata = serde_json::from_str(&json).unwrap();
            assert_eq!(back, metadata, "{json}");
        }
    }

    #[test]
    fn test_focal_length_ordering() {
        let mut keys = [FocalLength(85.0), FocalLength(24.0), FocalLength(50.0)];
        keys.sort();
        assert_eq!(keys[0].0, 24.0);
        assert_eq!(keys[2].0, 85.0);
    }

    #[test]
    fn test_gallery_image_prefers_thumbnail() {
        let mut image = Image::discovered("/p/a.jpg");
        image
            .thumbnails
            .insert("600x600".to_string(), PathBuf::from("/t/a_1234abcd_600x600.jpg"));

        let with_thumb = GalleryImage::from_image(&image, Some("600x600"));
        assert_eq!(with_thumb.display_path, PathBuf::from("/t/a_1234abcd_600x600.jpg"));

        let without = GalleryImage::from_image(&image, Some("1200x1200"));
        assert_eq!(without.display_path, PathBuf::from("/p/a.jpg"));
        assert_eq!(without.filename, "a.jpg");
    }
}
