//! EXIF metadata extraction from images.

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{ExifTags, Orientation};

/// Timestamp layout used by every EXIF date field.
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Marker preceding the TIFF block in APP1 segments and some raw containers.
const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// Extracts EXIF metadata from image files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read focal length, orientation code and date fields from a file.
    ///
    /// Returns `None` for files without usable tags, unreadable files and
    /// corrupt files alike.
    ///
    /// Container-aware parsing is tried first; files whose container is not
    /// understood are searched for an embedded EXIF block instead.
    pub fn extract_tags(path: &Path) -> Option<ExifTags> {
        let exif = match Self::read_container(path).or_else(|_| Self::read_embedded(path)) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::debug!("{}", e);
                return None;
            }
        };

        let tags = ExifTags {
            focal_length: Self::get_focal_length(&exif, path),
            orientation: Self::get_u32(&exif, Tag::Orientation),
            date_time_original: Self::get_ascii(&exif, Tag::DateTimeOriginal),
            date_time_digitized: Self::get_ascii(&exif, Tag::DateTimeDigitized),
            date_time: Self::get_ascii(&exif, Tag::DateTime),
        };

        if tags.is_empty() {
            None
        } else {
            Some(tags)
        }
    }

    /// Pick the capture timestamp: original, then digitized, then modified.
    ///
    /// The first value that parses wins; unparsable values are skipped.
    pub fn capture_date(tags: &ExifTags) -> Option<NaiveDateTime> {
        let candidates = [
            ("DateTimeOriginal", &tags.date_time_original),
            ("DateTimeDigitized", &tags.date_time_digitized),
            ("DateTime", &tags.date_time),
        ];
        candidates.into_iter().find_map(|(name, value)| {
            let value = value.as_deref()?;
            match NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_FORMAT) {
                Ok(dt) => Some(dt),
                Err(e) => {
                    tracing::warn!("Could not parse {} {:?}: {}", name, value, e);
                    None
                }
            }
        })
    }

    /// Resolve viewing orientation.
    ///
    /// A file whose dimensions cannot be read is `Unknown`. Otherwise an
    /// orientation tag decides when present, and pixel dimensions are
    /// compared when it is not.
    pub fn orientation(path: &Path, tags: Option<&ExifTags>) -> Orientation {
        let (width, height) = match image::image_dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                tracing::debug!("Could not read dimensions of {:?}: {}", path, e);
                return Orientation::Unknown;
            }
        };
        match tags.and_then(|t| t.orientation) {
            Some(code) => Orientation::from_exif_code(code),
            None => Orientation::from_dimensions(width, height),
        }
    }

    fn read_container(path: &Path) -> PipelineResult<Exif> {
        let file = File::open(path).map_err(|e| PipelineError::Metadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);
        Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| PipelineError::Metadata {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn read_embedded(path: &Path) -> PipelineResult<Exif> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::Metadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let start = bytes
            .windows(EXIF_MARKER.len())
            .position(|w| w == EXIF_MARKER)
            .ok_or_else(|| PipelineError::Metadata {
                path: path.to_path_buf(),
                message: "no EXIF data".to_string(),
            })?;
        let tiff = bytes[start + EXIF_MARKER.len()..].to_vec();
        Reader::new()
            .read_raw(tiff)
            .map_err(|e| PipelineError::Metadata {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn get_ascii(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts.first().and_then(|bytes| {
                let s = String::from_utf8_lossy(bytes);
                let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                (!s.is_empty()).then(|| s.to_string())
            }),
            _ => None,
        }
    }

    fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }

    fn get_focal_length(exif: &Exif, path: &Path) -> Option<f64> {
        let field = exif.get_field(Tag::FocalLength, In::PRIMARY)?;
        match &field.value {
            Value::Rational(v) => {
                let r = v.first()?;
                if r.denom == 0 {
                    tracing::warn!("Ignoring focal length with zero denominator in {:?}", path);
                    None
                } else {
                    Some(r.to_f64())
                }
            }
            _ => None,
        }
    }
}
