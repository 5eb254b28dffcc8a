//! Gallery rendering and slate listings.
//!
//! `GalleryRenderer` is the seam to whatever turns a generated gallery into a
//! document. `JsonGalleryWriter` is the bundled implementation: it writes a
//! single `gallery.json` that a template or web front end can consume.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::types::{GalleryBuild, GalleryImage, SlateMap};

/// File name written by `JsonGalleryWriter`.
pub const GALLERY_FILE: &str = "gallery.json";

/// Result of a render call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutcome {
    pub success: bool,
    /// Images left out for safety reasons (outside every allowed root)
    pub skipped: usize,
    /// Where the document was written, on success
    pub output: Option<PathBuf>,
    /// Failure reason
    pub message: Option<String>,
}

impl RenderOutcome {
    fn failed(message: impl Into<String>, skipped: usize) -> Self {
        Self {
            success: false,
            skipped,
            output: None,
            message: Some(message.into()),
        }
    }
}

/// Turns a generated gallery into an output document.
pub trait GalleryRenderer {
    fn render(&self, gallery: &GalleryBuild, lazy_loading: bool) -> RenderOutcome;
}

#[derive(Serialize)]
struct RenderedImage<'a> {
    #[serde(flatten)]
    image: &'a GalleryImage,
    web_path: String,
}

#[derive(Serialize)]
struct RenderedSlate<'a> {
    slate: &'a str,
    images: Vec<RenderedImage<'a>>,
}

#[derive(Serialize)]
struct FocalRow {
    value: Option<f64>,
    label: String,
    count: usize,
}

#[derive(Serialize)]
struct DateRow {
    value: Option<NaiveDate>,
    display_date: String,
    count: usize,
}

#[derive(Serialize)]
struct GalleryDocument<'a> {
    generated_at: String,
    lazy_loading: bool,
    image_count: usize,
    slates: Vec<RenderedSlate<'a>>,
    focal_lengths: Vec<FocalRow>,
    dates: Vec<DateRow>,
}

/// Writes `<output_dir>/gallery.json`.
///
/// Every referenced file must resolve to a location under one of the allowed
/// roots; images that do not are skipped and counted.
#[derive(Debug, Clone)]
pub struct JsonGalleryWriter {
    output_dir: PathBuf,
    allowed_roots: Vec<PathBuf>,
    pretty: bool,
}

impl JsonGalleryWriter {
    /// Allowed roots that cannot be resolved are dropped with a warning.
    pub fn new(output_dir: impl Into<PathBuf>, allowed_roots: &[PathBuf], pretty: bool) -> Self {
        let allowed_roots = allowed_roots
            .iter()
            .filter_map(|root| match root.canonicalize() {
                Ok(canonical) => Some(canonical),
                Err(e) => {
                    tracing::warn!("Ignoring allowed root {:?}: {}", root, e);
                    None
                }
            })
            .collect();
        Self {
            output_dir: output_dir.into(),
            allowed_roots,
            pretty,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(GALLERY_FILE)
    }

    /// Canonical path of `path` if it lies under an allowed root.
    fn resolve_allowed(&self, path: &Path) -> Option<PathBuf> {
        let canonical = path.canonicalize().ok()?;
        self.allowed_roots
            .iter()
            .any(|root| canonical.starts_with(root))
            .then_some(canonical)
    }

    fn build_document<'a>(&self, gallery: &'a GalleryBuild, lazy_loading: bool) -> (GalleryDocument<'a>, usize) {
        let mut skipped = 0;
        let mut image_count = 0;
        let slates = gallery
            .slates
            .iter()
            .map(|slate| {
                let images = slate
                    .images
                    .iter()
                    .filter_map(|image| {
                        let display = self.resolve_allowed(&image.display_path);
                        let original = self.resolve_allowed(&image.original_path);
                        match (display, original) {
                            (Some(display), Some(_)) => Some(RenderedImage {
                                image,
                                web_path: to_web_path(&display),
                            }),
                            _ => {
                                tracing::warn!(
                                    "Skipping {:?}: outside allowed directories",
                                    image.original_path
                                );
                                skipped += 1;
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>();
                image_count += images.len();
                RenderedSlate {
                    slate: &slate.slate,
                    images,
                }
            })
            .collect();

        let mut focal_lengths: Vec<FocalRow> = gallery
            .focal_lengths
            .iter()
            .map(|e| FocalRow {
                value: Some(e.value),
                label: format!("{}mm", e.value),
                count: e.count,
            })
            .collect();
        if gallery.unknown_focal_lengths > 0 {
            focal_lengths.push(FocalRow {
                value: None,
                label: "Unknown".to_string(),
                count: gallery.unknown_focal_lengths,
            });
        }

        let mut dates: Vec<DateRow> = gallery
            .dates
            .iter()
            .map(|e| DateRow {
                value: Some(e.value),
                display_date: e.display_date.clone(),
                count: e.count,
            })
            .collect();
        if gallery.unknown_dates > 0 {
            dates.push(DateRow {
                value: None,
                display_date: "Unknown".to_string(),
                count: gallery.unknown_dates,
            });
        }

        let document = GalleryDocument {
            generated_at: Utc::now().to_rfc3339(),
            lazy_loading,
            image_count,
            slates,
            focal_lengths,
            dates,
        };
        (document, skipped)
    }
}

impl GalleryRenderer for JsonGalleryWriter {
    fn render(&self, gallery: &GalleryBuild, lazy_loading: bool) -> RenderOutcome {
        if let Err(e) = fs::create_dir_all(&self.output_dir) {
            return RenderOutcome::failed(
                format!("cannot create output directory {:?}: {}", self.output_dir, e),
                0,
            );
        }

        let (document, skipped) = self.build_document(gallery, lazy_loading);
        let json = match to_json(&document, self.pretty) {
            Ok(json) => json,
            Err(e) => return RenderOutcome::failed(format!("serializing gallery: {e}"), skipped),
        };

        let target = self.output_path();
        let tmp = self.output_dir.join(format!("{GALLERY_FILE}.tmp"));
        if let Err(e) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &target)) {
            let _ = fs::remove_file(&tmp);
            return RenderOutcome::failed(format!("writing {:?}: {}", target, e), skipped);
        }

        tracing::info!(
            "Wrote gallery with {} images to {:?} ({} skipped)",
            document.image_count,
            target,
            skipped
        );
        RenderOutcome {
            success: true,
            skipped,
            output: Some(target),
            message: None,
        }
    }
}

/// `file://` URL for an absolute path, with forward slashes.
pub fn to_web_path(path: &Path) -> String {
    let lossy = path.to_string_lossy();
    let trimmed = lossy.strip_prefix(r"\\?\").unwrap_or(&lossy);
    let normalized = trimmed.replace('\\', "/");
    if normalized.starts_with('/') {
        format!("file://{normalized}")
    } else {
        format!("file:///{normalized}")
    }
}

/// Listing formats for `slate scan --format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object keyed by slate name
    Json,
    /// One `{"slate": ..., "images": [...]}` object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct SlateLine<'a> {
    slate: &'a str,
    images: &'a [crate::types::Image],
}

/// Write a slate map as JSON or JSON Lines.
pub fn write_slates<W: Write>(
    mut writer: W,
    slates: &SlateMap,
    format: OutputFormat,
    pretty: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = to_json(slates, pretty).map_err(io::Error::other)?;
            writeln!(writer, "{json}")?;
        }
        OutputFormat::JsonLines => {
            for (name, slate) in slates {
                let line = SlateLine {
                    slate: name,
                    images: &slate.images,
                };
                serde_json::to_writer(&mut writer, &line).map_err(io::Error::other)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()
}

/// Convenience function to serialize an item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateEntry, FocalLengthEntry, GallerySlate, Image, Orientation, Slate};

    fn gallery_image(path: &Path) -> GalleryImage {
        GalleryImage {
            original_path: path.to_path_buf(),
            filename: path.file_name().unwrap().to_string_lossy().into_owned(),
            display_path: path.to_path_buf(),
            thumbnails: Default::default(),
            focal_length: Some(35.0),
            orientation: Orientation::Landscape,
            date_taken: None,
        }
    }

    #[test]
    fn test_web_path() {
        assert_eq!(to_web_path(Path::new("/photos/a b.jpg")), "file:///photos/a b.jpg");
        assert_eq!(to_web_path(Path::new(r"C:\photos\a.jpg")), "file:///C:/photos/a.jpg");
    }

    #[test]
    fn test_render_skips_outside_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let inside = tmp.path().join("photos");
        let outside = tmp.path().join("elsewhere");
        fs::create_dir_all(&inside).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(inside.join("a.jpg"), b"x").unwrap();
        fs::write(outside.join("b.jpg"), b"x").unwrap();

        let gallery = GalleryBuild {
            slates: vec![GallerySlate {
                slate: "/".into(),
                images: vec![
                    gallery_image(&inside.join("a.jpg")),
                    gallery_image(&outside.join("b.jpg")),
                    gallery_image(&inside.join("../elsewhere/b.jpg")),
                ],
            }],
            focal_lengths: vec![FocalLengthEntry { value: 35.0, count: 3 }],
            unknown_focal_lengths: 0,
            dates: vec![DateEntry {
                value: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                count: 1,
                display_date: "02/01/24".into(),
            }],
            unknown_dates: 2,
            ..GalleryBuild::default()
        };

        let writer = JsonGalleryWriter::new(tmp.path().join("out"), &[inside.clone()], false);
        let outcome = writer.render(&gallery, true);
        assert!(outcome.success);
        assert_eq!(outcome.skipped, 2);

        let doc: serde_json::Value =
            serde_json::from_slice(&fs::read(outcome.output.unwrap()).unwrap()).unwrap();
        assert_eq!(doc["image_count"], 1);
        assert_eq!(doc["lazy_loading"], true);
        let image = &doc["slates"][0]["images"][0];
        assert_eq!(image["filename"], "a.jpg");
        assert!(image["web_path"].as_str().unwrap().starts_with("file://"));
        assert_eq!(doc["dates"][1]["display_date"], "Unknown");
        assert_eq!(doc["dates"][1]["count"], 2);
        assert_eq!(doc["focal_lengths"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_render_fails_when_output_unusable() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let writer = JsonGalleryWriter::new(blocker.join("out"), &[], false);
        let outcome = writer.render(&GalleryBuild::default(), false);
        assert!(!outcome.success);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn test_write_slates_jsonl() {
        let mut slates = SlateMap::new();
        slates.insert("a".into(), Slate::new("a", vec![Image::discovered("/p/1.jpg")]));
        slates.insert("b".into(), Slate::new("b", vec![]));

        let mut buffer = Vec::new();
        write_slates(&mut buffer, &slates, OutputFormat::JsonLines, false).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"slate\":\"a\""));
    }

    #[test]
    fn test_write_slates_json_object() {
        let mut slates = SlateMap::new();
        slates.insert("a".into(), Slate::new("a", vec![]));

        let mut buffer = Vec::new();
        write_slates(&mut buffer, &slates, OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert!(value["a"]["images"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }
}
