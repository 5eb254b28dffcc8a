//! Thumbnail generation with JPEG output.
//!
//! Thumbnails are named after the source path and the requested box, so a
//! repeated request resolves to the same file and is served from disk.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::hash::Hasher;
use super::metadata::MetadataExtractor;
use crate::config::ThumbnailConfig;
use crate::error::{PipelineError, PipelineResult};

/// Maximum width and height a thumbnail may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square box with the given side.
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Key used in `Image::thumbnails` and in filenames, e.g. `"600x600"`.
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Generates resized JPEG display copies on disk.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    quality: u8,
}

impl ThumbnailGenerator {
    /// Create a new thumbnail generator with the given configuration.
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            quality: config.quality.clamp(1, 100),
        }
    }

    /// Deterministic output path for `(source, bbox)`.
    pub fn output_path(source: &Path, out_dir: &Path, bbox: BoundingBox) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let hash = Hasher::path_hash(source);
        out_dir.join(format!("{}_{}_{}.jpg", stem, hash, bbox.label()))
    }

    /// Generate one thumbnail per box.
    ///
    /// The source is decoded at most once no matter how many boxes are
    /// requested. Boxes that fail are missing from the result; a source that
    /// cannot be decoded yields an empty map.
    pub fn generate(
        &self,
        source: &Path,
        out_dir: &Path,
        boxes: &[BoundingBox],
        orientation: Option<u32>,
    ) -> BTreeMap<String, PathBuf> {
        let mut generated = BTreeMap::new();
        let mut pending = Vec::new();

        for &bbox in boxes {
            let target = Self::output_path(source, out_dir, bbox);
            if Self::is_reusable(&target) {
                tracing::debug!("Reusing thumbnail {:?}", target);
                generated.insert(bbox.label(), target);
            } else {
                pending.push((bbox, target));
            }
        }
        if pending.is_empty() {
            return generated;
        }

        if let Err(e) = fs::create_dir_all(out_dir) {
            tracing::error!("Cannot create thumbnail directory {:?}: {}", out_dir, e);
            return generated;
        }

        let prepared = match self.prepare(source, orientation) {
            Ok(img) => img,
            Err(e) => {
                tracing::error!("{}", e);
                return generated;
            }
        };

        for (bbox, target) in pending {
            match self.write_thumbnail(&prepared, source, &target, bbox) {
                Ok(()) => {
                    generated.insert(bbox.label(), target);
                }
                Err(e) => tracing::error!("{}", e),
            }
        }
        generated
    }

    /// Generate a single thumbnail, returning its path on success.
    pub fn generate_one(
        &self,
        source: &Path,
        out_dir: &Path,
        bbox: BoundingBox,
        orientation: Option<u32>,
    ) -> Option<PathBuf> {
        self.generate(source, out_dir, &[bbox], orientation)
            .remove(&bbox.label())
    }

    /// An existing output is reused only if it still decodes.
    fn is_reusable(target: &Path) -> bool {
        if !target.exists() {
            return false;
        }
        match image::open(target) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Corrupt thumbnail {:?}, regenerating: {}", target, e);
                false
            }
        }
    }

    /// Decode, normalize to RGB and rotate upright.
    fn prepare(&self, source: &Path, orientation: Option<u32>) -> PipelineResult<RgbImage> {
        let decode_err = |message: String| PipelineError::Decode {
            path: source.to_path_buf(),
            message,
        };
        let img = ImageReader::open(source)
            .map_err(|e| decode_err(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| decode_err(e.to_string()))?
            .decode()
            .map_err(|e| decode_err(e.to_string()))?;

        let rgb = flatten_to_rgb(img);
        let orientation = orientation.or_else(|| {
            MetadataExtractor::extract_tags(source).and_then(|tags| tags.orientation)
        });
        Ok(apply_orientation(rgb, orientation))
    }

    fn write_thumbnail(
        &self,
        img: &RgbImage,
        source: &Path,
        target: &Path,
        bbox: BoundingBox,
    ) -> PipelineResult<()> {
        let thumb_err = |message: String| PipelineError::Thumbnail {
            path: source.to_path_buf(),
            message,
        };

        let resized = fit_within(img, bbox);
        let tmp = temp_sibling(target);
        let result = (|| -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let encoder = JpegEncoder::new_with_quality(&mut writer, self.quality);
            DynamicImage::ImageRgb8(resized)
                .write_with_encoder(encoder)
                .map_err(std::io::Error::other)?;
            writer.flush()?;
            drop(writer);
            fs::rename(&tmp, target)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(thumb_err(format!("writing {:?}: {}", target, e)));
        }
        tracing::debug!("Generated thumbnail {:?}", target);
        Ok(())
    }
}

/// Convert any color model to 8-bit RGB, compositing alpha onto white.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Rotate according to an EXIF orientation code. Mirrored codes are left as is.
fn apply_orientation(img: RgbImage, orientation: Option<u32>) -> RgbImage {
    match orientation {
        Some(3) => image::imageops::rotate180(&img),
        Some(6) => image::imageops::rotate90(&img),
        Some(8) => image::imageops::rotate270(&img),
        _ => img,
    }
}

/// Shrink to fit the box, preserving aspect ratio. Never upscales.
fn fit_within(img: &RgbImage, bbox: BoundingBox) -> RgbImage {
    let (w, h) = img.dimensions();
    if w <= bbox.width && h <= bbox.height {
        return img.clone();
    }
    let scale = f64::min(
        bbox.width as f64 / w as f64,
        bbox.height as f64 / h as f64,
    );
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(img, new_w, new_h, FilterType::Lanczos3)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::tests::jpeg_with_orientation;
    use image::{Rgba, RgbaImage};

    fn generator() -> ThumbnailGenerator {
        ThumbnailGenerator::new(&ThumbnailConfig::default())
    }

    fn write_rgb(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([10, 200, 90])).save(path).unwrap();
    }

    #[test]
    fn test_output_path_is_deterministic() {
        let src = Path::new("/photos/trip/IMG_0042.jpg");
        let out = Path::new("/thumbs");
        let a = ThumbnailGenerator::output_path(src, out, BoundingBox::square(600));
        let b = ThumbnailGenerator::output_path(src, out, BoundingBox::square(600));
        assert_eq!(a, b);

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("IMG_0042_"));
        assert!(name.ends_with("_600x600.jpg"));
        assert_eq!(name.len(), "IMG_0042_".len() + 8 + "_600x600.jpg".len());

        let other = ThumbnailGenerator::output_path(src, out, BoundingBox::new(800, 400));
        assert_ne!(a, other);
    }

    #[test]
    fn test_fits_box_and_keeps_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wide.png");
        write_rgb(&src, 400, 200);

        let out = generator()
            .generate_one(&src, &dir.path().join("t"), BoundingBox::square(100), None)
            .unwrap();
        let (w, h) = image::image_dimensions(&out).unwrap();
        assert_eq!((w, h), (100, 50));
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("small.png");
        write_rgb(&src, 40, 30);

        let out = generator()
            .generate_one(&src, dir.path(), BoundingBox::square(600), None)
            .unwrap();
        assert_eq!(image::image_dimensions(&out).unwrap(), (40, 30));
    }

    #[test]
    fn test_second_request_reuses_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_rgb(&src, 300, 300);
        let gen = generator();

        let first = gen.generate_one(&src, dir.path(), BoundingBox::square(64), None).unwrap();
        let mtime = fs::metadata(&first).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let second = gen.generate_one(&src, dir.path(), BoundingBox::square(64), None).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::metadata(&second).unwrap().modified().unwrap(), mtime);
    }

    #[test]
    fn test_corrupt_thumbnail_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_rgb(&src, 300, 300);
        let gen = generator();

        let path = gen.generate_one(&src, dir.path(), BoundingBox::square(64), None).unwrap();
        fs::write(&path, b"garbage").unwrap();

        let again = gen.generate_one(&src, dir.path(), BoundingBox::square(64), None).unwrap();
        assert_eq!(again, path);
        assert!(image::open(&again).is_ok());
    }

    #[test]
    fn test_alpha_is_flattened_onto_white() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("clear.png");
        RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0])).save(&src).unwrap();

        let out = generator()
            .generate_one(&src, dir.path(), BoundingBox::square(20), None)
            .unwrap();
        let thumb = image::open(&out).unwrap().to_rgb8();
        let px = thumb.get_pixel(10, 10);
        assert!(px.0.iter().all(|&c| c > 240), "expected white, got {:?}", px);
    }

    #[test]
    fn test_grayscale_alpha_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("gray.png");
        image::GrayAlphaImage::from_pixel(10, 10, image::LumaA([50, 255])).save(&src).unwrap();

        let out = generator()
            .generate_one(&src, dir.path(), BoundingBox::square(10), None)
            .unwrap();
        assert_eq!(image::open(&out).unwrap().color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_rotation_applied_before_scaling() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("rotated.jpg");
        fs::write(&src, jpeg_with_orientation(80, 40, 6)).unwrap();

        let out = generator()
            .generate_one(&src, dir.path(), BoundingBox::square(40), None)
            .unwrap();
        assert_eq!(image::image_dimensions(&out).unwrap(), (20, 40));
    }

    #[test]
    fn test_multiple_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_rgb(&src, 500, 250);

        let boxes = [BoundingBox::square(100), BoundingBox::new(50, 50)];
        let thumbs = generator().generate(&src, dir.path(), &boxes, None);
        assert_eq!(thumbs.len(), 2);
        assert_eq!(image::image_dimensions(&thumbs["50x50"]).unwrap(), (50, 25));
    }

    #[test]
    fn test_unreadable_source_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.jpg");
        fs::write(&src, b"nope").unwrap();

        let thumbs = generator().generate(&src, dir.path(), &[BoundingBox::square(50)], None);
        assert!(thumbs.is_empty());
    }
}
