//! Bounded parallel processing of slates.
//!
//! Slates are handled one after another. Inside a slate every image becomes a
//! blocking task, and a semaphore caps how many run at once. A slate's results
//! are collected in full and re-sorted before its progress step is reported.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::config::Config;
use crate::error::PipelineError;
use crate::types::{sort_by_filename, Image, Slate, SlateMap};

use super::channel::{CancelFlag, ProgressUpdate};
use super::processor::{ImageProcessor, ProcessOptions, ProcessingResult};
use super::stats::StatAggregator;

/// What a batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully processed images, per slate, ordered by filename
    pub slates: SlateMap,
    /// Images that failed and were dropped
    pub failed: usize,
    /// Images whose tags were reused from a previous scan
    pub reused_tags: usize,
    /// Processing stopped early on request
    pub cancelled: bool,
}

/// Owns the worker pool and drives `ImageProcessor` across slates.
pub struct ProcessingCoordinator {
    processor: Arc<ImageProcessor>,
    workers: usize,
    resource_fork_prefix: String,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
}

impl ProcessingCoordinator {
    pub fn new(config: &Config) -> Self {
        Self {
            processor: Arc::new(ImageProcessor::new(config)),
            workers: config.processing.worker_count(),
            resource_fork_prefix: config.scan.resource_fork_prefix.clone(),
            progress: None,
        }
    }

    /// Report a `ProgressUpdate` after each finished slate.
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressUpdate>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every image of every slate.
    ///
    /// Failed images are logged and left out. Slates with no surviving image
    /// are left out too. `cancel` is checked before each slate; images already
    /// running are allowed to finish.
    pub async fn process_slates(
        &self,
        slates: SlateMap,
        options: &ProcessOptions,
        stats: &Arc<StatAggregator>,
        cancel: &CancelFlag,
    ) -> BatchOutcome {
        let total = slates.len();
        let options = Arc::new(options.clone());
        let mut outcome = BatchOutcome::default();

        tracing::info!(
            "Processing {} slates with {} workers",
            total,
            self.workers
        );

        for (index, (name, slate)) in slates.into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Processing cancelled after {} of {} slates", index, total);
                outcome.cancelled = true;
                break;
            }

            let batch = self.process_images(slate.images, &options, stats).await;
            outcome.failed += batch.failed;
            outcome.reused_tags += batch.reused_tags;
            if !batch.images.is_empty() {
                outcome
                    .slates
                    .insert(name.clone(), Slate::new(name.clone(), batch.images));
            }

            self.report(ProgressUpdate {
                completed: index + 1,
                total,
                slate: name,
            });
        }

        if outcome.reused_tags > 0 {
            tracing::info!("Reused cached metadata for {} images", outcome.reused_tags);
        }
        if outcome.failed > 0 {
            tracing::warn!("{} images failed and were skipped", outcome.failed);
        }
        outcome
    }

    /// Process one slate's images concurrently and return the survivors sorted.
    pub async fn process_images(
        &self,
        images: Vec<Image>,
        options: &Arc<ProcessOptions>,
        stats: &Arc<StatAggregator>,
    ) -> ImageBatch {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(images.len());

        for image in images {
            if self.is_resource_fork(&image) {
                tracing::debug!("Skipping resource fork file {:?}", image.path);
                continue;
            }
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let processor = Arc::clone(&self.processor);
            let options = Arc::clone(options);
            let stats = Arc::clone(stats);
            let path = image.path.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = processor.process(&image, &options);
                if let ProcessingResult::Success { image, .. } = &result {
                    stats.record(image.focal_length, image.captured_at.map(|dt| dt.date()));
                }
                result
            });
            handles.push((path, handle));
        }

        let mut batch = ImageBatch::default();
        for (path, handle) in handles {
            match handle.await {
                Ok(ProcessingResult::Success { image, reused_tags }) => {
                    if reused_tags {
                        batch.reused_tags += 1;
                    }
                    batch.images.push(image);
                }
                Ok(ProcessingResult::Failure { path, reason }) => {
                    tracing::error!("Skipping {:?}: {}", path, reason);
                    batch.failed += 1;
                }
                Err(e) => {
                    let reason = PipelineError::Worker {
                        path,
                        message: e.to_string(),
                    };
                    tracing::error!("{}", reason);
                    batch.failed += 1;
                }
            }
        }

        sort_by_filename(&mut batch.images);
        batch
    }

    fn is_resource_fork(&self, image: &Image) -> bool {
        !self.resource_fork_prefix.is_empty()
            && image.file_name().starts_with(&self.resource_fork_prefix)
    }

    fn report(&self, update: ProgressUpdate) {
        if let Some(sender) = &self.progress {
            if sender.try_send(update).is_err() {
                tracing::trace!("Progress receiver full or closed; update dropped");
            }
        }
    }
}

/// Survivors of one slate.
#[derive(Debug, Default)]
pub struct ImageBatch {
    pub images: Vec<Image>,
    pub failed: usize,
    pub reused_tags: usize,
}

/// Copy recorded mtimes and raw tags from a previous scan onto fresh images.
///
/// Matching is by path; `ImageProcessor` decides later whether the tags are
/// still current.
pub fn carry_forward(slates: &mut SlateMap, previous: &SlateMap) {
    let known: HashMap<&PathBuf, &Image> = previous
        .values()
        .flat_map(|slate| slate.images.iter())
        .map(|image| (&image.path, image))
        .collect();

    for image in slates.values_mut().flat_map(|slate| slate.images.iter_mut()) {
        if let Some(old) = known.get(&image.path) {
            image.mtime_ns = old.mtime_ns;
            image.exif = old.exif.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExifTags;
    use image::RgbImage;
    use std::path::Path;

    fn coordinator() -> ProcessingCoordinator {
        ProcessingCoordinator::new(&Config::default()).with_workers(3)
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbImage::new(w, h).save(path).unwrap();
    }

    fn slate_of(dir: &Path, name: &str, files: &[&str]) -> Slate {
        Slate::new(
            name,
            files.iter().map(|f| Image::discovered(dir.join(f))).collect(),
        )
    }

    #[tokio::test]
    async fn test_one_corrupt_image_of_five() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["e.png", "a.png", "d.png", "b.png"] {
            write_png(&dir.path().join(name), 16, 8);
        }
        std::fs::write(dir.path().join("c.png"), b"corrupt").unwrap();

        let mut slates = SlateMap::new();
        slates.insert(
            "/".into(),
            slate_of(dir.path(), "/", &["e.png", "a.png", "c.png", "d.png", "b.png"]),
        );

        let stats = Arc::new(StatAggregator::new());
        let outcome = coordinator()
            .process_slates(slates, &ProcessOptions::default(), &stats, &CancelFlag::new())
            .await;

        assert_eq!(outcome.failed, 1);
        assert!(!outcome.cancelled);
        let names: Vec<String> = outcome.slates["/"].images.iter().map(Image::file_name).collect();
        assert_eq!(names, vec!["a.png", "b.png", "d.png", "e.png"]);
        assert_eq!(stats.unknown_focal_lengths(), 4);
    }

    #[tokio::test]
    async fn test_progress_per_slate() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 4, 4);
        write_png(&dir.path().join("b.png"), 4, 4);

        let mut slates = SlateMap::new();
        slates.insert("one".into(), slate_of(dir.path(), "one", &["a.png"]));
        slates.insert("two".into(), slate_of(dir.path(), "two", &["b.png"]));

        let (tx, mut rx) = mpsc::channel(8);
        let outcome = coordinator()
            .with_progress(tx)
            .process_slates(
                slates,
                &ProcessOptions::default(),
                &Arc::new(StatAggregator::new()),
                &CancelFlag::new(),
            )
            .await;
        assert_eq!(outcome.slates.len(), 2);

        let first = rx.recv().await.unwrap();
        assert_eq!((first.completed, first.total, first.percent()), (1, 2, 50));
        assert_eq!(first.slate, "one");
        assert_eq!(rx.recv().await.unwrap().percent(), 100);
    }

    #[tokio::test]
    async fn test_cancel_before_start_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 4, 4);
        let mut slates = SlateMap::new();
        slates.insert("one".into(), slate_of(dir.path(), "one", &["a.png"]));

        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = coordinator()
            .process_slates(slates, &ProcessOptions::default(), &Arc::new(StatAggregator::new()), &cancel)
            .await;
        assert!(outcome.cancelled);
        assert!(outcome.slates.is_empty());
    }

    #[tokio::test]
    async fn test_resource_forks_and_empty_slates_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("._a.png"), 4, 4);
        let mut slates = SlateMap::new();
        slates.insert("forks".into(), slate_of(dir.path(), "forks", &["._a.png"]));

        let outcome = coordinator()
            .process_slates(
                slates,
                &ProcessOptions::default(),
                &Arc::new(StatAggregator::new()),
                &CancelFlag::new(),
            )
            .await;
        assert!(outcome.slates.is_empty());
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn test_carry_forward_copies_tags_by_path() {
        let mut old = Image::discovered("/p/a.jpg");
        old.mtime_ns = Some(42);
        old.exif = Some(ExifTags {
            focal_length: Some(50.0),
            ..ExifTags::default()
        });
        let mut previous = SlateMap::new();
        previous.insert("/".into(), Slate::new("/", vec![old]));

        let mut fresh = SlateMap::new();
        fresh.insert(
            "/".into(),
            Slate::new("/", vec![Image::discovered("/p/a.jpg"), Image::discovered("/p/new.jpg")]),
        );
        carry_forward(&mut fresh, &previous);

        let images = &fresh["/"].images;
        assert_eq!(images[0].mtime_ns, Some(42));
        assert!(images[1].exif.is_none());
    }
}
