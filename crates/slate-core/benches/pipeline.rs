//! Benchmarks for scanning, cache keys and thumbnail generation.
//!
//! Run with: cargo bench -p slate-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::RgbImage;
use slate_core::config::{ScanConfig, ThumbnailConfig};
use slate_core::pipeline::{BoundingBox, DirectoryScanner, Hasher, ThumbnailGenerator};
use std::path::PathBuf;

fn benchmark_roots_hash(c: &mut Criterion) {
    let roots: Vec<PathBuf> = (0..8)
        .map(|i| PathBuf::from(format!("/photos/archive/{i:04}")))
        .collect();

    c.bench_function("roots_hash_8", |b| {
        b.iter(|| Hasher::roots_hash(black_box(&roots)))
    });
}

fn benchmark_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    for d in 0..10 {
        let sub = dir.path().join(format!("day{d:02}"));
        std::fs::create_dir_all(&sub).expect("create dir");
        for f in 0..50 {
            std::fs::write(sub.join(format!("IMG_{f:04}.jpg")), b"x").expect("write file");
        }
    }
    let scanner = DirectoryScanner::new(ScanConfig::default());

    c.bench_function("scan_500_files", |b| {
        b.iter(|| scanner.scan(black_box(dir.path())))
    });
}

fn benchmark_thumbnail(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source.png");
    RgbImage::from_fn(1600, 1200, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&source)
        .expect("write source");
    let generator = ThumbnailGenerator::new(&ThumbnailConfig::default());
    let out_dir = dir.path().join("thumbs");

    c.bench_function("thumbnail_generate_600", |b| {
        b.iter(|| {
            // Remove the previous output so every iteration regenerates.
            let _ = std::fs::remove_dir_all(&out_dir);
            generator.generate_one(black_box(&source), &out_dir, BoundingBox::square(600), Some(1))
        })
    });

    c.bench_function("thumbnail_reuse_600", |b| {
        generator.generate_one(&source, &out_dir, BoundingBox::square(600), Some(1));
        b.iter(|| {
            generator.generate_one(black_box(&source), &out_dir, BoundingBox::square(600), Some(1))
        })
    });
}

criterion_group!(benches, benchmark_roots_hash, benchmark_scan, benchmark_thumbnail);
criterion_main!(benches);
