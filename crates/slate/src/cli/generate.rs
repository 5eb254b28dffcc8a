//! The `slate generate` command: thumbnails, histograms and `gallery.json`.

use clap::Args;
use slate_core::{Config, GalleryRenderer, GenerateOptions, SlateGallery};
use std::path::PathBuf;

use super::progress::ProgressDisplay;
use super::scan::obtain_slates;
use super::theme::{summary_line, warn_line};
use super::{cancel_on_ctrl_c, RootArgs, StaleArgs};

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    #[command(flatten)]
    pub stale: StaleArgs,

    /// Only include these slates (repeatable; default: all)
    #[arg(short, long = "slate")]
    pub slates: Vec<String>,

    /// Generate thumbnails
    #[arg(long, conflicts_with = "no_thumbnails")]
    pub thumbnails: bool,

    /// Link original files instead of thumbnails
    #[arg(long)]
    pub no_thumbnails: bool,

    /// Thumbnail bounding box in pixels
    #[arg(long)]
    pub size: Option<u32>,

    /// Gallery output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Disable lazy image loading in the rendered gallery
    #[arg(long)]
    pub eager: bool,
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(output) = &args.output {
        config.output.dir = output.clone();
    }
    if let Some(size) = args.size {
        anyhow::ensure!(size > 0, "--size must be greater than 0");
        config.thumbnail.size = size;
    }
    if args.thumbnails {
        config.thumbnail.enabled = true;
    } else if args.no_thumbnails {
        config.thumbnail.enabled = false;
    }
    if args.eager {
        config.output.lazy_loading = false;
    }

    let roots = &args.roots.roots;
    let gallery = SlateGallery::new(config);
    let cancel = cancel_on_ctrl_c();

    let report = obtain_slates(&gallery, roots, args.stale, &cancel).await?;
    if report.cancelled {
        warn_line("Cancelled before generation");
        return Ok(());
    }
    if report.slates.is_empty() {
        anyhow::bail!("No images found under the given directories");
    }

    let options = GenerateOptions::from_config(gallery.config());
    let progress = ProgressDisplay::start(gallery.config(), "Generating");
    let build = gallery
        .generate(&report.slates, &args.slates, &options, &cancel, Some(progress.sender()))
        .await;
    progress.finish().await;
    let build = build?;

    if build.cancelled {
        warn_line("Generation cancelled; gallery not written");
        return Ok(());
    }

    let outcome = gallery.json_writer(roots).render(&build, options.lazy_loading);
    if !outcome.success {
        anyhow::bail!(
            "Gallery generation failed: {}",
            outcome.message.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    eprintln!();
    summary_line("Slates", build.slates.len());
    summary_line("Images", build.image_count());
    summary_line("Focal lengths", build.focal_lengths.len());
    summary_line("Capture days", build.dates.len());
    if build.failed > 0 {
        summary_line("Failed", build.failed);
    }
    if outcome.skipped > 0 {
        summary_line("Skipped", outcome.skipped);
    }
    if let Some(path) = outcome.output {
        summary_line("Gallery", path.display());
        println!("{}", path.display());
    }
    Ok(())
}
