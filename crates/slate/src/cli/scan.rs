//! The `slate scan` command: build or refresh the cache for a set of roots.

use clap::{Args, ValueEnum};
use dialoguer::Confirm;
use slate_core::output::write_slates;
use slate_core::{CacheStatus, CancelFlag, Config, OutputFormat, SlateGallery};
use std::io::IsTerminal;
use std::path::PathBuf;

use super::progress::ProgressDisplay;
use super::theme::{slate_theme, summary_line, warn_line};
use super::{cancel_on_ctrl_c, RootArgs, StaleArgs};

/// Listing format for the scan result on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Json,
    Jsonl,
}

impl From<ListFormat> for OutputFormat {
    fn from(format: ListFormat) -> Self {
        match format {
            ListFormat::Json => OutputFormat::Json,
            ListFormat::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    #[command(flatten)]
    pub stale: StaleArgs,

    /// Print the slates to stdout in this format
    #[arg(short, long, value_enum)]
    pub format: Option<ListFormat>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Number of parallel workers (default: 2 x cores, capped)
    #[arg(short, long)]
    pub parallel: Option<usize>,
}

/// Execute the scan command.
pub async fn execute(args: ScanArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(workers) = args.parallel {
        config.processing.parallel_workers = Some(workers.max(1));
    }
    let gallery = SlateGallery::new(config);
    let cancel = cancel_on_ctrl_c();
    let report = obtain_slates(&gallery, &args.roots.roots, args.stale, &cancel).await?;

    eprintln!();
    summary_line("Slates", report.slates.len());
    summary_line("Images", report.image_count());
    summary_line("Source", format!("{:?}", report.source).to_lowercase());
    if report.reused_tags > 0 {
        summary_line("Reused", report.reused_tags);
    }
    if report.failed > 0 {
        summary_line("Failed", report.failed);
    }
    for root in &report.missing_roots {
        warn_line(&format!("Directory not found: {}", root.display()));
    }
    if report.cancelled {
        warn_line("Scan cancelled; cache not updated");
    }
    if let Some(path) = &report.cache_path {
        summary_line("Cache", path.display());
    }

    if let Some(format) = args.format {
        let stdout = std::io::stdout().lock();
        write_slates(stdout, &report.slates, format.into(), args.pretty)?;
    }
    Ok(())
}

/// Load slates from the cache or by scanning, asking about a stale cache.
pub(crate) async fn obtain_slates(
    gallery: &SlateGallery,
    roots: &[PathBuf],
    stale: StaleArgs,
    cancel: &CancelFlag,
) -> anyhow::Result<slate_core::ScanReport> {
    let status = gallery.cache_status(roots);
    tracing::debug!("Cache status: {:?}", status);

    let accept_stale = match (&status, stale.rescan) {
        (_, true) => None,
        (CacheStatus::Valid, false) => Some(false),
        (CacheStatus::Missing, false) => Some(false),
        (CacheStatus::Stale(reason), false) => {
            if stale.accept_stale {
                Some(true)
            } else {
                Some(confirm_stale(&reason.to_string())?)
            }
        }
    };

    let progress = ProgressDisplay::start(gallery.config(), "Scanning");
    let report = match accept_stale {
        Some(accept) => {
            gallery
                .load_or_scan(roots, accept, cancel, Some(progress.sender()))
                .await
        }
        None => gallery.scan(roots, cancel, Some(progress.sender())).await,
    };
    progress.finish().await;
    Ok(report?)
}

/// Ask whether to use a stale cache. Non-interactive sessions rescan.
fn confirm_stale(reason: &str) -> anyhow::Result<bool> {
    if !std::io::stderr().is_terminal() {
        tracing::info!("Cache is stale ({}); rescanning", reason);
        return Ok(false);
    }
    let answer = Confirm::with_theme(&slate_theme())
        .with_prompt(format!("Cached scan is out of date ({reason}). Use it anyway?"))
        .default(false)
        .interact()?;
    Ok(answer)
}
