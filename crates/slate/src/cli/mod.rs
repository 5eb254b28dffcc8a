//! Command implementations.

pub mod cache;
pub mod config;
pub mod generate;
pub mod progress;
pub mod scan;
pub mod theme;

use clap::Args;
use slate_core::CancelFlag;
use std::path::PathBuf;

/// Root directories shared by the scanning commands.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Photo directories to scan together
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,
}

/// Options deciding what happens with a stale cache.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct StaleArgs {
    /// Use a stale cache without asking
    #[arg(long, conflicts_with = "rescan")]
    pub accept_stale: bool,

    /// Ignore any cache and scan again
    #[arg(long)]
    pub rescan: bool,
}

/// A cancel flag that is set on Ctrl-C. It takes effect between slates.
pub fn cancel_on_ctrl_c() -> CancelFlag {
    let flag = CancelFlag::new();
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current slate...");
            handle.cancel();
        }
    });
    flag
}
