//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::PipelineConfig;

/// One coarse progress step, emitted after each slate completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Slates finished so far
    pub completed: usize,
    /// Slates in this batch
    pub total: usize,
    /// Slate that just finished
    pub slate: String,
}

impl ProgressUpdate {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }
}

/// Create a bounded progress channel with the configured buffer size.
///
/// Updates are sent with `try_send`, so a slow consumer loses updates
/// instead of stalling the workers.
pub fn progress_channel(
    config: &PipelineConfig,
) -> (mpsc::Sender<ProgressUpdate>, mpsc::Receiver<ProgressUpdate>) {
    mpsc::channel(config.progress_buffer.max(1))
}

/// Shared request-to-stop flag, polled between slates.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
