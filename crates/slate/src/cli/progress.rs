//! Progress bar fed by the coordinator's progress channel.

use indicatif::{ProgressBar, ProgressStyle};
use slate_core::pipeline::progress_channel;
use slate_core::{Config, ProgressUpdate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A running progress display.
pub struct ProgressDisplay {
    sender: mpsc::Sender<ProgressUpdate>,
    task: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Start a bar that advances once per finished slate.
    pub fn start(config: &Config, label: &'static str) -> Self {
        let (sender, mut receiver) = progress_channel(&config.pipeline);
        let task = tokio::spawn(async move {
            let bar = create_progress_bar(label);
            while let Some(update) = receiver.recv().await {
                bar.set_length(update.total as u64);
                bar.set_position(update.completed as u64);
                bar.set_message(update.slate);
            }
            bar.finish_and_clear();
        });
        Self { sender, task }
    }

    /// Sender to hand to the library.
    pub fn sender(&self) -> mpsc::Sender<ProgressUpdate> {
        self.sender.clone()
    }

    /// Close the channel and wait for the bar to clear.
    pub async fn finish(self) {
        drop(self.sender);
        let _ = self.task.await;
    }
}

fn create_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} slates {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb.set_message("starting...");
    pb
}
