use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::translate::{JobEvent, ProgressSink};

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}";

/// Terminal progress bar driven by job events
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A bar that draws nothing, for non-interactive runs
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn on_event(&self, event: &JobEvent) {
        match event {
            JobEvent::ContextReady { chunks } => {
                self.bar.reset();
                self.bar.set_length(*chunks as u64);
                self.bar.set_message("");
            }
            JobEvent::ChunkStarted { position, total } => {
                self.bar.set_message(format!("translating chunk {}/{}", position + 1, total));
            }
            JobEvent::AttemptRejected { position, attempt } => {
                debug!("Chunk {} attempt {} rejected", position, attempt);
                self.bar.set_message(format!("retrying chunk {} (attempt {})", position + 1, attempt + 1));
            }
            JobEvent::ChunkFinished { translated, .. } => {
                if !translated {
                    self.bar.set_message("chunk kept original text");
                }
                self.bar.inc(1);
            }
            JobEvent::Finalized { cues } => {
                self.bar.finish_with_message(format!("{} cues", cues));
            }
            JobEvent::Failed { phase, .. } => {
                self.bar.abandon_with_message(format!("failed during {}", phase));
            }
        }
    }
}
