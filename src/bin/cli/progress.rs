//! Progress bar for CLI operations.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use zstarc::ProcessDataProc;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} {msg}";

/// Byte progress for one archive operation.
///
/// Shows a bar when the total is known and a spinner otherwise.
pub struct SimpleProgress {
    bar: ProgressBar,
}

impl SimpleProgress {
    /// Creates a new progress display
    pub fn new(total: Option<u64>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            match total {
                Some(len) => {
                    let pb = ProgressBar::new(len);
                    if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                        pb.set_style(style.progress_chars("#>-"));
                    }
                    pb
                }
                None => {
                    let pb = ProgressBar::new_spinner();
                    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
                        pb.set_style(style);
                    }
                    pb
                }
            }
        };

        Self { bar }
    }

    /// Sets the message
    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    /// Callback that advances the bar by each reported chunk.
    pub fn callback(&self) -> ProcessDataProc {
        let bar = self.bar.clone();
        Arc::new(move |_identifier: &str, bytes: usize| {
            bar.inc(bytes as u64);
            true
        })
    }

    /// Finishes the progress bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Leaves the bar on screen with a final message
    pub fn abandon(&self, msg: impl Into<String>) {
        self.bar.abandon_with_message(msg.into());
    }
}
