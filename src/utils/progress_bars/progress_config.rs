// src/utils/progress_bars/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::env;

/// Configuration for terminal progress tracking
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to include process memory usage in the job summary
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("PROGRESS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            show_memory: env::var("PROGRESS_SHOW_MEMORY")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }

    /// Create a MultiProgress instance if progress is enabled, None otherwise
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        if self.enabled {
            Some(MultiProgress::new())
        } else {
            None
        }
    }

    pub fn should_show_memory(&self) -> bool {
        self.show_memory
    }
}

/// Adds a bar counting finished reference rows.
pub fn create_row_progress_bar(multi_progress: &MultiProgress, total_rows: usize) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(total_rows as u64));
    let style = ProgressStyle::default_bar()
        .template("  {spinner:.blue} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} rows {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb.set_message("Matching...");
    pb
}
