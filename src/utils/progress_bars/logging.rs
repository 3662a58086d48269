// src/utils/progress_bars/logging.rs - Logging helpers for matching jobs
use log::{error, info, warn};
use std::time::Instant;

use crate::matching::policy::MatchMode;
use crate::models::stats_models::{JobSummary, ReferenceSide};

#[derive(Clone)]
pub struct MatchingLogger {
    mode_name: &'static str,
    mode_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(mode: MatchMode) -> Self {
        let (mode_name, mode_emoji) = match mode {
            MatchMode::Author => ("AUTHOR", "👤"),
            MatchMode::Title => ("TITLE", "📖"),
            MatchMode::TitleAndAuthor => ("COMBINED", "📚"),
            MatchMode::TitleOrCombined => ("TITLE|COMBINED", "🔀"),
        };
        Self {
            mode_name,
            mode_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, threshold: u8) {
        info!(
            "[{}] {} 🚀 Starting fuzzy matching (run ID: {}), score must exceed {}",
            self.mode_name, self.mode_emoji, run_id, threshold
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.mode_name, self.mode_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.mode_name, self.mode_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, source: &str) {
        info!(
            "[{}] {} 📊 Loaded {} records from {}",
            self.mode_name, self.mode_emoji, count, source
        );
    }

    pub fn log_orientation(&self, side: ReferenceSide, reference_rows: usize, candidate_rows: usize) {
        let which = match side {
            ReferenceSide::First => "GR data",
            ReferenceSide::Second => "library data",
        };
        info!(
            "[{}] {} 🧭 Iterating {} ({} rows) against {} candidate rows ({} comparisons)",
            self.mode_name,
            self.mode_emoji,
            which,
            reference_rows,
            candidate_rows,
            reference_rows.saturating_mul(candidate_rows)
        );
    }

    pub fn log_pool_start(&self, worker_count: usize, queue_capacity: usize) {
        info!(
            "[{}] {} ⚙️  Started {} workers (queue capacity {})",
            self.mode_name, self.mode_emoji, worker_count, queue_capacity
        );
    }

    pub fn log_progress_update(&self, current: usize, total: usize, matches: usize) {
        // Every 10% plus the last row, to keep large runs quiet
        let step = (total / 10).max(1);
        if current > 0 && (current % step == 0 || current == total) {
            let percent = (current as f64 / total as f64) * 100.0;
            info!(
                "[{}] {} 📊 Progress: {}/{} ({:.1}%) - {} matches so far",
                self.mode_name, self.mode_emoji, current, total, percent, matches
            );
        }
    }

    pub fn log_pool_stopped(&self, failed_tasks: usize) {
        if failed_tasks > 0 {
            warn!(
                "[{}] {} ⚠️  Workers stopped; {} tasks failed and were skipped",
                self.mode_name, self.mode_emoji, failed_tasks
            );
        } else {
            info!("[{}] {} 🛑 All workers stopped", self.mode_name, self.mode_emoji);
        }
    }

    pub fn log_completion(&self, summary: &JobSummary) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: {} matches from {} reference rows in {:.2?}",
            self.mode_name,
            self.mode_emoji,
            summary.total_matches(),
            summary.engine.tasks_enqueued,
            duration
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.mode_name, self.mode_emoji, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}] {} ❌ {}", self.mode_name, self.mode_emoji, message);
    }
}

pub fn log_job_summary(summary: &JobSummary, memory_mb: Option<u64>) {
    info!("📋 ===== FUZZY MATCHING SUMMARY =====");
    info!("📅 Run ID: {}", summary.run_id);
    info!("🎯 Mode: {} (threshold {})", summary.mode, summary.threshold);
    info!("📄 GR rows: {}, library rows: {}", summary.first_rows, summary.second_rows);
    info!("🧭 Iterated side: {:?}", summary.engine.reference_side);
    info!(
        "✅ Tasks: {} enqueued, {} failed",
        summary.engine.tasks_enqueued, summary.engine.tasks_failed
    );
    info!("🔗 Total matches: {}", summary.total_matches());
    info!("⏱️  Duration: {:.2?}", summary.elapsed);
    if let Some(mb) = memory_mb {
        info!("🔧 Process memory: {} MB", mb);
    }
    info!("=====================================");
}
