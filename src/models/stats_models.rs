// src/models/stats_models.rs
use std::time::Duration;

use crate::matching::policy::MatchMode;

/// Which physical input ended up on the iterated side of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSide {
    /// The first ("GR") dataset is the smaller one, or both are the same size.
    First,
    /// The second ("Lib") dataset is strictly smaller and was iterated instead.
    Second,
}

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub reference_side: ReferenceSide,
    pub reference_rows: usize,
    pub candidate_rows: usize,
    pub tasks_enqueued: usize,
    pub tasks_failed: usize,
    pub total_matches: usize,
}

/// Summary of one complete job, reported after the pool has shut down.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub run_id: String,
    pub mode: MatchMode,
    pub threshold: u8,
    pub first_rows: usize,
    pub second_rows: usize,
    pub engine: EngineStats,
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn total_matches(&self) -> usize {
        self.engine.total_matches
    }
}
