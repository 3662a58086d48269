// src/utils/run_config.rs - Engine and job configuration
use std::env;
use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};

use crate::matching::policy::{parse_threshold, MatchMode};

pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_OUTPUT_FILE: &str = "results.csv";
pub const DEFAULT_LOG_FILE: &str = "fuzzy_task.log";

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of parallel workers draining the task queue
    pub worker_count: usize,
    /// Maximum tasks buffered before the producer waits
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Create engine configuration from environment variables.
    /// Missing, unparsable or zero values fall back to the defaults.
    pub fn from_env() -> Self {
        let config = Self {
            worker_count: positive_from_env("FUZZY_WORKER_COUNT", DEFAULT_WORKER_COUNT),
            queue_capacity: positive_from_env("FUZZY_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
        };
        debug!("Engine config from env: {:?}", config);
        config
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        if worker_count > 0 {
            self.worker_count = worker_count;
        }
        self
    }

    pub fn log_config(&self) {
        info!(
            "⚙️  Worker pool: {} workers, queue capacity {}",
            self.worker_count, self.queue_capacity
        );
    }
}

fn positive_from_env(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Everything one matching job needs. Mode and threshold are validated when
/// the config is built, so a bad value never reaches the engine.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// First ("GR") dataset
    pub reference_path: PathBuf,
    /// Second ("Lib") dataset
    pub candidate_path: PathBuf,
    pub threshold: u8,
    pub mode: MatchMode,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    /// Exists while the job runs, removed when it ends
    pub marker_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl JobConfig {
    /// Builds a job config with default output/log paths and engine settings
    /// from the environment.
    pub fn new(
        reference_path: impl Into<PathBuf>,
        candidate_path: impl Into<PathBuf>,
        threshold: i64,
        mode: &str,
    ) -> Result<Self> {
        Ok(Self {
            reference_path: reference_path.into(),
            candidate_path: candidate_path.into(),
            threshold: parse_threshold(threshold)?,
            mode: mode.parse()?,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            marker_path: None,
            engine: EngineConfig::from_env(),
        })
    }

    pub fn log_config(&self) {
        info!("📄 GR data: {}", self.reference_path.display());
        info!("📄 Library data: {}", self.candidate_path.display());
        info!("🎯 Mode {} with threshold {}", self.mode, self.threshold);
        info!("💾 Output: {}, log: {}", self.output_path.display(), self.log_path.display());
        if let Some(marker) = &self.marker_path {
            info!("🚩 In-progress marker: {}", marker.display());
        }
        self.engine.log_config();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_env_config() {
        env::set_var("FUZZY_WORKER_COUNT", "3");
        env::set_var("FUZZY_QUEUE_CAPACITY", "0");

        let config = EngineConfig::from_env();
        assert_eq!(config.worker_count, 3);
        // zero is rejected and falls back
        assert_eq!(config.queue_capacity, 100);

        env::set_var("FUZZY_WORKER_COUNT", "many");
        assert_eq!(EngineConfig::from_env().worker_count, 8);

        // Clean up
        env::remove_var("FUZZY_WORKER_COUNT");
        env::remove_var("FUZZY_QUEUE_CAPACITY");
    }

    #[test]
    fn test_with_workers_ignores_zero() {
        let config = EngineConfig::default().with_workers(0);
        assert_eq!(config.worker_count, 8);
        assert_eq!(EngineConfig::default().with_workers(2).worker_count, 2);
    }

    #[test]
    fn test_job_config_validation() {
        let config = JobConfig::new("gr.csv", "lib.csv", 70, "tta").unwrap();
        assert_eq!(config.mode, MatchMode::TitleOrCombined);
        assert_eq!(config.threshold, 70);
        assert_eq!(config.output_path, PathBuf::from("results.csv"));
        assert_eq!(config.log_path, PathBuf::from("fuzzy_task.log"));
        assert!(config.marker_path.is_none());

        assert!(JobConfig::new("gr.csv", "lib.csv", 70, "AUTHOR").is_err());
        assert!(JobConfig::new("gr.csv", "lib.csv", 170, "T").is_err());
    }
}
