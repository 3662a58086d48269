// src/matching/manager.rs - Job lifecycle: run log, marker, loading, engine run and summary
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{debug, error, warn};
use uuid::Uuid;

use crate::matching::engine::MatchingEngine;
use crate::matching::loader::load_records;
use crate::models::record::Record;
use crate::models::stats_models::JobSummary;
use crate::utils::progress_bars::logging::MatchingLogger;
use crate::utils::progress_bars::progress_config::create_row_progress_bar;
use crate::utils::result_sink::{CsvResultSink, ResultSink};
use crate::utils::run_config::JobConfig;
use crate::utils::run_log::{format_elapsed, RunLog};

/// Empty file that exists for as long as a job is running. Removed on drop,
/// so every exit path (including errors) clears it.
struct InProgressMarker {
    path: PathBuf,
}

impl InProgressMarker {
    fn create(path: &Path) -> Result<Self> {
        File::create(path)
            .with_context(|| format!("Failed to create in-progress marker {}", path.display()))?;
        debug!("Created in-progress marker {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InProgressMarker {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove in-progress marker {}: {}", self.path.display(), e);
        }
    }
}

/// Runs one complete matching job and returns its summary.
///
/// The run log is truncated first, then the marker and the header-only output
/// file are created, then both inputs are loaded. An input that cannot be read
/// aborts the job before any worker starts. On failure the error and the
/// elapsed time are written to the run log before the marker is removed.
pub async fn run_job(config: &JobConfig, multi_progress: Option<&MultiProgress>) -> Result<JobSummary> {
    let start_time = Instant::now();
    let run_id = Uuid::new_v4().to_string();
    let logger = MatchingLogger::new(config.mode);
    logger.log_start(&run_id, config.threshold);

    let run_log = Arc::new(RunLog::start(&config.log_path)?);
    let marker = match &config.marker_path {
        Some(path) => match InProgressMarker::create(path) {
            Ok(marker) => Some(marker),
            Err(e) => return Err(log_failure(&run_log, e, start_time)),
        },
        None => None,
    };

    let result = execute_job(config, multi_progress, run_id, &logger, &run_log, start_time).await;
    let result = result.map_err(|e| log_failure(&run_log, e, start_time));
    // The marker goes last: once it is gone the run log is final.
    drop(marker);
    result
}

async fn execute_job(
    config: &JobConfig,
    multi_progress: Option<&MultiProgress>,
    run_id: String,
    logger: &MatchingLogger,
    run_log: &Arc<RunLog>,
    start_time: Instant,
) -> Result<JobSummary> {
    let csv_sink = CsvResultSink::create(&config.output_path)?;
    debug!("Writing matches to {}", csv_sink.path().display());
    let sink: Arc<dyn ResultSink> = Arc::new(csv_sink);

    logger.log_phase("Loading", None);
    let first = load_input(&config.reference_path, run_log, logger).await?;
    let second = load_input(&config.candidate_path, run_log, logger).await?;
    let (first_rows, second_rows) = (first.len(), second.len());
    if first_rows == 0 || second_rows == 0 {
        logger.log_warning("One of the inputs has no rows; nothing can match");
    }

    let progress = multi_progress.map(|mp| create_row_progress_bar(mp, first_rows.min(second_rows)));

    logger.log_phase("Matching", Some(&format!("mode {}", config.mode)));
    let engine = MatchingEngine::new(config.engine.clone(), sink, Arc::clone(run_log))
        .with_progress_bar(progress);
    let engine_stats = engine
        .run(first, second, config.threshold, config.mode)
        .await
        .context("Matching run failed")?;

    let elapsed = start_time.elapsed();
    run_log.log(&format!("Done in {}", format_elapsed(elapsed)));

    let summary = JobSummary {
        run_id,
        mode: config.mode,
        threshold: config.threshold,
        first_rows,
        second_rows,
        engine: engine_stats,
        elapsed,
    };
    logger.log_completion(&summary);
    Ok(summary)
}

fn log_failure(run_log: &RunLog, err: anyhow::Error, start_time: Instant) -> anyhow::Error {
    run_log.error(&format!("Error occurred: {:#}", err));
    run_log.log(&format!("Done in {}", format_elapsed(start_time.elapsed())));
    err
}

/// Start-job entry point for callers that only observe the output and log
/// files. Never returns an error: failures end up in the run log as
/// `Error occurred: ...` and yield `None`.
pub async fn start_job(config: &JobConfig, multi_progress: Option<&MultiProgress>) -> Option<JobSummary> {
    match run_job(config, multi_progress).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            error!("Job failed: {:#}", e);
            None
        }
    }
}

async fn load_input(path: &Path, run_log: &RunLog, logger: &MatchingLogger) -> Result<Vec<Record>> {
    let owned = path.to_path_buf();
    let records = tokio::task::spawn_blocking(move || load_records(&owned))
        .await
        .context("Loader task panicked")??;
    run_log.log(&format!("Loaded {} rows from {}", records.len(), path.display()));
    let blank = records.iter().filter(|r| r.is_blank()).count();
    if blank > 0 {
        run_log.warn(&format!(
            "{} rows in {} have neither author nor title; they cannot match",
            blank,
            path.display()
        ));
    }
    logger.log_data_loaded(records.len(), &path.display().to_string());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::policy::MatchMode;
    use crate::models::stats_models::ReferenceSide;
    use crate::utils::run_config::EngineConfig;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn job(dir: &TempDir, gr: PathBuf, lib: PathBuf, threshold: i64, mode: &str) -> JobConfig {
        let mut config = JobConfig::new(gr, lib, threshold, mode).unwrap();
        config.output_path = dir.path().join("results.csv");
        config.log_path = dir.path().join("fuzzy_task.log");
        config.marker_path = Some(dir.path().join("job.running"));
        config.engine = EngineConfig {
            worker_count: 4,
            queue_capacity: 3,
        };
        config
    }

    fn log_messages(config: &JobConfig) -> Vec<String> {
        fs::read_to_string(&config.log_path)
            .unwrap()
            .lines()
            .map(|l| l.split_once(": ").map(|(_, m)| m.to_string()).unwrap_or_default())
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_job_writes_results_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nJ. Doe,The Great Escape\n");
        let lib = write(
            &dir,
            "lib.csv",
            "TITLE,AUTHOR,SHELF\nBeowulf,Anonymous,A1\n\"Great Escape, The\",John Doe,B2\n",
        );
        let config = job(&dir, gr, lib, 50, "t");

        let summary = run_job(&config, None).await.unwrap();
        assert_eq!(summary.total_matches(), 1);
        assert_eq!((summary.first_rows, summary.second_rows), (1, 2));
        assert_eq!(summary.engine.reference_side, ReferenceSide::First);
        assert_eq!(summary.mode, MatchMode::Title);

        let output = fs::read_to_string(&config.output_path).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "GR ROW,GR AUTHOR,GR TITLE,Lib ROW,Lib AUTHOR,Lib TITLE,AUTHOR SCORE,TITLE SCORE,COMBINED SCORE",
                "1,J. Doe,The Great Escape,2,John Doe,\"Great Escape, The\",33,100,66",
            ]
        );

        let messages = log_messages(&config);
        assert_eq!(messages.first().map(String::as_str), Some("Starting new job."));
        assert!(messages.iter().any(|m| m.starts_with("Loaded 1 rows from ")));
        assert!(messages.iter().any(|m| m.starts_with("Loaded 2 rows from ")));
        assert!(messages.contains(&"Processed row 1/1. Total matches=1".to_string()));
        assert!(messages.contains(&"Stopped all worker threads.".to_string()));
        assert!(messages.last().unwrap().starts_with("Done in "));

        assert!(!config.marker_path.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_second_run_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nA,Dune\nB,Emma\n");
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nC,Dune\nD,Emma\nE,Dune Emma\n");

        let first = job(&dir, gr.clone(), lib.clone(), 0, "T");
        assert_eq!(run_job(&first, None).await.unwrap().total_matches(), 4);
        let second = job(&dir, gr, lib, 99, "T");
        let summary = run_job(&second, None).await.unwrap();

        assert_eq!(summary.total_matches(), 2);
        let mut reader = csv::Reader::from_path(&second.output_path).unwrap();
        assert_eq!(reader.records().count(), 2);
        let messages = log_messages(&second);
        assert_eq!(messages.iter().filter(|m| *m == "Starting new job.").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_input_aborts_before_matching() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nA,Dune\n");
        let config = job(&dir, gr, dir.path().join("missing.csv"), 50, "A");

        let err = run_job(&config, None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open input file"));

        // header-only output, no worker activity, marker cleared
        let output = fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(output.lines().count(), 1);
        let messages = log_messages(&config);
        assert!(!messages.iter().any(|m| m.starts_with("Initialized threads")));
        assert!(!config.marker_path.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_failure_is_logged_before_marker_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nA,Dune\n");
        let config = job(&dir, dir.path().join("gone.csv"), lib, 50, "T");
        let marker = config.marker_path.clone().unwrap();

        // Nothing writes to the log once run_job has returned, so this is the
        // state a poller sees right after the marker is removed.
        assert!(run_job(&config, None).await.is_err());
        assert!(!marker.exists());
        let messages = log_messages(&config);
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Error occurred: Failed to open input file")));
        assert!(messages.last().unwrap().starts_with("Done in "));
    }

    #[tokio::test]
    async fn test_start_job_does_not_log_error_twice() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nA,Dune\n");
        let config = job(&dir, gr, dir.path().join("missing.csv"), 50, "A");

        assert!(start_job(&config, None).await.is_none());
        let messages = log_messages(&config);
        assert_eq!(messages.iter().filter(|m| m.starts_with("Error occurred: ")).count(), 1);
        assert_eq!(messages.iter().filter(|m| m.starts_with("Done in ")).count(), 1);
    }

    #[tokio::test]
    async fn test_start_job_logs_error_and_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nA,Dune\n");
        let config = job(&dir, dir.path().join("nope.csv"), lib, 50, "TTA");

        assert!(start_job(&config, None).await.is_none());

        let messages = log_messages(&config);
        assert_eq!(messages[0], "Starting new job.");
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Error occurred: Failed to open input file")));
        assert!(messages.last().unwrap().starts_with("Done in "));
        assert!(!config.marker_path.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_start_job_success_returns_summary() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nFrank Herbert,Dune\n");
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nHerbert Frank,Dune\n");
        let config = job(&dir, gr, lib, 90, "TA");

        let summary = start_job(&config, None).await.unwrap();
        assert_eq!(summary.total_matches(), 1);
        assert_eq!(summary.engine.tasks_failed, 0);
    }

    #[tokio::test]
    async fn test_blank_rows_are_reported_in_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\nA,Dune\n,\n--,!!\n");
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nB,Dune\nC,Emma\nD,Persuasion\n");
        let config = job(&dir, gr.clone(), lib, 50, "T");

        let summary = run_job(&config, None).await.unwrap();
        assert_eq!(summary.total_matches(), 1);
        let expected = format!(
            "2 rows in {} have neither author nor title; they cannot match",
            gr.display()
        );
        let messages = log_messages(&config);
        assert!(messages.contains(&expected));
        assert_eq!(messages.iter().filter(|m| m.contains("neither author nor title")).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_yields_header_only_output() {
        let dir = tempfile::tempdir().unwrap();
        let gr = write(&dir, "gr.csv", "AUTHOR,TITLE\n");
        let lib = write(&dir, "lib.csv", "AUTHOR,TITLE\nA,Dune\n");
        let config = job(&dir, gr, lib, 0, "T");

        let summary = run_job(&config, None).await.unwrap();
        assert_eq!(summary.total_matches(), 0);
        assert_eq!(summary.engine.tasks_enqueued, 0);
        let output = fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_marker_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marker");
        {
            let _marker = InProgressMarker::create(&path).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
