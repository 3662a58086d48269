// src/utils/run_log.rs - Timestamped, append-only job log polled by the front-end
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info, warn};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y@%H:%M:%S";

/// Human-readable log of one job. Cleared when a job starts, appended to
/// for the rest of the run. Every line is mirrored to the `log` facade.
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Truncates the log file and writes the job-start line.
    pub fn start(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create run log {}", path.display()))?;
        let run_log = Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        };
        run_log.log("Starting new job.");
        Ok(run_log)
    }

    /// Reopens an existing log for appending without clearing it.
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open run log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn log(&self, message: &str) {
        info!("{}", message);
        self.write_line(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
        self.write_line(message);
    }

    pub fn error(&self, message: &str) {
        error!("{}", message);
        self.write_line(message);
    }

    /// Advisory progress line; never affects control flow.
    pub fn record_progress(&self, reference_row_done: usize, total_reference_rows: usize, running_matches: usize) {
        self.log(&format!(
            "Processed row {}/{}. Total matches={}",
            reference_row_done, total_reference_rows, running_matches
        ));
    }

    fn write_line(&self, message: &str) {
        let line = format!("{}: {}\n", Local::now().format(TIMESTAMP_FORMAT), message);
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
                    warn!("Failed to write to run log {}: {}", self.path.display(), e);
                }
            }
            Err(_) => warn!("Run log lock poisoned; dropped line: {}", message),
        }
    }
}

/// Formats an elapsed duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn messages(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.splitn(2, ": ").nth(1).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_start_clears_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzy_task.log");
        fs::write(&path, "01/01/2020@00:00:00: old job\n").unwrap();

        let run_log = RunLog::start(&path).unwrap();
        run_log.log("Loaded 3 rows from a.csv");
        run_log.record_progress(2, 3, 7);

        assert_eq!(
            messages(&path),
            vec![
                "Starting new job.",
                "Loaded 3 rows from a.csv",
                "Processed row 2/3. Total matches=7",
            ]
        );
    }

    #[test]
    fn test_line_prefix_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let _run_log = RunLog::start(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let (stamp, rest) = content.trim_end().split_once(": ").unwrap();
        assert_eq!(rest, "Starting new job.");
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok(), "{stamp}");
    }

    #[test]
    fn test_append_to_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        RunLog::start(&path).unwrap().error("Error occurred: boom");
        RunLog::append_to(&path).unwrap().log("Done in 00:00:01");
        assert_eq!(
            messages(&path),
            vec!["Starting new job.", "Error occurred: boom", "Done in 00:00:01"]
        );
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(61_900)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 7)), "03:00:07");
    }
}
