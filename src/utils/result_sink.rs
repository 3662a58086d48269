// src/utils/result_sink.rs - Append-only CSV output and the shared match counter
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::models::matching::{MatchResultRow, OUTPUT_HEADER};

/// Destination for matched rows. Implementations must be safe to call from
/// several workers at once; one call is one batch.
pub trait ResultSink: Send + Sync {
    fn append(&self, rows: &[MatchResultRow]) -> Result<()>;
}

/// CSV file sink. Each batch is encoded in memory, then written and synced
/// to disk before `append` returns, so an interrupted run leaves a readable
/// partial file and a failed batch leaves nothing behind for the next one.
pub struct CsvResultSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvResultSink {
    /// Creates (or truncates) the output file and writes the header row.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        let mut header = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        header
            .write_record(OUTPUT_HEADER)
            .context("Failed to encode output header")?;
        write_durably(&mut file, &into_bytes(header)?).context("Failed to write output header")?;

        debug!("Created result file {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Encodes rows as CSV data lines, without a header.
fn encode_batch(rows: &[MatchResultRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to encode match row")?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV buffer: {}", e.error()))
}

fn write_durably(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

impl ResultSink for CsvResultSink {
    fn append(&self, rows: &[MatchResultRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let bytes = encode_batch(rows)?;
        // A worker that panicked mid-write cannot have left buffered rows
        // behind, so the file stays usable.
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        write_durably(&mut file, &bytes)
            .with_context(|| format!("Failed to write {} rows to {}", rows.len(), self.path.display()))
    }
}

/// Running total of matches emitted in the current run. Only ever grows.
#[derive(Debug, Default)]
pub struct RunCounter {
    value: AtomicUsize,
}

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` and returns the new total.
    pub fn add(&self, n: usize) -> usize {
        self.value.fetch_add(n, Ordering::AcqRel) + n
    }

    pub fn get(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }
}
