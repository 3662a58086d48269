// src/matching/loader.rs - Reads AUTHOR/TITLE rows into token-annotated records
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::StringRecord;
use log::{debug, warn};

use crate::models::record::Record;

pub const AUTHOR_COLUMN: &str = "AUTHOR";
pub const TITLE_COLUMN: &str = "TITLE";

/// Positions of the two compared columns. A repeated header name resolves to
/// its last occurrence; every other column is ignored.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    author: Option<usize>,
    title: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let last_position = |name: &str| {
            let found = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| *h == name)
                .map(|(i, _)| i)
                .last();
            if found.is_none() {
                warn!("Input has no {} column; its values will be treated as empty", name);
            }
            found
        };
        Self {
            author: last_position(AUTHOR_COLUMN),
            title: last_position(TITLE_COLUMN),
        }
    }

    fn field(row: &StringRecord, idx: Option<usize>) -> &str {
        idx.and_then(|i| row.get(i)).unwrap_or("")
    }

    fn to_record(self, row: &StringRecord) -> Record {
        Record::new(Self::field(row, self.author), Self::field(row, self.title))
    }
}

/// Loads every row of a CSV file, preserving file order.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    load_records_from_reader(file)
        .with_context(|| format!("Failed to read records from {}", path.display()))
}

/// Loads records from any CSV source with a header row. Column names are
/// matched exactly; a missing column or short row yields empty fields.
pub fn load_records_from_reader<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header row")?.clone();
    let columns = ColumnIndex::from_headers(&headers);

    let mut records = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to parse data row {}", idx + 1))?;
        records.push(columns.to_record(&row));
    }
    debug!("Loaded {} records", records.len());
    Ok(records)
}
