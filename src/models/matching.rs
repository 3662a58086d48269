// src/models/matching.rs
use serde::Serialize;

/// Output header. The "GR" columns always describe the iterated (smaller)
/// side and the "Lib" columns the candidate side, whichever file they came from.
pub const OUTPUT_HEADER: [&str; 9] = [
    "GR ROW",
    "GR AUTHOR",
    "GR TITLE",
    "Lib ROW",
    "Lib AUTHOR",
    "Lib TITLE",
    "AUTHOR SCORE",
    "TITLE SCORE",
    "COMBINED SCORE",
];

/// One qualifying (reference, candidate) pair. Row numbers are 1-based
/// positions within this run's loaded lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchResultRow {
    #[serde(rename = "GR ROW")]
    pub reference_row: usize,
    #[serde(rename = "GR AUTHOR")]
    pub reference_author: String,
    #[serde(rename = "GR TITLE")]
    pub reference_title: String,
    #[serde(rename = "Lib ROW")]
    pub candidate_row: usize,
    #[serde(rename = "Lib AUTHOR")]
    pub candidate_author: String,
    #[serde(rename = "Lib TITLE")]
    pub candidate_title: String,
    #[serde(rename = "AUTHOR SCORE")]
    pub author_score: u8,
    #[serde(rename = "TITLE SCORE")]
    pub title_score: u8,
    #[serde(rename = "COMBINED SCORE")]
    pub combined_score: u8,
}
