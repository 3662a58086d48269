// src/matching/policy.rs - Match mode decoding and the per-pair decision
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::matching::similarity::PairScores;

/// Which score(s) decide whether a pair qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// `A`: author score only.
    Author,
    /// `T`: title score only.
    Title,
    /// `TA`: the combined score. Not a conjunction of author and title,
    /// downstream consumers rely on this exact behaviour.
    TitleAndAuthor,
    /// `TTA`: title score or combined score.
    TitleOrCombined,
}

impl MatchMode {
    pub const ALL: [MatchMode; 4] = [
        MatchMode::Author,
        MatchMode::Title,
        MatchMode::TitleAndAuthor,
        MatchMode::TitleOrCombined,
    ];

    /// Short code used on the command line and in job configuration.
    pub fn code(&self) -> &'static str {
        match self {
            MatchMode::Author => "A",
            MatchMode::Title => "T",
            MatchMode::TitleAndAuthor => "TA",
            MatchMode::TitleOrCombined => "TTA",
        }
    }

    /// Strict comparison: a score equal to the threshold does not qualify.
    pub fn is_match(&self, scores: &PairScores, threshold: u8) -> bool {
        match self {
            MatchMode::Author => scores.author > threshold,
            MatchMode::Title => scores.title > threshold,
            MatchMode::TitleAndAuthor => scores.combined > threshold,
            MatchMode::TitleOrCombined => scores.title > threshold || scores.combined > threshold,
        }
    }
}

impl FromStr for MatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(MatchMode::Author),
            "T" => Ok(MatchMode::Title),
            "TA" => Ok(MatchMode::TitleAndAuthor),
            "TTA" => Ok(MatchMode::TitleOrCombined),
            _ => bail!("Unsupported matching condition: {}", s),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Free-function form of [`MatchMode::is_match`].
pub fn is_match(author: u8, title: u8, combined: u8, threshold: u8, mode: MatchMode) -> bool {
    mode.is_match(&PairScores { author, title, combined }, threshold)
}

/// Validates a user-supplied threshold.
pub fn parse_threshold(value: i64) -> Result<u8> {
    if !(0..=100).contains(&value) {
        bail!("Match threshold must be between 0 and 100, got {}", value);
    }
    Ok(value as u8)
}
