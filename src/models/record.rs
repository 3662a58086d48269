// src/models/record.rs
use std::collections::HashSet;

use crate::matching::tokenize::tokenize;

/// One bibliographic row from either input dataset.
///
/// Token sets are derived once, when the record is built, and never change
/// afterwards. Records are shared read-only between workers for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub author: String,
    pub title: String,
    pub author_tokens: HashSet<String>,
    pub title_tokens: HashSet<String>,
    /// Author and title tokens concatenated, then collapsed to a set.
    pub combined_tokens: HashSet<String>,
}

impl Record {
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        let author = author.into();
        let title = title.into();

        let author_seq = tokenize(&author);
        let title_seq = tokenize(&title);
        let combined_tokens: HashSet<String> =
            author_seq.iter().chain(title_seq.iter()).cloned().collect();

        Self {
            author_tokens: author_seq.into_iter().collect(),
            title_tokens: title_seq.into_iter().collect(),
            combined_tokens,
            author,
            title,
        }
    }

    /// True when neither field produced any token.
    pub fn is_blank(&self) -> bool {
        self.combined_tokens.is_empty()
    }
}
