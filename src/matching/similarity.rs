// src/matching/similarity.rs - Token-set Jaccard scoring
use std::collections::HashSet;
use std::hash::Hash;

use crate::models::record::Record;

/// Jaccard index of two token sets scaled to 0..=100.
///
/// Two empty sets score 0, not 100, so blank fields never look like perfect
/// matches. The ratio is truncated with integer division.
pub fn jaccard_sets<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> u8 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0;
    }
    // intersection <= union, so the quotient is at most 100
    ((intersection * 100) / union) as u8
}

/// Jaccard score of two token sequences; duplicates collapse first.
pub fn jaccard_score<S: AsRef<str>>(a: &[S], b: &[S]) -> u8 {
    let a: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let b: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();
    jaccard_sets(&a, &b)
}

/// The three scores computed for one (reference, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairScores {
    pub author: u8,
    pub title: u8,
    /// Score over each side's author and title tokens taken together.
    /// Not an average of the other two.
    pub combined: u8,
}

impl PairScores {
    pub fn between(reference: &Record, candidate: &Record) -> Self {
        Self {
            author: jaccard_sets(&reference.author_tokens, &candidate.author_tokens),
            title: jaccard_sets(&reference.title_tokens, &candidate.title_tokens),
            combined: jaccard_sets(&reference.combined_tokens, &candidate.combined_tokens),
        }
    }
}
