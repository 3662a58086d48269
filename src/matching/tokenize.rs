// src/matching/tokenize.rs - Field normalization shared by both datasets
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("static token pattern is valid"));

/// Normalizes a raw author or title value into comparable tokens.
///
/// Every run of characters that is not an ASCII letter or digit becomes a
/// single space, the result is lower-cased and split on whitespace. Both the
/// reference and candidate datasets go through this exact function so tokens
/// from either side compare equal.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    NON_ALNUM_RUN
        .replace_all(text, " ")
        .to_ascii_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
