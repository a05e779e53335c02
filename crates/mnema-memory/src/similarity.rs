//! Lexical similarity scoring and stable key derivation.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Number of hex characters kept from the content digest.
const DERIVED_KEY_LEN: usize = 16;

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Cosine similarity of the term-frequency vectors of `query` and `text`.
///
/// Returns a value in `[0, 1]`; either side being empty scores zero.
pub fn similarity(query: &str, text: &str) -> f32 {
    let left = term_frequencies(query);
    let right = term_frequencies(text);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let dot: f64 = left
        .iter()
        .filter_map(|(term, count)| right.get(term).map(|other| count * other))
        .sum();
    let norm = |counts: &HashMap<String, f64>| counts.values().map(|v| v * v).sum::<f64>().sqrt();
    let score = dot / (norm(&left) * norm(&right));
    score.clamp(0.0, 1.0) as f32
}

/// Stable key for content stored without an explicit key.
///
/// Identical content (ignoring surrounding whitespace) always maps to the
/// same key, which makes repeated upserts idempotent.
pub fn derive_key(value: &str) -> String {
    let digest = Sha256::digest(value.trim().as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(DERIVED_KEY_LEN);
    key
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}
