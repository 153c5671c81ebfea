//! Text utilities shared by schema analysis, embedding and slot extraction
//!
//! All comparisons here are case-insensitive. Similarity scores are in
//! range [0.0, 1.0] where 1.0 means identical.

use std::collections::HashSet;

/// Characters stripped from the edges of a query window before matching
const EDGE_PUNCTUATION: &[char] = &[
    '?', '!', '.', ',', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '`',
];

/// Split text into lowercase alphanumeric tokens
///
/// Any non-alphanumeric character is a separator, so `PI-1234` yields
/// `["pi", "1234"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Byte ranges of the whitespace-separated words of `text`
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, idx));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

/// Shrink a byte range so it neither starts nor ends with edge punctuation
pub fn trim_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let trimmed_start = slice.trim_start_matches(EDGE_PUNCTUATION);
    let new_start = start + (slice.len() - trimmed_start.len());
    let trimmed = trimmed_start.trim_end_matches(EDGE_PUNCTUATION);
    (new_start, new_start + trimmed.len())
}

/// Lowercase and keep only alphanumeric characters
///
/// `"PI-1234"`, `"pi 1234"` and `"Pi1234"` all normalize to `"pi1234"`.
pub fn normalize_identifier(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase and collapse whitespace runs to a single space
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trigram similarity between two strings
///
/// Jaccard overlap of padded character trigrams. Used for fuzzy matching
/// of descriptive values.
pub fn trigram_similarity(a: &str, b: &str) -> f32 {
    trigram_jaccard(&trigram_set(a), &trigram_set(b))
}

/// Padded character trigrams of the lowercased string
pub fn trigram_set(s: &str) -> HashSet<String> {
    let padded = format!("  {}  ", s.to_lowercase());
    let chars: Vec<char> = padded.chars().collect();

    if chars.len() < 3 {
        return HashSet::new();
    }

    chars.windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Jaccard overlap of two precomputed trigram sets
pub fn trigram_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;

    intersection as f32 / union as f32
}
