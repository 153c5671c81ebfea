//! Sub-query splitting
//!
//! A request may ask several things at once: "show price of A and quantity
//! of B". Inputs are split on coordinating words, list separators and
//! sentence ends; empty segments are dropped.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEPARATOR: Regex =
        Regex::new(r"(?i)\b(?:and|then|also)\b|[,;]|[.!?]+(?:\s+|$)").expect("valid separator regex");
}

/// Split raw input into trimmed, non-empty sub-queries
pub fn split_queries(input: &str) -> Vec<String> {
    SEPARATOR
        .split(input)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
