//! Item/slot extraction
//!
//! Finds the part of a query that names a row and resolves it to a value of
//! the identifying column. Candidate spans are contiguous word windows of
//! the query. Three match kinds are tried:
//!
//! 1. exact: the span equals a known identifier, ignoring case (1.0).
//!    Identifier spans may start and end inside a word at a word-character
//!    boundary, so "PI-1234's" still yields "PI-1234".
//! 2. normalized: equal after dropping punctuation and whitespace (0.9)
//! 3. fuzzy: trigram similarity against descriptive text columns, kept if at
//!    or above the configured threshold (score = similarity). Only the
//!    descriptions sharing the most content words with the query are scored,
//!    against windows at most a little longer than each description.
//!
//! Candidates rank by confidence, then span length, then match kind. If the
//! top rank is shared by different identifiers the extraction is ambiguous
//! and nothing is resolved.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tabx_core::embedder::is_stopword;
use tabx_core::text::{normalize_identifier, tokenize, trigram_jaccard, trigram_set, trim_span, word_spans};
use tabx_core::Table;
use tabx_schema::{SchemaProfile, SemanticType};
use tracing::debug;

pub const EXACT_CONFIDENCE: f32 = 1.0;
pub const NORMALIZED_CONFIDENCE: f32 = 0.9;

/// Descriptions scored per query, ranked by shared content words
pub const MAX_FUZZY_CANDIDATES: usize = 64;

/// Words a fuzzy window may have beyond the description it is scored against
const WINDOW_SLACK: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Normalized,
    Fuzzy,
}

impl MatchKind {
    fn rank(&self) -> u8 {
        match self {
            MatchKind::Exact => 2,
            MatchKind::Normalized => 1,
            MatchKind::Fuzzy => 0,
        }
    }
}

/// A resolved item reference inside a query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotMatch {
    /// Matched text as it appears in the query
    pub raw_span: String,
    /// Byte offsets of `raw_span` in the query
    #[serde(skip)]
    pub start: usize,
    #[serde(skip)]
    pub end: usize,
    /// Value of the identifying column
    pub resolved_identifier: String,
    pub match_kind: MatchKind,
    pub confidence: f32,
}

impl SlotMatch {
    fn span_len(&self) -> usize {
        self.raw_span.chars().count()
    }

    /// Ranking order: higher confidence, longer span, stronger kind, earlier start
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .confidence
            .total_cmp(&self.confidence)
            .then_with(|| other.span_len().cmp(&self.span_len()))
            .then_with(|| other.match_kind.rank().cmp(&self.match_kind.rank()))
            .then_with(|| self.start.cmp(&other.start))
    }

    fn ties_with(&self, other: &Self) -> bool {
        self.confidence == other.confidence
            && self.span_len() == other.span_len()
            && self.match_kind == other.match_kind
    }
}

/// Outcome of extraction over one query
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(SlotMatch),
    /// Equally ranked candidates naming different items
    Ambiguous(Vec<SlotMatch>),
    NotFound,
}

impl Extraction {
    /// Span occupied by the item reference, if any candidate was found
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            Extraction::Found(slot) => Some((slot.start, slot.end)),
            Extraction::Ambiguous(slots) => slots.first().map(|s| (s.start, s.end)),
            Extraction::NotFound => None,
        }
    }
}

/// Distinct lowercased description text and the items carrying it
#[derive(Debug, Clone)]
struct Description {
    items: Vec<usize>,
    words: usize,
    trigrams: HashSet<String>,
}

/// Known items of a dataset, indexed for extraction
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    identifiers: Vec<String>,
    exact: AHashMap<String, Vec<usize>>,
    normalized: AHashMap<String, Vec<usize>>,
    descriptions: Vec<Description>,
    description_of: AHashMap<String, usize>,
    /// Content word to description positions
    word_index: AHashMap<String, Vec<usize>>,
    max_identifier_words: usize,
}

impl ItemCatalog {
    /// Index the identifying column and the descriptive text columns
    ///
    /// A dataset without an identifying column yields an empty catalog.
    pub fn build(table: &Table, schema: &SchemaProfile) -> Self {
        let mut catalog = Self::default();
        let key_idx = match schema
            .identifying_column()
            .and_then(|c| table.column_index(&c.name))
        {
            Some(idx) => idx,
            None => return catalog,
        };

        let text_columns: Vec<usize> = schema
            .columns()
            .iter()
            .filter(|c| c.semantic_type == SemanticType::Text && !c.is_identifying)
            .filter_map(|c| table.column_index(&c.name))
            .collect();

        let mut item_of: AHashMap<&str, usize> = AHashMap::new();
        for row in table.rows() {
            let key = row[key_idx].trim();
            if key.is_empty() {
                continue;
            }
            let item = match item_of.get(key) {
                Some(&item) => item,
                None => {
                    let item = catalog.add_identifier(key);
                    item_of.insert(key, item);
                    item
                }
            };

            for &col in &text_columns {
                let text = row[col].trim();
                if !text.is_empty() {
                    catalog.add_description(text, item);
                }
            }
        }

        debug!(
            "Item catalog: {} identifiers, {} descriptions",
            catalog.identifiers.len(),
            catalog.descriptions.len()
        );
        catalog
    }

    fn add_identifier(&mut self, value: &str) -> usize {
        let item = self.identifiers.len();
        self.identifiers.push(value.to_string());
        self.exact.entry(value.to_lowercase()).or_default().push(item);
        let normalized = normalize_identifier(value);
        if !normalized.is_empty() {
            self.normalized.entry(normalized).or_default().push(item);
        }
        self.max_identifier_words = self.max_identifier_words.max(value.split_whitespace().count());
        item
    }

    fn add_description(&mut self, text: &str, item: usize) {
        let text = text.to_lowercase();
        if let Some(&position) = self.description_of.get(&text) {
            let items = &mut self.descriptions[position].items;
            if !items.contains(&item) {
                items.push(item);
            }
            return;
        }

        let position = self.descriptions.len();
        let mut tokens: Vec<String> = tokenize(&text).into_iter().filter(|t| !is_stopword(t)).collect();
        tokens.sort();
        tokens.dedup();
        for token in tokens {
            self.word_index.entry(token).or_default().push(position);
        }
        self.descriptions.push(Description {
            items: vec![item],
            words: text.split_whitespace().count(),
            trigrams: trigram_set(&text),
        });
        self.description_of.insert(text, position);
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Extracts item references from query text against a catalog
pub struct SlotExtractor<'a> {
    catalog: &'a ItemCatalog,
    fuzzy_threshold: f32,
}

impl<'a> SlotExtractor<'a> {
    pub fn new(catalog: &'a ItemCatalog, fuzzy_threshold: f32) -> Self {
        Self {
            catalog,
            fuzzy_threshold,
        }
    }

    /// Resolve the single best item reference in `text`
    pub fn extract(&self, text: &str) -> Extraction {
        let candidates = self.candidates(text);
        let Some(best) = candidates.first() else {
            return Extraction::NotFound;
        };

        let tied: Vec<SlotMatch> = candidates
            .iter()
            .take_while(|c| c.ties_with(best))
            .cloned()
            .collect();

        if tied
            .iter()
            .any(|c| c.resolved_identifier != best.resolved_identifier)
        {
            debug!("Ambiguous item in '{}': {} tied candidates", text, tied.len());
            return Extraction::Ambiguous(tied);
        }
        Extraction::Found(best.clone())
    }

    /// All candidates above threshold, best first
    pub fn candidates(&self, text: &str) -> Vec<SlotMatch> {
        if self.catalog.is_empty() {
            return Vec::new();
        }

        let words = word_spans(text);
        let mut candidates = Vec::new();

        // Spaced-out codes ("PI 1234") span more words than the stored value
        let identifier_words = self.catalog.max_identifier_words + 2;
        let mut seen = AHashSet::new();
        for (start, end, _) in windows(text, &words, identifier_words) {
            for (start, end) in boundary_spans(text, start, end) {
                if seen.insert((start, end)) {
                    self.identifier_candidates(text, start, end, &mut candidates);
                }
            }
        }
        self.fuzzy_candidates(text, &words, &mut candidates);

        candidates.sort_by(|a, b| a.rank_cmp(b));
        candidates
    }

    fn identifier_candidates(&self, text: &str, start: usize, end: usize, out: &mut Vec<SlotMatch>) {
        let span = &text[start..end];

        if let Some(items) = self.catalog.exact.get(&span.to_lowercase()) {
            for &item in items {
                out.push(self.slot(span, start, end, item, MatchKind::Exact, EXACT_CONFIDENCE));
            }
            return;
        }

        let normalized = normalize_identifier(span);
        if let Some(items) = self.catalog.normalized.get(&normalized) {
            for &item in items {
                out.push(self.slot(span, start, end, item, MatchKind::Normalized, NORMALIZED_CONFIDENCE));
            }
        }
    }

    fn fuzzy_candidates(&self, text: &str, words: &[(usize, usize)], out: &mut Vec<SlotMatch>) {
        let mut query_tokens: Vec<String> = tokenize(text).into_iter().filter(|t| !is_stopword(t)).collect();
        query_tokens.sort();
        query_tokens.dedup();

        let mut shared: AHashMap<usize, usize> = AHashMap::new();
        for token in &query_tokens {
            if let Some(positions) = self.catalog.word_index.get(token) {
                for &position in positions {
                    *shared.entry(position).or_insert(0) += 1;
                }
            }
        }
        if shared.is_empty() {
            return;
        }

        let mut ranked: Vec<(usize, usize)> = shared.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(MAX_FUZZY_CANDIDATES);

        let longest = ranked
            .iter()
            .map(|&(position, _)| self.catalog.descriptions[position].words)
            .max()
            .unwrap_or(0);
        let spans: Vec<(usize, usize, usize, HashSet<String>)> = windows(text, words, longest + WINDOW_SLACK)
            .into_iter()
            .map(|(start, end, count)| (start, end, count, trigram_set(&text[start..end])))
            .collect();

        let mut best: AHashMap<(usize, usize, usize), f32> = AHashMap::new();
        for (position, _) in ranked {
            let description = &self.catalog.descriptions[position];
            let max_words = description.words + WINDOW_SLACK;
            let size = description.trigrams.len() as f32;

            for (start, end, count, trigrams) in &spans {
                if *count > max_words {
                    continue;
                }
                // Jaccard never exceeds the ratio of the set sizes
                let len = trigrams.len() as f32;
                if len.min(size) < self.fuzzy_threshold * len.max(size) {
                    continue;
                }
                let similarity = trigram_jaccard(trigrams, &description.trigrams);
                if similarity < self.fuzzy_threshold {
                    continue;
                }
                for &item in &description.items {
                    let entry = best.entry((*start, *end, item)).or_insert(similarity);
                    if similarity > *entry {
                        *entry = similarity;
                    }
                }
            }
        }

        let mut found: Vec<((usize, usize, usize), f32)> = best.into_iter().collect();
        found.sort_unstable_by_key(|(key, _)| *key);
        for ((start, end, item), similarity) in found {
            out.push(self.slot(&text[start..end], start, end, item, MatchKind::Fuzzy, similarity));
        }
    }

    fn slot(
        &self,
        span: &str,
        start: usize,
        end: usize,
        item: usize,
        match_kind: MatchKind,
        confidence: f32,
    ) -> SlotMatch {
        SlotMatch {
            raw_span: span.to_string(),
            start,
            end,
            resolved_identifier: self.catalog.identifiers[item].clone(),
            match_kind,
            confidence,
        }
    }
}

/// Contiguous windows of up to `max_words` words, edge punctuation trimmed,
/// with their word count
fn windows(text: &str, words: &[(usize, usize)], max_words: usize) -> Vec<(usize, usize, usize)> {
    let mut out = Vec::new();
    for first in 0..words.len() {
        for last in first..words.len().min(first + max_words) {
            let (start, end) = trim_span(text, words[first].0, words[last].1);
            if start < end {
                out.push((start, end, last - first + 1));
            }
        }
    }
    out
}

/// Sub-spans of `start..end` whose edges sit on the window edges or on a
/// word-character boundary
fn boundary_spans(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut starts = vec![start];
    let mut ends = vec![end];
    let mut prev: Option<char> = None;
    for (offset, c) in text[start..end].char_indices() {
        if let Some(p) = prev {
            let at = start + offset;
            if !p.is_alphanumeric() && c.is_alphanumeric() {
                starts.push(at);
            }
            if p.is_alphanumeric() && !c.is_alphanumeric() {
                ends.push(at);
            }
        }
        prev = Some(c);
    }

    let mut spans = Vec::new();
    for &s in &starts {
        for &e in &ends {
            if s < e {
                spans.push((s, e));
            }
        }
    }
    spans
}

/// Replace `span` with a space so the rest of the query can be embedded
pub fn mask_span(text: &str, span: Option<(usize, usize)>) -> String {
    match span {
        Some((start, end)) => format!("{} {}", &text[..start], &text[end..]),
        None => text.to_string(),
    }
}
