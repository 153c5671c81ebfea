//! Query matcher
//!
//! Runs each user input through the pipeline
//!
//! ```text
//! SPLIT -> EXTRACT -> EMBED -> RETRIEVE -> THRESHOLD -> RESOLVE -> ASSEMBLE
//! ```
//!
//! Item extraction runs before embedding so the item span can be masked out
//! of the sub-query, the same way templates are embedded without their
//! `{ITEM}` slot. Extraction, embedding and retrieval of a request form one
//! unit of work, and that unit is what the time budget bounds. Every
//! sub-query is independent: a miss in one never affects another, and
//! per-query failures become `hit = false` results.

use crate::config::MatcherConfig;
use crate::extractor::{mask_span, Extraction, SlotExtractor, SlotMatch};
use crate::misses::MissLog;
use crate::result::{MatchResponse, MissReason, QueryResult};
use crate::snapshot::{Snapshot, SnapshotHandle};
use crate::split::split_queries;
use serde_json::{Map, Value};
use std::sync::Arc;
use tabx_core::text::normalize_query;
use tabx_storage::ResultCache;
use tabx_templates::{AccessKind, Template};
use tracing::{debug, warn};

struct Pending {
    position: usize,
    text: String,
    cache_key: String,
}

/// Extracted item and best template position and score of one sub-query
struct Analysis {
    extraction: Extraction,
    best: Option<(usize, f32)>,
}

pub struct QueryMatcher {
    snapshots: Arc<SnapshotHandle>,
    config: MatcherConfig,
    cache: Option<Arc<dyn ResultCache<QueryResult>>>,
    misses: MissLog,
}

impl QueryMatcher {
    pub fn new(snapshots: Arc<SnapshotHandle>, config: MatcherConfig) -> Self {
        let misses = MissLog::new(config.miss_log_capacity);
        Self {
            snapshots,
            config,
            cache: None,
            misses,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache<QueryResult>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn snapshots(&self) -> &Arc<SnapshotHandle> {
        &self.snapshots
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn misses(&self) -> &MissLog {
        &self.misses
    }

    /// Match an input on the calling thread
    pub fn match_input(&self, input: &str) -> MatchResponse {
        let snapshot = self.snapshots.load();
        let (mut results, pending) = self.prepare(&snapshot, input);
        let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
        let analyses = analyze(&snapshot, self.config.fuzzy_threshold, &texts);
        self.finish(&snapshot, &mut results, pending, Some(analyses));
        assemble(results)
    }

    /// Match an input with extraction, embedding and retrieval bounded by
    /// the time budget
    ///
    /// The work runs on the blocking pool. If it does not finish in time
    /// every uncached sub-query becomes an `upstream_timeout` miss.
    pub async fn match_input_bounded(&self, input: &str) -> MatchResponse {
        let snapshot = self.snapshots.load();
        let (mut results, pending) = self.prepare(&snapshot, input);

        let analyses = if pending.is_empty() {
            Some(Vec::new())
        } else {
            let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
            let task_snapshot = Arc::clone(&snapshot);
            let fuzzy_threshold = self.config.fuzzy_threshold;
            let task = tokio::task::spawn_blocking(move || analyze(&task_snapshot, fuzzy_threshold, &texts));

            match tokio::time::timeout(self.config.time_budget, task).await {
                Ok(Ok(analyses)) => Some(analyses),
                Ok(Err(e)) => {
                    warn!("Matching task failed: {}", e);
                    None
                }
                Err(_) => {
                    warn!(
                        "Matching {} sub-queries exceeded {:?}",
                        pending.len(),
                        self.config.time_budget
                    );
                    None
                }
            }
        };

        self.finish(&snapshot, &mut results, pending, analyses);
        assemble(results)
    }

    /// SPLIT and consult the cache
    fn prepare(&self, snapshot: &Snapshot, input: &str) -> (Vec<Option<QueryResult>>, Vec<Pending>) {
        let parts = split_queries(input);

        let mut results = Vec::with_capacity(parts.len());
        let mut pending = Vec::new();

        for (position, text) in parts.into_iter().enumerate() {
            let cache_key = format!("{}:{}", snapshot.generation(), normalize_query(&text));

            if let Some(mut cached) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
                debug!("Cache hit for '{}'", text);
                cached.query = text;
                results.push(Some(cached));
                continue;
            }

            results.push(None);
            pending.push(Pending {
                position,
                text,
                cache_key,
            });
        }

        (results, pending)
    }

    /// THRESHOLD and RESOLVE each pending sub-query, then cache and log
    fn finish(
        &self,
        snapshot: &Snapshot,
        results: &mut [Option<QueryResult>],
        pending: Vec<Pending>,
        analyses: Option<Vec<Analysis>>,
    ) {
        let timed_out = analyses.is_none();
        let mut analyses = analyses.unwrap_or_default().into_iter();

        for item in pending {
            let analysis = analyses.next();
            let best_score = analysis.as_ref().and_then(|a| a.best).map(|(_, score)| score);

            let result = match analysis {
                None if timed_out => QueryResult::no_match(item.text.clone(), MissReason::UpstreamTimeout),
                Some(Analysis {
                    extraction,
                    best: Some((position, score)),
                }) if score >= self.config.min_score => {
                    let template = &snapshot.templates()[position];
                    resolve(snapshot, &item.text, template, score, extraction)
                }
                _ => QueryResult::no_match(item.text.clone(), MissReason::NoTemplateMatch),
            };

            match result.miss_reason() {
                Some(reason) => {
                    debug!(
                        "Miss for '{}': {} (best score {:?})",
                        item.text,
                        reason.as_str(),
                        best_score
                    );
                    self.misses.record(&item.text, reason, best_score);
                }
                None => debug!(
                    "Hit for '{}': {:?} ({:?})",
                    item.text,
                    result.template().map(|t| t.id.as_str()),
                    result.score()
                ),
            }

            if let Some(cache) = &self.cache {
                if !timed_out {
                    cache.set(&item.cache_key, result.clone(), self.config.cache_ttl);
                }
            }

            results[item.position] = Some(result);
        }
    }
}

/// EXTRACT and mask each sub-query, EMBED them as one batch and RETRIEVE
/// the best template for each
fn analyze(snapshot: &Snapshot, fuzzy_threshold: f32, texts: &[String]) -> Vec<Analysis> {
    if texts.is_empty() {
        return Vec::new();
    }

    let extractor = SlotExtractor::new(snapshot.catalog(), fuzzy_threshold);
    let extractions: Vec<Extraction> = texts.iter().map(|text| extractor.extract(text)).collect();
    let masked: Vec<String> = texts
        .iter()
        .zip(&extractions)
        .map(|(text, extraction)| mask_span(text, extraction.span()))
        .collect();

    snapshot
        .embedder()
        .embed_batch(&masked)
        .iter()
        .zip(extractions)
        .map(|(vector, extraction)| Analysis {
            extraction,
            best: snapshot.index().search(vector, 1).into_iter().next(),
        })
        .collect()
}

/// Check the item requirement and read the row store
fn resolve(
    snapshot: &Snapshot,
    text: &str,
    template: &Template,
    score: f32,
    extraction: Extraction,
) -> QueryResult {
    let slot = if template.requires_item() {
        match extraction {
            Extraction::Found(slot) => Some(slot),
            Extraction::Ambiguous(_) => {
                return QueryResult::failed(text, MissReason::AmbiguousItem, template, score, None)
            }
            Extraction::NotFound => {
                return QueryResult::failed(text, MissReason::NoItem, template, score, None)
            }
        }
    } else {
        None
    };

    match lookup(snapshot, template, slot.as_ref()) {
        Some(result) => QueryResult::hit(text, template, score, slot, result),
        None => QueryResult::failed(text, MissReason::LookupMiss, template, score, slot),
    }
}

fn lookup(snapshot: &Snapshot, template: &Template, slot: Option<&SlotMatch>) -> Option<Value> {
    let store = snapshot.store();
    let identifier = slot.map(|s| s.resolved_identifier.as_str());

    match template.access_kind {
        AccessKind::SingleField => {
            let column = template.target_columns.first()?;
            let value = store.get_field(identifier?, column)?;
            Some(single_entry(column, value))
        }
        AccessKind::FullRecord => store.get_row(identifier?).map(Value::Object),
        AccessKind::Count => Some(single_entry("count", Value::from(store.count()))),
        AccessKind::Aggregate => {
            let column = template.target_columns.first()?;
            let counts = store.count_by(column)?;
            let counts: Map<String, Value> = counts
                .into_iter()
                .map(|(value, n)| (value, Value::from(n)))
                .collect();
            Some(single_entry(column, Value::Object(counts)))
        }
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn assemble(results: Vec<Option<QueryResult>>) -> MatchResponse {
    MatchResponse::new(results.into_iter().flatten().collect())
}
