//! Bounded log of recent misses, for finding phrasings the templates do not cover

use crate::result::MissReason;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MissRecord {
    pub query: String,
    pub reason: MissReason,
    pub best_score: Option<f32>,
    pub at: DateTime<Utc>,
}

/// Ring of the most recent misses; the oldest entry is dropped when full
pub struct MissLog {
    capacity: usize,
    entries: Mutex<VecDeque<MissRecord>>,
}

impl MissLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn record(&self, query: &str, reason: MissReason, best_score: Option<f32>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(MissRecord {
            query: query.to_string(),
            reason,
            best_score,
            at: Utc::now(),
        });
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<MissRecord> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_drops_oldest() {
        let log = MissLog::new(2);
        log.record("a", MissReason::NoTemplateMatch, Some(0.1));
        log.record("b", MissReason::NoItem, None);
        log.record("c", MissReason::LookupMiss, Some(0.9));

        let recent = log.recent(10);
        let queries: Vec<&str> = recent.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["c", "b"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let log = MissLog::new(0);
        log.record("a", MissReason::NoItem, None);
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear() {
        let log = MissLog::new(4);
        log.record("a", MissReason::NoItem, None);
        log.clear();
        assert!(log.recent(4).is_empty());
    }
}
