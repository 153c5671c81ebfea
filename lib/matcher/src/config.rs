use std::time::Duration;

/// Matching thresholds and budgets
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Minimum template similarity for a hit, inclusive
    pub min_score: f32,
    /// Minimum trigram similarity for a fuzzy item match, inclusive
    pub fuzzy_threshold: f32,
    /// Budget for embedding and index retrieval of one request
    pub time_budget: Duration,
    pub cache_ttl: Duration,
    pub miss_log_capacity: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: 0.6,
            fuzzy_threshold: 0.5,
            time_budget: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(300),
            miss_log_capacity: 1000,
        }
    }
}

impl MatcherConfig {
    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn miss_log_capacity(mut self, capacity: usize) -> Self {
        self.miss_log_capacity = capacity;
        self
    }
}
