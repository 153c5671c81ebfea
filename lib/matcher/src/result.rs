//! Per-query results and the response envelope

use crate::extractor::SlotMatch;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tabx_templates::{AccessKind, Template};

/// Why a sub-query produced no result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// Best template scored below the minimum
    NoTemplateMatch,
    /// Template needs an item and none was found
    NoItem,
    /// Several items matched equally well
    AmbiguousItem,
    /// The resolved item or field is not in the row store
    LookupMiss,
    /// Embedding or retrieval ran out of time
    UpstreamTimeout,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::NoTemplateMatch => "no_template_match",
            MissReason::NoItem => "no_item",
            MissReason::AmbiguousItem => "ambiguous_item",
            MissReason::LookupMiss => "lookup_miss",
            MissReason::UpstreamTimeout => "upstream_timeout",
        }
    }
}

/// The template a sub-query was matched to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedTemplate {
    pub id: String,
    pub pattern: String,
    pub access_kind: AccessKind,
}

impl From<&Template> for MatchedTemplate {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            pattern: template.pattern.clone(),
            access_kind: template.access_kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Hit {
        template: MatchedTemplate,
        score: f32,
        slot: Option<SlotMatch>,
        result: Value,
    },
    Miss {
        reason: MissReason,
        /// Set when a template cleared the threshold but the query still failed
        template: Option<MatchedTemplate>,
        score: Option<f32>,
        slot: Option<SlotMatch>,
    },
}

/// Result of one sub-query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub outcome: QueryOutcome,
}

impl QueryResult {
    pub fn hit(query: impl Into<String>, template: &Template, score: f32, slot: Option<SlotMatch>, result: Value) -> Self {
        Self {
            query: query.into(),
            outcome: QueryOutcome::Hit {
                template: template.into(),
                score,
                slot,
                result,
            },
        }
    }

    /// A miss before any template was accepted
    pub fn no_match(query: impl Into<String>, reason: MissReason) -> Self {
        Self {
            query: query.into(),
            outcome: QueryOutcome::Miss {
                reason,
                template: None,
                score: None,
                slot: None,
            },
        }
    }

    /// A miss after a template was accepted
    pub fn failed(
        query: impl Into<String>,
        reason: MissReason,
        template: &Template,
        score: f32,
        slot: Option<SlotMatch>,
    ) -> Self {
        Self {
            query: query.into(),
            outcome: QueryOutcome::Miss {
                reason,
                template: Some(template.into()),
                score: Some(score),
                slot,
            },
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Hit { .. })
    }

    pub fn template(&self) -> Option<&MatchedTemplate> {
        match &self.outcome {
            QueryOutcome::Hit { template, .. } => Some(template),
            QueryOutcome::Miss { template, .. } => template.as_ref(),
        }
    }

    pub fn score(&self) -> Option<f32> {
        match &self.outcome {
            QueryOutcome::Hit { score, .. } => Some(*score),
            QueryOutcome::Miss { score, .. } => *score,
        }
    }

    pub fn slot(&self) -> Option<&SlotMatch> {
        match &self.outcome {
            QueryOutcome::Hit { slot, .. } | QueryOutcome::Miss { slot, .. } => slot.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            QueryOutcome::Hit { result, .. } => Some(result),
            QueryOutcome::Miss { .. } => None,
        }
    }

    pub fn miss_reason(&self) -> Option<MissReason> {
        match &self.outcome {
            QueryOutcome::Hit { .. } => None,
            QueryOutcome::Miss { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Serialize)]
struct WireResult<'a> {
    query: &'a str,
    hit: bool,
    template: Option<&'a str>,
    template_id: Option<&'a str>,
    score: Option<f32>,
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_kind: Option<AccessKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot: Option<&'a SlotMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<MissReason>,
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let template = self.template();
        WireResult {
            query: &self.query,
            hit: self.is_hit(),
            template: template.map(|t| t.pattern.as_str()),
            template_id: template.map(|t| t.id.as_str()),
            score: self.score(),
            result: self.result(),
            access_kind: template.map(|t| t.access_kind),
            slot: self.slot(),
            reason: self.miss_reason(),
        }
        .serialize(serializer)
    }
}

/// Response to one user input
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub any_hit: bool,
    pub queries: Vec<QueryResult>,
}

impl MatchResponse {
    pub fn new(queries: Vec<QueryResult>) -> Self {
        Self {
            any_hit: queries.iter().any(QueryResult::is_hit),
            queries,
        }
    }
}
