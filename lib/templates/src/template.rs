//! Query templates
//!
//! A [`Template`] is a natural-language pattern such as
//! `what is the price of {ITEM}`, bound to the columns it reads and the kind
//! of access it performs. Its canonical phrase is the pattern with the item
//! placeholder removed; the canonical embedding is computed from that phrase.

use serde::{Deserialize, Serialize};
use tabx_core::text::tokenize;
use tabx_core::Vector;
use tabx_schema::SchemaProfile;

/// Placeholder for the row-identifying slot
pub const ITEM_PLACEHOLDER: &str = "{ITEM}";

/// Placeholder for the plural row noun, rendered at generation time
pub const ROWS_PLACEHOLDER: &str = "{ROWS}";

/// How a template reads the dataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AccessKind {
    /// One column of one row
    SingleField,
    /// Every column of one row
    FullRecord,
    /// Number of rows in the dataset
    Count,
    /// Number of rows per distinct value of a column
    Aggregate,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::SingleField => "single-field",
            AccessKind::FullRecord => "full-record",
            AccessKind::Count => "count",
            AccessKind::Aggregate => "aggregate",
        }
    }

    /// Whether the template needs a resolved item to run
    pub fn requires_item(&self) -> bool {
        matches!(self, AccessKind::SingleField | AccessKind::FullRecord)
    }
}

/// A parametrized query pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: String,
    pub pattern: String,
    /// Columns read, in order. Empty for dataset-level counts.
    pub target_columns: Vec<String>,
    pub access_kind: AccessKind,
    /// Pattern with the item slot removed
    pub canonical_phrase: String,
    #[serde(skip_serializing_if = "Vector::is_empty", default = "empty_vector")]
    pub canonical_embedding: Vector,
}

fn empty_vector() -> Vector {
    Vector::new(Vec::new())
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        target_columns: Vec<String>,
        access_kind: AccessKind,
        canonical_embedding: Vector,
    ) -> Self {
        let pattern = pattern.into();
        Self {
            id: id.into(),
            canonical_phrase: canonical_phrase(&pattern),
            pattern,
            target_columns,
            access_kind,
            canonical_embedding,
        }
    }

    pub fn requires_item(&self) -> bool {
        self.access_kind.requires_item()
    }

    /// Substitute a concrete item into the pattern
    pub fn render(&self, item: &str) -> String {
        self.pattern.replace(ITEM_PLACEHOLDER, item)
    }

    /// Check the template still fits a schema
    ///
    /// Every target column must exist, item templates need an identifying
    /// column, and the embedding must have the expected dimension.
    pub fn is_valid_for(&self, schema: &SchemaProfile, dim: usize) -> bool {
        if self.canonical_embedding.dim() != dim {
            return false;
        }
        if self.requires_item() && !schema.supports_item_lookup() {
            return false;
        }
        self.target_columns.iter().all(|c| schema.has_column(c))
    }
}

/// Remove the item slot and collapse whitespace
pub fn canonical_phrase(pattern: &str) -> String {
    pattern
        .replace(ITEM_PLACEHOLDER, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sorted token multiset of a phrase
///
/// Two phrases with the same key embed identically, so only one of them can
/// ever be retrieved.
pub fn phrase_key(phrase: &str) -> Vec<String> {
    let mut tokens = tokenize(phrase);
    tokens.sort();
    tokens
}

/// Persisted template set together with what it was generated from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateSet {
    pub schema_fingerprint: String,
    pub embedding_dim: usize,
    pub row_noun: String,
    pub templates: Vec<Template>,
}

impl TemplateSet {
    /// Whether the set was generated for this schema and embedding dimension
    pub fn matches(&self, schema: &SchemaProfile, dim: usize) -> bool {
        self.schema_fingerprint == schema.fingerprint() && self.embedding_dim == dim
    }

    /// Keep only templates still valid for `schema`, returning how many were dropped
    pub fn retain_valid(&mut self, schema: &SchemaProfile) -> usize {
        let before = self.templates.len();
        let dim = self.embedding_dim;
        self.templates.retain(|t| t.is_valid_for(schema, dim));
        before - self.templates.len()
    }
}
