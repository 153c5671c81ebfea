//! Schema profile definitions
//!
//! A [`SchemaProfile`] describes one loaded dataset: the semantic type of
//! every column, value statistics, and the column (if any) that identifies
//! a single row. Profiles are immutable once built; re-ingesting a dataset
//! produces a new profile.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Semantic type of a column, assigned by the rule cascade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Mostly parseable numbers
    Numeric,
    /// Mostly parseable dates or timestamps
    Date,
    /// Near-unique alphanumeric codes (SKUs, product codes)
    Identifier,
    /// Few distinct values relative to row count
    Categorical,
    /// Anything else: names, descriptions, free text
    Text,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Date => "date",
            SemanticType::Identifier => "identifier",
            SemanticType::Categorical => "categorical",
            SemanticType::Text => "text",
        }
    }
}

/// Shape of individual values, detected on a small sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ValuePattern {
    /// `PI-1234`
    CodeNumber,
    /// `SKU42`
    LettersNumbers,
    /// `12345`
    NumbersOnly,
    /// `red bicycle`
    LettersOnly,
    /// `2024-01-31`
    DateYyyyMmDd,
}

/// Profile of a single dataset column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnProfile {
    /// Column name as it appears in the dataset
    pub name: String,
    /// Human-readable phrase used in templates (`ProductPrice` -> `price`)
    pub label: String,
    pub semantic_type: SemanticType,
    /// First few distinct non-empty values
    pub sample_values: Vec<String>,
    /// True only for the single column chosen to address rows
    pub is_identifying: bool,
    /// Distinct non-empty values in the sample
    pub cardinality: usize,
    /// `cardinality / sampled rows`
    pub uniqueness: f64,
    pub null_count: usize,
    pub avg_length: f64,
    #[serde(default)]
    pub patterns: Vec<ValuePattern>,
}

/// Typed profile of a whole dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaProfile {
    table_name: String,
    row_count: usize,
    columns: Vec<ColumnProfile>,
    identifying_column: Option<String>,
}

impl SchemaProfile {
    pub(crate) fn new(
        table_name: String,
        row_count: usize,
        columns: Vec<ColumnProfile>,
        identifying_column: Option<String>,
    ) -> Self {
        Self {
            table_name,
            row_count,
            columns,
            identifying_column,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Columns in dataset order
    pub fn columns(&self) -> &[ColumnProfile] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The resolved primary identifying column, if the dataset has one
    pub fn identifying_column(&self) -> Option<&ColumnProfile> {
        self.identifying_column
            .as_deref()
            .and_then(|name| self.column(name))
    }

    /// Whether item-style (single-row) lookups are possible
    pub fn supports_item_lookup(&self) -> bool {
        self.identifying_column.is_some()
    }

    /// Names of all columns of the given type, in dataset order
    pub fn columns_of(&self, semantic_type: SemanticType) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type == semantic_type)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Stable digest of everything template generation depends on
    ///
    /// Two profiles with the same fingerprint produce the same templates.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(column.label.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(column.semantic_type.as_str().as_bytes());
            hasher.update(b"\x1e");
        }
        if let Some(id) = &self.identifying_column {
            hasher.update(id.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Errors that make a dataset unusable
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Dataset '{0}' has no columns")]
    NoColumns(String),

    #[error("Dataset '{0}' has no rows")]
    NoRows(String),

    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, semantic_type: SemanticType, is_identifying: bool) -> ColumnProfile {
        ColumnProfile {
            name: name.to_string(),
            label: name.to_lowercase(),
            semantic_type,
            sample_values: vec![],
            is_identifying,
            cardinality: 1,
            uniqueness: 1.0,
            null_count: 0,
            avg_length: 1.0,
            patterns: vec![],
        }
    }

    fn profile() -> SchemaProfile {
        SchemaProfile::new(
            "products".to_string(),
            3,
            vec![
                column("Code", SemanticType::Identifier, true),
                column("Price", SemanticType::Numeric, false),
                column("Weight", SemanticType::Numeric, false),
            ],
            Some("Code".to_string()),
        )
    }

    #[test]
    fn test_profile_accessors() {
        let schema = profile();
        assert_eq!(schema.identifying_column().map(|c| c.name.as_str()), Some("Code"));
        assert!(schema.supports_item_lookup());
        assert_eq!(schema.columns_of(SemanticType::Numeric), vec!["Price", "Weight"]);
        assert!(schema.has_column("Price"));
        assert!(!schema.has_column("Color"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = profile();
        let b = profile();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut columns = a.columns().to_vec();
        columns[1].semantic_type = SemanticType::Text;
        let changed = SchemaProfile::new("products".to_string(), 3, columns, Some("Code".to_string()));
        assert_ne!(a.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_serde_roundtrip() {
        let schema = profile();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: SchemaProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
        assert!(json.contains("\"semantic_type\":\"identifier\""));
    }
}
