//! Dataset profiling
//!
//! Samples each column of a [`Table`], classifies it through the rule cascade
//! in [`crate::rules`] and picks at most one identifying column.

use crate::label::derive_labels;
use crate::rules::{self, ColumnSample};
use crate::schema::{ColumnProfile, SchemaError, SchemaProfile, SemanticType};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tabx_core::Table;
use tracing::{debug, info};

/// Thresholds used by the rule cascade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerConfig {
    /// Rows sampled per column
    pub sample_size: usize,
    /// Distinct example values kept on each profile
    pub sample_values: usize,
    pub numeric_ratio: f64,
    pub date_ratio: f64,
    /// Fraction of values that must look like codes for an identifier
    pub code_ratio: f64,
    /// Minimum uniqueness for identifiers and the identifying column
    pub uniqueness_floor: f64,
    pub categorical_max_distinct: usize,
    pub categorical_max_ratio: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            sample_values: 5,
            numeric_ratio: 0.95,
            date_ratio: 0.95,
            code_ratio: 0.95,
            uniqueness_floor: 0.9,
            categorical_max_distinct: 50,
            categorical_max_ratio: 0.5,
        }
    }
}

impl AnalyzerConfig {
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    pub fn uniqueness_floor(mut self, floor: f64) -> Self {
        self.uniqueness_floor = floor;
        self
    }

    pub fn categorical_max_distinct(mut self, max: usize) -> Self {
        self.categorical_max_distinct = max;
        self
    }
}

/// Builds a [`SchemaProfile`] from a table
#[derive(Debug, Clone, Default)]
pub struct SchemaAnalyzer {
    config: AnalyzerConfig,
}

impl SchemaAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Profile every column and resolve the identifying column
    ///
    /// Fails if the table has no columns, no rows, or repeats a column name.
    pub fn analyze(&self, table: &Table) -> Result<SchemaProfile, SchemaError> {
        if table.column_count() == 0 {
            return Err(SchemaError::NoColumns(table.name().to_string()));
        }
        if table.row_count() == 0 {
            return Err(SchemaError::NoRows(table.name().to_string()));
        }

        let mut seen = AHashSet::new();
        for name in table.columns() {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }

        let labels = derive_labels(table.columns());
        let sampled_rows = table.row_count().min(self.config.sample_size);

        let mut columns: Vec<ColumnProfile> = table
            .columns()
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (name, label))| self.profile_column(table, index, name, label, sampled_rows))
            .collect();

        let identifying = select_identifying(&columns, self.config.uniqueness_floor);
        if let Some(index) = identifying {
            columns[index].is_identifying = true;
        }
        let identifying_column = identifying.map(|index| columns[index].name.clone());

        info!(
            "Analyzed dataset '{}': {} columns, {} rows, identifying column: {}",
            table.name(),
            columns.len(),
            table.row_count(),
            identifying_column.as_deref().unwrap_or("none")
        );

        Ok(SchemaProfile::new(
            table.name().to_string(),
            table.row_count(),
            columns,
            identifying_column,
        ))
    }

    fn profile_column(
        &self,
        table: &Table,
        index: usize,
        name: &str,
        label: String,
        sampled_rows: usize,
    ) -> ColumnProfile {
        let mut values = Vec::with_capacity(sampled_rows);
        let mut distinct = AHashSet::new();
        let mut sample_values = Vec::new();
        let mut null_count = 0;

        for raw in table.column_values(index).take(sampled_rows) {
            let value = raw.trim();
            if value.is_empty() {
                null_count += 1;
                continue;
            }
            if distinct.insert(value) && sample_values.len() < self.config.sample_values {
                sample_values.push(value.to_string());
            }
            values.push(value);
        }

        let avg_length = if values.is_empty() {
            0.0
        } else {
            values.iter().map(|v| v.chars().count()).sum::<usize>() as f64 / values.len() as f64
        };

        let sample = ColumnSample {
            values,
            sampled_rows,
            distinct: distinct.len(),
        };
        let semantic_type = rules::classify(&sample, &self.config);
        let patterns = rules::detect_patterns(&sample.values);

        debug!(
            "Column '{}' -> {} (label '{}', {} distinct of {} sampled)",
            name,
            semantic_type.as_str(),
            label,
            sample.distinct,
            sampled_rows
        );

        ColumnProfile {
            name: name.to_string(),
            label,
            semantic_type,
            sample_values,
            is_identifying: false,
            cardinality: sample.distinct,
            uniqueness: sample.uniqueness(),
            null_count,
            avg_length,
            patterns,
        }
    }
}

/// Pick the identifier/text column with the highest uniqueness at or above
/// `floor`. Equal uniqueness prefers identifiers, then the earlier column.
fn select_identifying(columns: &[ColumnProfile], floor: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, column) in columns.iter().enumerate() {
        let candidate = matches!(
            column.semantic_type,
            SemanticType::Identifier | SemanticType::Text
        );
        if !candidate || column.uniqueness < floor {
            continue;
        }
        best = match best {
            Some(current) if !outranks(column, &columns[current]) => Some(current),
            _ => Some(index),
        };
    }
    best
}

fn outranks(a: &ColumnProfile, b: &ColumnProfile) -> bool {
    if a.uniqueness != b.uniqueness {
        return a.uniqueness > b.uniqueness;
    }
    a.semantic_type == SemanticType::Identifier && b.semantic_type != SemanticType::Identifier
}
