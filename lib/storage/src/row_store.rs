//! Keyed row store
//!
//! Rows are addressed by the exact value of the identifying column. Cells of
//! numeric columns are stored as JSON numbers, everything else as strings;
//! empty cells are `null`.

use ahash::AHashMap;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tabx_core::Table;
use tabx_schema::{SchemaProfile, SemanticType};
use tracing::debug;

/// One row as a column -> value map
pub type Row = Map<String, Value>;

/// Lookup interface used by the matcher
pub trait RowStore: Send + Sync {
    fn get_row(&self, identifier: &str) -> Option<Row>;

    fn get_field(&self, identifier: &str, column: &str) -> Option<Value>;

    fn count(&self) -> usize;

    /// Rows per distinct non-empty value of `column`, or `None` for an unknown column
    fn count_by(&self, column: &str) -> Option<BTreeMap<String, usize>>;
}

/// In-memory row store built from a loaded table
#[derive(Debug, Clone)]
pub struct TableStore {
    key_column: Option<String>,
    columns: Vec<String>,
    rows: Vec<Row>,
    index: AHashMap<String, usize>,
}

impl TableStore {
    pub fn new(table: &Table, schema: &SchemaProfile) -> Self {
        let numeric: Vec<bool> = table
            .columns()
            .iter()
            .map(|c| {
                schema
                    .column(c)
                    .map(|p| p.semantic_type == SemanticType::Numeric)
                    .unwrap_or(false)
            })
            .collect();

        let rows: Vec<Row> = table
            .rows()
            .iter()
            .map(|cells| {
                table
                    .columns()
                    .iter()
                    .zip(cells)
                    .zip(&numeric)
                    .map(|((column, cell), &is_numeric)| (column.clone(), coerce_cell(cell, is_numeric)))
                    .collect()
            })
            .collect();

        let key_column = schema.identifying_column().map(|c| c.name.clone());
        let mut index = AHashMap::new();
        if let Some(key_idx) = key_column.as_deref().and_then(|k| table.column_index(k)) {
            for (position, cells) in table.rows().iter().enumerate() {
                let key = cells[key_idx].trim();
                if key.is_empty() {
                    continue;
                }
                if index.contains_key(key) {
                    debug!("Duplicate key '{}' at row {}; keeping the first", key, position);
                    continue;
                }
                index.insert(key.to_string(), position);
            }
        }

        Self {
            key_column,
            columns: table.columns().to_vec(),
            rows,
            index,
        }
    }

    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn lookup(&self, identifier: &str) -> Option<&Row> {
        self.index.get(identifier).map(|&position| &self.rows[position])
    }
}

impl RowStore for TableStore {
    fn get_row(&self, identifier: &str) -> Option<Row> {
        self.lookup(identifier).cloned()
    }

    fn get_field(&self, identifier: &str, column: &str) -> Option<Value> {
        self.lookup(identifier).and_then(|row| row.get(column)).cloned()
    }

    fn count(&self) -> usize {
        self.rows.len()
    }

    fn count_by(&self, column: &str) -> Option<BTreeMap<String, usize>> {
        if !self.columns.iter().any(|c| c == column) {
            return None;
        }
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            let key = match row.get(column) {
                Some(Value::Null) | None => continue,
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Some(counts)
    }
}

fn coerce_cell(cell: &str, numeric: bool) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if numeric {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }

    Value::String(trimmed.to_string())
}
