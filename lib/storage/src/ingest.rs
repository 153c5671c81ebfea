//! CSV ingestion
//!
//! Reads a CSV file with a header row into a [`Table`] of raw cell text.
//! Short records are padded with empty cells and long records truncated to
//! the header width.

use crate::error::{Result, StorageError};
use csv::ReaderBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use tabx_core::Table;
use tracing::info;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid regex");
}

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Normalize header names with [`clean_column_name`]
    pub clean_columns: bool,
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            clean_columns: false,
            delimiter: b',',
        }
    }
}

/// Lowercase, collapse non-word runs to `_`, trim underscores and prefix a
/// leading digit: `"Unit Price ($)"` -> `unit_price`, `"2nd Size"` -> `_2nd_size`
pub fn clean_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let replaced = NON_WORD.replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Load a CSV file; the table is named after the file stem
pub fn load_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Table> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    let file = std::fs::File::open(path)?;
    let table = read_csv(name, file, options)?;
    info!(
        "Loaded {:?}: {} columns, {} rows",
        path,
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

/// Read CSV from any reader
pub fn read_csv<R: Read>(name: impl Into<String>, reader: R, options: &CsvOptions) -> Result<Table> {
    let name = name.into();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| {
            if options.clean_columns {
                clean_column_name(h)
            } else {
                h.trim().to_string()
            }
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(StorageError::MissingHeader(name));
    }

    let width = headers.len();
    let mut table = Table::new(name, headers);
    for record in rdr.records() {
        let record = record?;
        let row: Vec<String> = (0..width)
            .map(|idx| record.get(idx).unwrap_or("").trim().to_string())
            .collect();
        table.push_row(row)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv() {
        let data = "ProductCode,ProductPrice\nPI-1234,129.99\nPI-1235, 19.50 \n";
        let table = read_csv("products", data.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.columns(), &["ProductCode".to_string(), "ProductPrice".to_string()]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), Some("19.50"));
    }

    #[test]
    fn test_ragged_rows() {
        let data = "a,b,c\n1,2\n4,5,6,7\n";
        let table = read_csv("ragged", data.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.rows()[0], vec!["1", "2", ""]);
        assert_eq!(table.rows()[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_clean_column_name() {
        assert_eq!(clean_column_name("Unit Price ($)"), "unit_price");
        assert_eq!(clean_column_name("2nd Size"), "_2nd_size");
        assert_eq!(clean_column_name("  ProductCode "), "productcode");
    }

    #[test]
    fn test_clean_columns_option() {
        let options = CsvOptions {
            clean_columns: true,
            ..Default::default()
        };
        let table = read_csv("t", "Product Code,Unit-Price\nA-1,3\n".as_bytes(), &options).unwrap();
        assert_eq!(table.columns(), &["product_code".to_string(), "unit_price".to_string()]);
    }

    #[test]
    fn test_load_csv_names_table_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sku,qty\nSKU1,4").unwrap();

        let table = load_csv(&path, &CsvOptions::default()).unwrap();
        assert_eq!(table.name(), "inventory");
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = read_csv("empty", "".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, StorageError::MissingHeader(_)));
    }
}
