//! # tabx Schema
//!
//! Schema inference for tabular datasets.
//!
//! ## Overview
//!
//! The analyzer inspects a dataset once and produces an immutable
//! [`SchemaProfile`]: one [`ColumnProfile`] per column with a closed
//! [`SemanticType`], value statistics, a human-readable label, and the
//! column (if any) that identifies a single row.
//!
//! Classification is an ordered cascade of pure rules:
//!
//! ```text
//! numeric ──> date ──> identifier ──> categorical ──> (text)
//! ```
//!
//! The first rule that accepts a column decides its type.
//!
//! ## Example
//!
//! ```rust
//! use tabx_core::Table;
//! use tabx_schema::{SchemaAnalyzer, SemanticType};
//!
//! let table = Table::from_rows(
//!     "products",
//!     vec!["ProductCode".into(), "ProductPrice".into()],
//!     vec![
//!         vec!["PI-1234".into(), "129.99".into()],
//!         vec!["PI-1235".into(), "19.50".into()],
//!     ],
//! ).unwrap();
//!
//! let schema = SchemaAnalyzer::default().analyze(&table).unwrap();
//! assert_eq!(schema.column("ProductPrice").unwrap().semantic_type, SemanticType::Numeric);
//! assert_eq!(schema.identifying_column().unwrap().name, "ProductCode");
//! ```

pub mod schema;
pub mod label;
pub mod rules;
pub mod analyzer;

pub use schema::{ColumnProfile, SchemaError, SchemaProfile, SemanticType, ValuePattern};
pub use label::{derive_labels, split_words};
pub use analyzer::{AnalyzerConfig, SchemaAnalyzer};
