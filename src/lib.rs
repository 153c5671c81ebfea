//! # tabx
//!
//! Natural-language queries over arbitrary tabular datasets.
//!
//! tabx profiles a CSV file, generates question templates for its columns,
//! and answers free-text questions such as "what is the price of PI-1234"
//! by matching them to a template and reading the answer from the data.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! tabx setup products.csv
//! tabx serve products.csv --port 8080
//! curl -X POST localhost:8080/query -H 'content-type: application/json' \
//!      -d '{"userInput": "what is the price of PI-1234"}'
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use std::sync::Arc;
//! use tabx::prelude::*;
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
//! let builder = SnapshotBuilder::new(Arc::new(PhraseEmbedder::default()));
//! let snapshot = builder.build_from_table(&table, 1).unwrap();
//! let matcher = QueryMatcher::new(Arc::new(SnapshotHandle::new(snapshot)), MatcherConfig::default());
//!
//! let response = matcher.match_input("how many items do we have");
//! assert_eq!(response.queries[0].result(), Some(&serde_json::json!({"count": 2})));
//! ```
//!
//! ## Crate Structure
//!
//! - `tabx-core` - Vectors, the phrase embedder, text utilities and tables
//! - `tabx-schema` - Column type inference and the dataset profile
//! - `tabx-templates` - Template generation and the template index
//! - `tabx-storage` - CSV ingestion, row store, result cache, persisted artifacts
//! - `tabx-matcher` - Sub-query splitting, item extraction and matching
//! - `tabx-api` - REST API

// Re-export core types
pub use tabx_core::{Embedder, EmbedderBuilder, Error, PhraseEmbedder, Result, Table, Vector};

// Re-export schema
pub use tabx_schema::{AnalyzerConfig, ColumnProfile, SchemaAnalyzer, SchemaError, SchemaProfile, SemanticType};

// Re-export templates
pub use tabx_templates::{AccessKind, GeneratorConfig, Template, TemplateGenerator, TemplateIndex, TemplateSet};

// Re-export storage
pub use tabx_storage::{load_csv, ArtifactStore, CsvOptions, MemoryCache, ResultCache, RowStore, TableStore};

// Re-export matcher
pub use tabx_matcher::{
    split_queries, MatchResponse, MatcherConfig, MissReason, QueryMatcher, QueryResult,
    SlotExtractor, SlotMatch, Snapshot, SnapshotBuilder, SnapshotHandle,
};

// Re-export API
pub use tabx_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Embedder, PhraseEmbedder, Table, Vector,
        SchemaAnalyzer, SchemaProfile, SemanticType,
        AccessKind, Template, TemplateGenerator, TemplateIndex,
        load_csv, ArtifactStore, CsvOptions, MemoryCache, RowStore,
        MatchResponse, MatcherConfig, MissReason, QueryMatcher, QueryResult,
        SnapshotBuilder, SnapshotHandle,
    };
}
