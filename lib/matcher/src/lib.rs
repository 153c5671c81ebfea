//! # tabx Matcher
//!
//! Answers free-text questions against a loaded dataset.
//!
//! - [`split_queries`] breaks an input into independent sub-queries
//! - [`SlotExtractor`] finds the item a sub-query is about
//! - [`QueryMatcher`] retrieves the best template, applies the score
//!   threshold and resolves the answer from the row store
//! - [`SnapshotHandle`] publishes rebuilt datasets without blocking requests
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tabx_core::{PhraseEmbedder, Table};
//! use tabx_matcher::{MatcherConfig, QueryMatcher, SnapshotBuilder, SnapshotHandle};
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
//! let handle = Arc::new(SnapshotHandle::new(builder.build_from_table(&table, 1).unwrap()));
//! let matcher = QueryMatcher::new(handle, MatcherConfig::default());
//!
//! let response = matcher.match_input("what is the price of PI-1234");
//! assert!(response.any_hit);
//! assert_eq!(response.queries[0].result(), Some(&serde_json::json!({"ProductPrice": 129.99})));
//! ```

pub mod config;
pub mod error;
pub mod split;
pub mod extractor;
pub mod result;
pub mod misses;
pub mod snapshot;
pub mod matcher;

pub use config::MatcherConfig;
pub use error::{MatcherError, Result};
pub use split::split_queries;
pub use extractor::{mask_span, Extraction, ItemCatalog, MatchKind, SlotExtractor, SlotMatch};
pub use result::{MatchResponse, MatchedTemplate, MissReason, QueryOutcome, QueryResult};
pub use misses::{MissLog, MissRecord};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotHandle};
pub use matcher::QueryMatcher;
