//! # tabx Templates
//!
//! Natural-language query templates derived from a dataset schema, and the
//! vector index used to retrieve them.
//!
//! - [`TemplateGenerator`] turns a [`tabx_schema::SchemaProfile`] into an
//!   ordered [`Template`] sequence with canonical embeddings
//! - [`TemplateIndex`] is an immutable cosine-similarity index over them
//!
//! ## Example
//!
//! ```rust
//! use tabx_core::{Embedder, PhraseEmbedder, Table};
//! use tabx_schema::SchemaAnalyzer;
//! use tabx_templates::{TemplateGenerator, TemplateIndex};
//!
//! let table = Table::from_rows(
//!     "products",
//!     vec!["ProductCode".into(), "ProductPrice".into()],
//!     vec![
//!         vec!["PI-1234".into(), "129.99".into()],
//!         vec!["PI-1235".into(), "19.50".into()],
//!     ],
//! ).unwrap();
//! let schema = SchemaAnalyzer::default().analyze(&table).unwrap();
//!
//! let embedder = PhraseEmbedder::default();
//! let templates = TemplateGenerator::default().generate(&schema, &embedder);
//! let index = TemplateIndex::build(templates).unwrap();
//!
//! let (best, score) = index.best(&embedder.embed("what is the price of")).unwrap();
//! assert_eq!(best.pattern, "what is the price of {ITEM}");
//! assert!(score > 0.99);
//! ```

pub mod error;
pub mod template;
pub mod generator;
pub mod index;

pub use error::{Result, TemplateError};
pub use template::{AccessKind, Template, TemplateSet, ITEM_PLACEHOLDER, ROWS_PLACEHOLDER};
pub use generator::{GeneratorConfig, TemplateGenerator};
pub use index::TemplateIndex;
