//! # tabx Core
//!
//! Core library for tabx, the natural-language query engine for tabular data.
//!
//! This crate provides the shared primitives:
//!
//! - [`Vector`] - Dense vector with cosine similarity
//! - [`Embedder`] - The text embedding seam, with [`PhraseEmbedder`] as the
//!   built-in deterministic implementation
//! - [`Table`] - An in-memory dataset of named columns and raw cells
//! - [`text`] - Tokenization, identifier normalization and trigram similarity
//!
//! ## Example
//!
//! ```rust
//! use tabx_core::{Embedder, PhraseEmbedder};
//!
//! let embedder = PhraseEmbedder::default();
//! let template = embedder.embed("what is the price of");
//! let query = embedder.embed("What is the price of?");
//! assert!(template.cosine_similarity(&query) > 0.99);
//! ```

pub mod vector;
pub mod error;
pub mod embedder;
pub mod table;
pub mod text;

pub use vector::Vector;
pub use error::{Error, Result};
pub use embedder::{Embedder, PhraseEmbedder, EmbedderBuilder, DEFAULT_EMBEDDING_DIM};
pub use table::Table;
