//! # tabx API
//!
//! HTTP surface of the query engine: `POST /query` answers
//! `{"userInput": "..."}` requests, the remaining routes expose the loaded
//! schema, templates and recent misses, and trigger dataset reloads.

pub mod rest;

pub use rest::{configure, AppState, RestApi};
