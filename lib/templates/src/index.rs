//! Template vector index
//!
//! Immutable nearest-neighbor index over canonical template embeddings.
//! Template sets are small (tens to a few hundred entries), so retrieval is
//! an exact scan ranked by cosine similarity. Rebuilding is the only way to
//! change the contents.

use crate::error::{Result, TemplateError};
use crate::template::Template;
use std::collections::HashMap;
use tabx_core::Vector;

#[derive(Debug, Clone)]
pub struct TemplateIndex {
    templates: Vec<Template>,
    by_id: HashMap<String, usize>,
    dim: usize,
}

impl TemplateIndex {
    /// Build an index; all embeddings must share one dimension
    pub fn build(templates: Vec<Template>) -> Result<Self> {
        let dim = templates.first().map(|t| t.canonical_embedding.dim()).unwrap_or(0);
        let mut by_id = HashMap::with_capacity(templates.len());

        for (position, template) in templates.iter().enumerate() {
            if template.canonical_embedding.dim() != dim {
                return Err(TemplateError::InvalidDimension {
                    id: template.id.clone(),
                    expected: dim,
                    actual: template.canonical_embedding.dim(),
                });
            }
            if by_id.insert(template.id.clone(), position).is_some() {
                return Err(TemplateError::DuplicateId(template.id.clone()));
            }
        }

        Ok(Self {
            templates,
            by_id,
            dim,
        })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.by_id.get(id).map(|&position| &self.templates[position])
    }

    /// Top-k `(position, score)` pairs by descending cosine similarity
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &Vector, k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .templates
            .iter()
            .enumerate()
            .map(|(position, template)| (position, template.canonical_embedding.cosine_similarity(query)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }

    /// Top-k templates with their scores
    pub fn query(&self, query: &Vector, k: usize) -> Vec<(&Template, f32)> {
        self.search(query, k)
            .into_iter()
            .map(|(position, score)| (&self.templates[position], score))
            .collect()
    }

    /// The single best template, if the index is not empty
    pub fn best(&self, query: &Vector) -> Option<(&Template, f32)> {
        self.query(query, 1).into_iter().next()
    }
}
