//! Phrase Embedder
//!
//! Converts short natural-language phrases into fixed-length vectors by
//! feature hashing. Templates and user queries are embedded with the same
//! function so that cosine similarity between them is meaningful.

use crate::text::tokenize;
use crate::vector::Vector;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIM: usize = 512;

/// Default weight of a function word
pub const DEFAULT_STOPWORD_WEIGHT: f32 = 0.25;

/// Default weight of a content word
pub const DEFAULT_CONTENT_WEIGHT: f32 = 1.0;

/// Default weight of each character trigram of a content word
pub const DEFAULT_TRIGRAM_WEIGHT: f32 = 0.3;

/// Function words carry little intent; they still contribute, at low weight
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "of", "for", "to", "in", "on", "at",
    "by", "me", "my", "do", "does", "did", "we", "us", "our", "i", "you", "have", "has", "had",
    "what", "please", "can", "could", "would", "it", "its",
];

/// Returns true for tokens treated as function words
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Text embedding function
///
/// Implementations must be deterministic: identical input always yields an
/// identical vector of length `dimension()`.
pub trait Embedder: Send + Sync {
    /// Length of every produced vector
    fn dimension(&self) -> usize;

    /// Embed a single phrase
    fn embed(&self, text: &str) -> Vector;

    /// Embed several phrases at once
    fn embed_batch(&self, texts: &[String]) -> Vec<Vector> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Feature-hashing phrase embedder
///
/// Every token contributes a word feature; content words additionally
/// contribute their padded character trigrams so that inflections
/// ("price" / "prices") stay close. The result is L2-normalized.
#[derive(Debug, Clone)]
pub struct PhraseEmbedder {
    dim: usize,
    stopword_weight: f32,
    content_weight: f32,
    trigram_weight: f32,
}

impl Default for PhraseEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl PhraseEmbedder {
    /// Create a new phrase embedder with the given dimension
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            stopword_weight: DEFAULT_STOPWORD_WEIGHT,
            content_weight: DEFAULT_CONTENT_WEIGHT,
            trigram_weight: DEFAULT_TRIGRAM_WEIGHT,
        }
    }

    fn bucket(&self, kind: u8, feature: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        feature.hash(&mut hasher);
        (hasher.finish() as usize) % self.dim
    }

    fn embed_tokens(&self, tokens: &[String]) -> Vector {
        let mut vector = Vector::zeros(self.dim);
        let data = vector.as_mut_slice();

        for token in tokens {
            if is_stopword(token) {
                data[self.bucket(0, token)] += self.stopword_weight;
                continue;
            }

            data[self.bucket(0, token)] += self.content_weight;

            let padded: Vec<char> = format!(" {} ", token).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                data[self.bucket(1, &trigram)] += self.trigram_weight;
            }
        }

        vector.normalize();
        vector
    }
}

impl Embedder for PhraseEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vector {
        self.embed_tokens(&tokenize(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vector> {
        texts.par_iter().map(|t| self.embed(t)).collect()
    }
}

/// Builder for creating PhraseEmbedder with custom options
#[derive(Debug, Clone)]
pub struct EmbedderBuilder {
    dim: usize,
    stopword_weight: f32,
    content_weight: f32,
    trigram_weight: f32,
}

impl Default for EmbedderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbedderBuilder {
    pub fn new() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
            stopword_weight: DEFAULT_STOPWORD_WEIGHT,
            content_weight: DEFAULT_CONTENT_WEIGHT,
            trigram_weight: DEFAULT_TRIGRAM_WEIGHT,
        }
    }

    pub fn dimension(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn stopword_weight(mut self, weight: f32) -> Self {
        self.stopword_weight = weight;
        self
    }

    pub fn content_weight(mut self, weight: f32) -> Self {
        self.content_weight = weight;
        self
    }

    pub fn trigram_weight(mut self, weight: f32) -> Self {
        self.trigram_weight = weight;
        self
    }

    pub fn build(self) -> PhraseEmbedder {
        PhraseEmbedder {
            dim: self.dim.max(1),
            stopword_weight: self.stopword_weight,
            content_weight: self.content_weight,
            trigram_weight: self.trigram_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_dimension() {
        let embedder = PhraseEmbedder::default();
        assert_eq!(embedder.dimension(), DEFAULT_EMBEDDING_DIM);
        assert_eq!(embedder.embed("what is the price of").dim(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_same_text_same_vector() {
        let embedder = PhraseEmbedder::default();
        let v1 = embedder.embed("show me details about");
        let v2 = embedder.embed("show me details about");
        assert_eq!(v1.as_slice(), v2.as_slice());
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = PhraseEmbedder::default();
        let v1 = embedder.embed("What is the PRICE of?");
        let v2 = embedder.embed("what is the price of");
        assert_eq!(v1.as_slice(), v2.as_slice());
    }

    #[test]
    fn test_vector_is_normalized() {
        let embedder = PhraseEmbedder::default();
        let vector = embedder.embed("how many items do we have");
        assert!((vector.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = PhraseEmbedder::default();
        let vector = embedder.embed("  ?! ");
        assert_eq!(vector.norm(), 0.0);
    }

    #[test]
    fn test_content_words_dominate() {
        let embedder = PhraseEmbedder::default();
        let template = embedder.embed("what is the quantity of");
        let close = embedder.embed("quantity of");
        let far = embedder.embed("what is the color of xyz");

        assert!(template.cosine_similarity(&close) > 0.8);
        assert!(template.cosine_similarity(&far) < 0.5);
    }

    #[test]
    fn test_batch_matches_single() {
        let embedder = PhraseEmbedder::default();
        let texts = vec!["show price of".to_string(), "tell me about".to_string()];
        let batch = embedder.embed_batch(&texts);
        assert_eq!(batch[0], embedder.embed("show price of"));
        assert_eq!(batch[1], embedder.embed("tell me about"));
    }

    #[test]
    fn test_builder_pattern() {
        let embedder = EmbedderBuilder::new().dimension(128).trigram_weight(0.0).build();
        assert_eq!(embedder.dimension(), 128);
        assert_eq!(embedder.embed("price").dim(), 128);
    }
}
