//! Template generation
//!
//! Produces an ordered template sequence from a [`SchemaProfile`]. Output is
//! a pure function of the profile, the configuration and the embedder.

use crate::template::{
    canonical_phrase, phrase_key, AccessKind, Template, TemplateSet, ITEM_PLACEHOLDER,
    ROWS_PLACEHOLDER,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tabx_core::Embedder;
use tabx_schema::{ColumnProfile, SchemaProfile, SemanticType};
use tracing::{debug, info};

const PRICE_WORDS: &[&str] = &["price", "cost", "amount", "value"];

const QUANTITY_WORDS: &[&str] = &["quantity", "stock", "qty", "inventory", "count"];

const FULL_RECORD_PHRASINGS: &[&str] = &[
    "show me details about {ITEM}",
    "tell me about {ITEM}",
    "tell me everything about {ITEM}",
    "give me all details for {ITEM}",
    "show all information for {ITEM}",
    "information about {ITEM}",
];

const COUNT_PHRASING: &str = "how many {ROWS} do we have";

const AGGREGATE_PHRASING: &str = "how many {ROWS} per {LABEL}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    /// Plural noun for dataset rows in count phrasings
    pub row_noun: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            row_noun: "items".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn row_noun(mut self, noun: impl Into<String>) -> Self {
        self.row_noun = noun.into();
        self
    }
}

struct Draft {
    pattern: String,
    target_columns: Vec<String>,
    access_kind: AccessKind,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator {
    config: GeneratorConfig,
}

impl TemplateGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate templates and wrap them with the schema fingerprint
    pub fn generate_set(&self, schema: &SchemaProfile, embedder: &dyn Embedder) -> TemplateSet {
        TemplateSet {
            schema_fingerprint: schema.fingerprint(),
            embedding_dim: embedder.dimension(),
            row_noun: self.config.row_noun.clone(),
            templates: self.generate(schema, embedder),
        }
    }

    /// Generate the ordered template sequence for a schema
    ///
    /// Templates whose canonical phrase is empty or has the same token bag as
    /// an earlier template are dropped. Embeddings are computed in one batch.
    pub fn generate(&self, schema: &SchemaProfile, embedder: &dyn Embedder) -> Vec<Template> {
        let mut seen = HashSet::new();
        let drafts: Vec<Draft> = self
            .drafts(schema)
            .into_iter()
            .filter(|draft| {
                let phrase = canonical_phrase(&draft.pattern);
                if phrase.is_empty() || !seen.insert(phrase_key(&phrase)) {
                    debug!("Dropping indistinguishable template '{}'", draft.pattern);
                    return false;
                }
                true
            })
            .collect();

        let phrases: Vec<String> = drafts.iter().map(|d| canonical_phrase(&d.pattern)).collect();
        let embeddings = embedder.embed_batch(&phrases);

        let templates: Vec<Template> = drafts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(n, (draft, embedding))| {
                Template::new(
                    format!("t{}", n),
                    draft.pattern,
                    draft.target_columns,
                    draft.access_kind,
                    embedding,
                )
            })
            .collect();

        info!(
            "Generated {} templates for dataset '{}'",
            templates.len(),
            schema.table_name()
        );
        templates
    }

    fn drafts(&self, schema: &SchemaProfile) -> Vec<Draft> {
        let mut drafts = Vec::new();

        if let Some(identifying) = schema.identifying_column() {
            for column in schema.columns().iter().filter(|c| !c.is_identifying) {
                for pattern in column_phrasings(column) {
                    drafts.push(Draft {
                        pattern,
                        target_columns: vec![column.name.clone()],
                        access_kind: AccessKind::SingleField,
                    });
                }
            }
            for pattern in FULL_RECORD_PHRASINGS {
                drafts.push(Draft {
                    pattern: pattern.to_string(),
                    target_columns: vec![identifying.name.clone()],
                    access_kind: AccessKind::FullRecord,
                });
            }
        }

        for column in schema
            .columns()
            .iter()
            .filter(|c| c.semantic_type == SemanticType::Categorical)
        {
            drafts.push(Draft {
                pattern: AGGREGATE_PHRASING
                    .replace(ROWS_PLACEHOLDER, &self.config.row_noun)
                    .replace("{LABEL}", &column.label),
                target_columns: vec![column.name.clone()],
                access_kind: AccessKind::Aggregate,
            });
        }

        drafts.push(Draft {
            pattern: COUNT_PHRASING.replace(ROWS_PLACEHOLDER, &self.config.row_noun),
            target_columns: Vec::new(),
            access_kind: AccessKind::Count,
        });

        drafts
    }
}

/// Single-field phrasings for one non-identifying column
fn column_phrasings(column: &ColumnProfile) -> Vec<String> {
    let label = column.label.as_str();
    let words: Vec<&str> = label.split_whitespace().collect();
    let has_any = |list: &[&str]| words.iter().any(|w| list.contains(w));

    let mut patterns = vec![
        format!("what is the {} of {}", label, ITEM_PLACEHOLDER),
        format!("show {} of {}", label, ITEM_PLACEHOLDER),
        format!("get {} for {}", label, ITEM_PLACEHOLDER),
    ];

    match column.semantic_type {
        SemanticType::Numeric if has_any(PRICE_WORDS) => {
            patterns.push(format!("how much does {} cost", ITEM_PLACEHOLDER));
            patterns.push(format!("how much is {}", ITEM_PLACEHOLDER));
        }
        SemanticType::Numeric if has_any(QUANTITY_WORDS) => {
            patterns.push(format!("how many {} do we have", ITEM_PLACEHOLDER));
            patterns.push(format!("check stock of {}", ITEM_PLACEHOLDER));
        }
        SemanticType::Text => {
            patterns.push(format!("describe {}", ITEM_PLACEHOLDER));
        }
        SemanticType::Date => {
            let rest: Vec<&str> = words.iter().copied().filter(|w| *w != "date").collect();
            if !rest.is_empty() {
                patterns.push(format!("when was {} {}", ITEM_PLACEHOLDER, rest.join(" ")));
            }
        }
        SemanticType::Categorical => {
            patterns.push(format!("what {} is {}", label, ITEM_PLACEHOLDER));
        }
        _ => {}
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabx_core::{PhraseEmbedder, Table};
    use tabx_schema::SchemaAnalyzer;

    fn schema() -> SchemaProfile {
        let rows = vec![
            vec!["PI-1234", "red bicycle", "129.99", "4", "red", "2024-01-05"],
            vec!["PI-1235", "blue kite", "19.50", "10", "blue", "2024-02-11"],
            vec!["PI-1236", "green tent", "250", "2", "green", "2024-03-20"],
            vec!["PI-1237", "red scooter", "89", "7", "red", "2024-04-02"],
            vec!["PI-1238", "blue helmet", "45.25", "12", "blue", "2024-05-18"],
            vec!["PI-1239", "green bottle", "9.99", "30", "green", "2024-06-30"],
        ];
        let table = Table::from_rows(
            "products",
            ["Code", "Description", "Price", "Quantity", "Color", "ReleaseDate"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
        .unwrap();
        SchemaAnalyzer::default().analyze(&table).unwrap()
    }

    fn patterns(templates: &[Template]) -> Vec<&str> {
        templates.iter().map(|t| t.pattern.as_str()).collect()
    }

    #[test]
    fn test_generates_expected_phrasings() {
        let templates = TemplateGenerator::default().generate(&schema(), &PhraseEmbedder::default());
        let patterns = patterns(&templates);

        assert!(patterns.contains(&"what is the price of {ITEM}"));
        assert!(patterns.contains(&"how much does {ITEM} cost"));
        assert!(patterns.contains(&"how many {ITEM} do we have"));
        assert!(patterns.contains(&"describe {ITEM}"));
        assert!(patterns.contains(&"when was {ITEM} release"));
        assert!(patterns.contains(&"what color is {ITEM}"));
        assert!(patterns.contains(&"show me details about {ITEM}"));
        assert!(patterns.contains(&"how many items per color"));
        assert_eq!(patterns.last(), Some(&"how many items do we have"));
    }

    #[test]
    fn test_targets_and_kinds() {
        let templates = TemplateGenerator::default().generate(&schema(), &PhraseEmbedder::default());

        let price = templates.iter().find(|t| t.pattern == "what is the price of {ITEM}").unwrap();
        assert_eq!(price.target_columns, vec!["Price"]);
        assert_eq!(price.access_kind, AccessKind::SingleField);

        let details = templates.iter().find(|t| t.pattern == "tell me about {ITEM}").unwrap();
        assert_eq!(details.access_kind, AccessKind::FullRecord);
        assert_eq!(details.target_columns, vec!["Code"]);

        let count = templates.last().unwrap();
        assert_eq!(count.access_kind, AccessKind::Count);
        assert!(count.target_columns.is_empty());

        // The identifying column gets no single-field lookup of its own
        assert!(!templates.iter().any(|t| t.pattern == "what is the code of {ITEM}"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = TemplateGenerator::default();
        let embedder = PhraseEmbedder::default();
        let a = generator.generate(&schema(), &embedder);
        let b = generator.generate(&schema(), &embedder);
        assert_eq!(a, b);
        for (n, template) in a.iter().enumerate() {
            assert_eq!(template.id, format!("t{}", n));
        }
    }

    #[test]
    fn test_token_bags_are_unique() {
        let templates = TemplateGenerator::default().generate(&schema(), &PhraseEmbedder::default());
        let mut keys = HashSet::new();
        for template in &templates {
            assert!(!template.canonical_phrase.is_empty());
            assert!(keys.insert(phrase_key(&template.canonical_phrase)));
        }
    }

    #[test]
    fn test_no_identifying_column_only_counts() {
        let table = Table::from_rows(
            "sizes",
            vec!["color".to_string(), "size".to_string()],
            vec![
                vec!["red".to_string(), "s".to_string()],
                vec!["red".to_string(), "m".to_string()],
                vec!["blue".to_string(), "s".to_string()],
                vec!["blue".to_string(), "m".to_string()],
            ],
        )
        .unwrap();
        let schema = SchemaAnalyzer::default().analyze(&table).unwrap();
        let generator = TemplateGenerator::new(GeneratorConfig::default().row_noun("shirts"));
        let templates = generator.generate(&schema, &PhraseEmbedder::default());

        assert!(templates.iter().all(|t| !t.requires_item()));
        assert_eq!(
            patterns(&templates),
            vec!["how many shirts per color", "how many shirts per size", "how many shirts do we have"]
        );
    }

    #[test]
    fn test_generate_set_records_fingerprint() {
        let schema = schema();
        let embedder = PhraseEmbedder::new(64);
        let set = TemplateGenerator::default().generate_set(&schema, &embedder);
        assert!(set.matches(&schema, 64));
        assert!(!set.matches(&schema, 512));
        assert!(set.templates.iter().all(|t| t.canonical_embedding.dim() == 64));
    }
}
