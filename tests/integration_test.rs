// Integration tests for tabx
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabx_core::{Embedder, PhraseEmbedder, Table};
use tabx_matcher::{MatcherConfig, MissReason, QueryMatcher, QueryResult, SnapshotBuilder, SnapshotHandle};
use tabx_schema::{SchemaAnalyzer, SemanticType};
use tabx_storage::{ArtifactStore, MemoryCache};
use tabx_templates::{AccessKind, TemplateGenerator, TemplateIndex};

const COLORS: [&str; 5] = ["red", "blue", "green", "yellow", "black"];
const NOUNS: [&str; 10] = [
    "bicycle", "kite", "tent", "scooter", "helmet", "bottle", "lamp", "chair", "backpack", "compass",
];
const CATEGORIES: [&str; 5] = ["sports", "outdoor", "toys", "garden", "tools"];

/// 50 products; row 0 is PI-1234, "red bicycle", 129.99
fn products_csv() -> String {
    let mut csv = String::from(
        "ProductCode,ProductDescription,ProductPrice,ProductQuantity,ProductCategory\n",
    );
    for i in 0..50 {
        let price = if i == 0 {
            "129.99".to_string()
        } else {
            format!("{}.{:02}", 10 + i * 3, (i * 17) % 100)
        };
        csv.push_str(&format!(
            "PI-{},{} {},{},{},{}\n",
            1234 + i,
            COLORS[i / 10],
            NOUNS[i % 10],
            price,
            (i * 7) % 40 + 1,
            CATEGORIES[i % 5],
        ));
    }
    csv
}

fn write_dataset(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("products.csv");
    std::fs::write(&path, body).unwrap();
    path
}

fn matcher_for(path: &Path, config: MatcherConfig) -> QueryMatcher {
    let builder = SnapshotBuilder::new(Arc::new(PhraseEmbedder::default()));
    let snapshot = builder.build_from_csv(path, 1).unwrap();
    QueryMatcher::new(Arc::new(SnapshotHandle::new(snapshot)), config)
}

fn products_matcher(dir: &Path) -> QueryMatcher {
    matcher_for(&write_dataset(dir, &products_csv()), MatcherConfig::default())
}

#[test]
fn test_schema_has_one_identifying_column() {
    let dir = tempfile::tempdir().unwrap();
    let matcher = products_matcher(dir.path());
    let snapshot = matcher.snapshots().load();
    let schema = snapshot.schema();

    assert_eq!(schema.row_count(), 50);
    assert_eq!(schema.columns().iter().filter(|c| c.is_identifying).count(), 1);
    assert_eq!(schema.identifying_column().unwrap().name, "ProductCode");

    let types: Vec<SemanticType> = schema.columns().iter().map(|c| c.semantic_type).collect();
    assert_eq!(
        types,
        vec![
            SemanticType::Identifier,
            SemanticType::Text,
            SemanticType::Numeric,
            SemanticType::Numeric,
            SemanticType::Categorical,
        ]
    );
}

#[test]
fn test_price_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let response = products_matcher(dir.path()).match_input("what is the price of PI-1234");

    assert!(response.any_hit);
    let result = &response.queries[0];
    assert!(result.is_hit());
    assert_eq!(result.template().unwrap().pattern, "what is the price of {ITEM}");
    assert_eq!(result.result(), Some(&json!({"ProductPrice": 129.99})));
}

#[test]
fn test_count_of_rows() {
    let dir = tempfile::tempdir().unwrap();
    let response = products_matcher(dir.path()).match_input("how many items do we have");

    let result = &response.queries[0];
    assert!(result.is_hit());
    assert_eq!(result.template().unwrap().access_kind, AccessKind::Count);
    assert_eq!(result.result(), Some(&json!({"count": 50})));

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["queries"][0]["access_kind"], "count");
}

#[test]
fn test_unmapped_column_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let response = products_matcher(dir.path()).match_input("what is the color of XYZ");

    assert!(!response.any_hit);
    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["any_hit"], false);
    assert_eq!(wire["queries"][0]["hit"], false);
    assert!(wire["queries"][0]["template"].is_null());
    assert!(wire["queries"][0]["result"].is_null());
}

#[test]
fn test_aggregate_by_category() {
    let dir = tempfile::tempdir().unwrap();
    let response = products_matcher(dir.path()).match_input("how many items per category");

    let result = &response.queries[0];
    assert_eq!(result.template().unwrap().access_kind, AccessKind::Aggregate);
    assert_eq!(
        result.result(),
        Some(&json!({"ProductCategory": {
            "garden": 10, "outdoor": 10, "sports": 10, "tools": 10, "toys": 10
        }}))
    );
}

#[test]
fn test_multi_query_split() {
    let dir = tempfile::tempdir().unwrap();
    let matcher = products_matcher(dir.path());

    let response = matcher.match_input("show price of PI-1234 and quantity of PI-1235");
    assert_eq!(response.queries.len(), 2);
    assert!(response.queries.iter().all(|q| q.is_hit()));
    assert_eq!(response.queries[0].result(), Some(&json!({"ProductPrice": 129.99})));
    assert_eq!(response.queries[1].result(), Some(&json!({"ProductQuantity": 8})));

    // A miss in one sub-query does not suppress the other
    let response = matcher.match_input("show price of PI-1234 and quantity of PI-9999");
    assert_eq!(response.queries.len(), 2);
    assert!(response.any_hit);
    assert!(response.queries[0].is_hit());
    assert!(!response.queries[1].is_hit());
}

#[test]
fn test_ambiguous_description_is_not_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let body = "ProductCode,ProductDescription,ProductPrice\n\
        PI-1,red bicycle,100\n\
        PI-2,red bicycle,120\n\
        PI-3,blue kite,20\n\
        PI-4,green tent,250\n";
    let matcher = matcher_for(&write_dataset(dir.path(), body), MatcherConfig::default());

    let result = &matcher.match_input("what is the price of red bicycle").queries[0];
    assert!(!result.is_hit());
    assert_eq!(result.miss_reason(), Some(MissReason::AmbiguousItem));
    assert!(result.slot().is_none());

    let result = &matcher.match_input("what is the price of blue kite").queries[0];
    assert_eq!(result.result(), Some(&json!({"ProductPrice": 20})));
}

#[test]
fn test_threshold_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &products_csv());

    let embedder = PhraseEmbedder::default();
    let snapshot = SnapshotBuilder::new(Arc::new(embedder.clone())).build_from_csv(&path, 1).unwrap();
    let (_, score) = snapshot.index().best(&embedder.embed("show quantity of")).unwrap();

    let at = matcher_for(&path, MatcherConfig::default().min_score(score));
    assert!(at.match_input("show quantity of PI-1240").any_hit);

    let above = f32::from_bits(score.to_bits() + 1);
    let below = matcher_for(&path, MatcherConfig::default().min_score(above));
    let result = &below.match_input("show quantity of PI-1240").queries[0];
    assert_eq!(result.miss_reason(), Some(MissReason::NoTemplateMatch));
}

#[test]
fn test_every_item_template_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let matcher = products_matcher(dir.path());
    let snapshot = matcher.snapshots().load();
    let min_score = matcher.config().min_score;

    let item_templates: Vec<_> = snapshot.templates().iter().filter(|t| t.requires_item()).collect();
    assert!(item_templates.len() > 10);

    for template in item_templates {
        let query = template.render("PI-1240");
        let response = matcher.match_input(&query);
        assert_eq!(response.queries.len(), 1, "{}", query);

        let result = &response.queries[0];
        assert!(result.is_hit(), "{} missed", query);
        assert_eq!(result.template().unwrap().id, template.id, "{}", query);
        assert!(result.score().unwrap() >= min_score);
        assert_eq!(result.slot().unwrap().resolved_identifier, "PI-1240");
    }
}

#[test]
fn test_generation_and_retrieval_are_deterministic() {
    let table = Table::from_rows(
        "products",
        vec!["Code".into(), "Price".into(), "Color".into()],
        (0..20)
            .map(|i| vec![format!("PI-{}", i), format!("{}.5", i), COLORS[i % 5].to_string()])
            .collect(),
    )
    .unwrap();
    let schema = SchemaAnalyzer::default().analyze(&table).unwrap();
    let embedder = PhraseEmbedder::default();

    let first = TemplateGenerator::default().generate(&schema, &embedder);
    let second = TemplateGenerator::default().generate(&schema, &embedder);
    let patterns = |ts: &[tabx_templates::Template]| ts.iter().map(|t| t.pattern.clone()).collect::<Vec<_>>();
    assert_eq!(patterns(&first[..]), patterns(&second[..]));

    let index = TemplateIndex::build(first).unwrap();
    let query = embedder.embed("show me the color");
    assert_eq!(index.search(&query, 5), index.search(&query, 5));
}

#[test]
fn test_persisted_templates_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &products_csv());
    let data = dir.path().join("data");

    let build = |generation| {
        SnapshotBuilder::new(Arc::new(PhraseEmbedder::default()))
            .artifacts(ArtifactStore::new(&data).unwrap())
            .build_from_csv(&path, generation)
            .unwrap()
    };
    let first = build(1);
    let second = build(2);
    assert_eq!(first.index().len(), second.index().len());

    let matcher = QueryMatcher::new(Arc::new(SnapshotHandle::new(second)), MatcherConfig::default());
    let response = matcher.match_input("how much does PI-1234 cost");
    assert_eq!(response.queries[0].result(), Some(&json!({"ProductPrice": 129.99})));
}

#[test]
fn test_cached_results_follow_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &products_csv());
    let builder = SnapshotBuilder::new(Arc::new(PhraseEmbedder::default()));
    let handle = Arc::new(SnapshotHandle::new(builder.build_from_csv(&path, 1).unwrap()));
    let cache: Arc<MemoryCache<QueryResult>> = Arc::new(MemoryCache::new(1000));
    let matcher = QueryMatcher::new(Arc::clone(&handle), MatcherConfig::default()).with_cache(cache);

    let count = |m: &QueryMatcher| m.match_input("how many items do we have").queries[0].result().cloned();
    assert_eq!(count(&matcher), Some(json!({"count": 50})));

    let mut body = products_csv();
    body.push_str("PI-9000,white lamp,5.00,1,tools\n");
    std::fs::write(&path, body).unwrap();
    assert_eq!(handle.reload(&builder, &path).unwrap(), 2);

    assert_eq!(count(&matcher), Some(json!({"count": 51})));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bounded_matching() {
    let dir = tempfile::tempdir().unwrap();
    let matcher = products_matcher(dir.path());
    let response = matcher
        .match_input_bounded("what is the price of PI-1234. how many items do we have?")
        .await;

    assert_eq!(response.queries.len(), 2);
    assert!(response.queries.iter().all(|q| q.is_hit()));
    assert_eq!(response.queries[1].result(), Some(&json!({"count": 50})));
}

#[test]
fn test_embedder_is_shared_between_templates_and_queries() {
    let embedder = PhraseEmbedder::default();
    assert_eq!(embedder.embed("what is the price of"), embedder.embed("What is the  price of"));
}
