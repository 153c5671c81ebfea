//! Immutable matching state and its publication
//!
//! A [`Snapshot`] bundles everything a request reads: schema, template
//! index, item catalog, row store and the embedder the templates were
//! embedded with. Snapshots are built fully off to the side and published
//! with one pointer swap; requests holding the previous snapshot finish
//! against it.

use crate::error::Result;
use crate::extractor::ItemCatalog;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tabx_core::{Embedder, Table};
use tabx_schema::{AnalyzerConfig, SchemaAnalyzer, SchemaProfile};
use tabx_storage::{load_csv, ArtifactStore, CsvOptions, RowStore, TableStore};
use tabx_templates::{GeneratorConfig, Template, TemplateGenerator, TemplateIndex};
use tracing::{info, warn};

pub struct Snapshot {
    generation: u64,
    schema: SchemaProfile,
    index: TemplateIndex,
    catalog: ItemCatalog,
    store: Arc<dyn RowStore>,
    embedder: Arc<dyn Embedder>,
}

impl Snapshot {
    pub fn new(
        generation: u64,
        schema: SchemaProfile,
        index: TemplateIndex,
        catalog: ItemCatalog,
        store: Arc<dyn RowStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            generation,
            schema,
            index,
            catalog,
            store,
            embedder,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn schema(&self) -> &SchemaProfile {
        &self.schema
    }

    pub fn index(&self) -> &TemplateIndex {
        &self.index
    }

    pub fn templates(&self) -> &[Template] {
        self.index.templates()
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}

/// Process-wide holder of the current snapshot
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
    next_generation: AtomicU64,
    /// Serializes reloads so generations are published in order
    reload_lock: Mutex<()>,
}

impl SnapshotHandle {
    pub fn new(initial: Snapshot) -> Self {
        let next = initial.generation + 1;
        Self {
            current: RwLock::new(Arc::new(initial)),
            next_generation: AtomicU64::new(next),
            reload_lock: Mutex::new(()),
        }
    }

    /// The snapshot new requests should use
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Reserve a generation number for a snapshot about to be built
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Replace the current snapshot unless it is newer, returning the
    /// generation now current
    pub fn publish(&self, snapshot: Snapshot) -> u64 {
        let generation = snapshot.generation;
        let mut current = self.current.write();
        if current.generation > generation {
            warn!(
                "Ignoring snapshot generation {}; generation {} is already live",
                generation, current.generation
            );
            return current.generation;
        }
        *current = Arc::new(snapshot);
        info!("Published snapshot generation {}", generation);
        generation
    }

    /// Rebuild from a CSV file and publish; the current snapshot stays live on error
    pub fn reload(&self, builder: &SnapshotBuilder, path: &Path) -> Result<u64> {
        let _guard = self.reload_lock.lock();
        let snapshot = builder.build_from_csv(path, self.next_generation())?;
        Ok(self.publish(snapshot))
    }
}

/// Builds snapshots from a dataset, reusing persisted templates when possible
pub struct SnapshotBuilder {
    analyzer: SchemaAnalyzer,
    generator: TemplateGenerator,
    csv_options: CsvOptions,
    artifacts: Option<ArtifactStore>,
    embedder: Arc<dyn Embedder>,
}

impl SnapshotBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            analyzer: SchemaAnalyzer::default(),
            generator: TemplateGenerator::default(),
            csv_options: CsvOptions::default(),
            artifacts: None,
            embedder,
        }
    }

    pub fn analyzer_config(mut self, config: AnalyzerConfig) -> Self {
        self.analyzer = SchemaAnalyzer::new(config);
        self
    }

    pub fn generator_config(mut self, config: GeneratorConfig) -> Self {
        self.generator = TemplateGenerator::new(config);
        self
    }

    pub fn csv_options(mut self, options: CsvOptions) -> Self {
        self.csv_options = options;
        self
    }

    /// Persist schema and templates here, and reuse them across restarts
    pub fn artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn build_from_csv(&self, path: &Path, generation: u64) -> Result<Snapshot> {
        let table = load_csv(path, &self.csv_options)?;
        self.build_from_table(&table, generation)
    }

    pub fn build_from_table(&self, table: &Table, generation: u64) -> Result<Snapshot> {
        let schema = self.analyzer.analyze(table)?;
        let templates = self.templates_for(&schema)?;
        let index = TemplateIndex::build(templates)?;
        let catalog = ItemCatalog::build(table, &schema);
        let store: Arc<dyn RowStore> = Arc::new(TableStore::new(table, &schema));

        info!(
            "Built snapshot generation {}: {} templates, {} items",
            generation,
            index.len(),
            catalog.len()
        );

        Ok(Snapshot::new(
            generation,
            schema,
            index,
            catalog,
            store,
            Arc::clone(&self.embedder),
        ))
    }

    fn templates_for(&self, schema: &SchemaProfile) -> Result<Vec<Template>> {
        let embedder = self.embedder.as_ref();
        let Some(artifacts) = &self.artifacts else {
            return Ok(self.generator.generate(schema, embedder));
        };

        artifacts.save_schema(schema)?;
        let reusable = artifacts
            .reusable_templates(schema, embedder.dimension())
            .filter(|set| set.row_noun == self.generator.config().row_noun);
        if let Some(set) = reusable {
            info!("Reusing {} persisted templates", set.templates.len());
            return Ok(set.templates);
        }

        let set = self.generator.generate_set(schema, embedder);
        artifacts.save_templates(&set)?;
        Ok(set.templates)
    }
}
