//! Persisted schema and template artifacts
//!
//! The data directory holds `schema.json` and `templates.json`. Both are
//! written atomically so a crash mid-write never leaves a torn file.

use crate::error::Result;
use atomicwrites::{AtomicFile, OverwriteBehavior::AllowOverwrite};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tabx_schema::SchemaProfile;
use tabx_templates::TemplateSet;
use tracing::{info, warn};

const SCHEMA_FILE: &str = "schema.json";
const TEMPLATES_FILE: &str = "templates.json";

pub struct ArtifactStore {
    data_dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) an artifact directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn schema_path(&self) -> PathBuf {
        self.data_dir.join(SCHEMA_FILE)
    }

    pub fn templates_path(&self) -> PathBuf {
        self.data_dir.join(TEMPLATES_FILE)
    }

    pub fn save_schema(&self, schema: &SchemaProfile) -> Result<()> {
        write_json(&self.schema_path(), schema)?;
        info!("Saved schema to {:?}", self.schema_path());
        Ok(())
    }

    pub fn load_schema(&self) -> Result<Option<SchemaProfile>> {
        read_json(&self.schema_path())
    }

    pub fn save_templates(&self, set: &TemplateSet) -> Result<()> {
        write_json(&self.templates_path(), set)?;
        info!(
            "Saved {} templates to {:?}",
            set.templates.len(),
            self.templates_path()
        );
        Ok(())
    }

    pub fn load_templates(&self) -> Result<Option<TemplateSet>> {
        read_json(&self.templates_path())
    }

    /// Persisted templates usable for `schema`, with invalid ones dropped
    ///
    /// Returns `None` when nothing is persisted, the file is unreadable, or it
    /// was generated for a different schema or embedding dimension.
    pub fn reusable_templates(&self, schema: &SchemaProfile, dim: usize) -> Option<TemplateSet> {
        let mut set = match self.load_templates() {
            Ok(Some(set)) => set,
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring unreadable {:?}: {}", self.templates_path(), e);
                return None;
            }
        };
        if !set.matches(schema, dim) {
            info!("Persisted templates are stale; regenerating");
            return None;
        }
        let dropped = set.retain_valid(schema);
        if dropped > 0 {
            warn!("Dropped {} persisted templates no longer valid for the schema", dropped);
        }
        Some(set)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    AtomicFile::new(path, AllowOverwrite).write(|f| f.write_all(&bytes))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabx_core::{PhraseEmbedder, Table};
    use tabx_schema::SchemaAnalyzer;
    use tabx_templates::TemplateGenerator;

    fn schema(columns: &[&str]) -> SchemaProfile {
        let table = Table::from_rows(
            "products",
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                vec!["PI-1".to_string(), "1.5".to_string()],
                vec!["PI-2".to_string(), "2.5".to_string()],
            ],
        )
        .unwrap();
        SchemaAnalyzer::default().analyze(&table).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("data")).unwrap();
        assert!(store.load_schema().unwrap().is_none());

        let schema = schema(&["code", "price"]);
        let set = TemplateGenerator::default().generate_set(&schema, &PhraseEmbedder::new(32));
        store.save_schema(&schema).unwrap();
        store.save_templates(&set).unwrap();

        assert_eq!(store.load_schema().unwrap(), Some(schema.clone()));

        let loaded = store.reusable_templates(&schema, 32).unwrap();
        assert_eq!(loaded.templates.len(), set.templates.len());
        for (a, b) in loaded.templates.iter().zip(&set.templates) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.pattern, b.pattern);
            assert_eq!(a.canonical_embedding.dim(), 32);
        }
    }

    #[test]
    fn test_stale_templates_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let old = schema(&["code", "price"]);
        let set = TemplateGenerator::default().generate_set(&old, &PhraseEmbedder::new(32));
        store.save_templates(&set).unwrap();

        let renamed = schema(&["code", "cost"]);
        assert!(store.reusable_templates(&renamed, 32).is_none());
        assert!(store.reusable_templates(&old, 64).is_none());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        std::fs::write(store.templates_path(), b"{not json").unwrap();

        assert!(store.load_templates().is_err());
        assert!(store.reusable_templates(&schema(&["code", "price"]), 32).is_none());
    }
}
