//! `IndexHandle` (§6 "Library surface"): the single owned bundle of
//! everything a build produces and every other operation needs — relational
//! store, vector store, in-memory call graph, and the settings/vectorizer
//! they were built with. `api.rs` is a thin set of free functions over this.

use crate::config::Settings;
use crate::error::IndexResult;
use crate::indexing::{BuildReport, IndexBuilder, IncrementalUpdater, UpdateReport};
use crate::resolution;
use crate::storage::{CodeGraph, IndexStore};
use crate::vector::{DeterministicVectorizer, VectorStore, Vectorizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base name `VectorStore::save`/`load` derive `<base>.vectors`/`<base>.meta`
/// from, and the model tag `embeddings_metadata` rows are stamped with when
/// no real embedding model is wired in (§6 persisted-state layout).
const VECTORS_BASE_NAME: &str = "vectors";
pub(crate) const DETERMINISTIC_MODEL_NAME: &str = "deterministic-trigram";

pub struct IndexHandle {
    pub store: IndexStore,
    pub vector_store: VectorStore,
    pub graph: CodeGraph,
    pub vectorizer: Arc<dyn Vectorizer>,
    pub settings: Arc<Settings>,
    pub root: PathBuf,
}

impl IndexHandle {
    /// `build_index(root, output_dir, opts)` (§6): scans `root` from scratch,
    /// persists the store under `settings.data_dir`, and vectorizes every
    /// symbol with `vectorizer` (a deterministic fallback if none is given —
    /// real embedding backends are a host-supplied `Vectorizer`, §9).
    pub fn build(root: &Path, settings: Arc<Settings>, vectorizer: Option<Arc<dyn Vectorizer>>) -> IndexResult<(Self, BuildReport)> {
        std::fs::create_dir_all(&settings.data_dir).map_err(|e| crate::error::IndexError::General(format!("failed to create data dir: {e}")))?;

        let store = IndexStore::open(settings.data_dir.join("index.db"))?;
        let builder = IndexBuilder::new(settings.clone());
        let (report, graph) = builder.full_build(root, &store)?;

        let vectorizer = vectorizer.unwrap_or_else(|| Arc::new(DeterministicVectorizer::default()));
        let vector_store = VectorStore::new(vectorizer.dimension());
        builder.vectorize(&store, &vector_store, vectorizer.as_ref(), DETERMINISTIC_MODEL_NAME)?;
        vector_store
            .save(settings.data_dir.join(VECTORS_BASE_NAME))
            .map_err(|e| crate::error::IndexError::General(format!("failed to persist vector store: {e}")))?;

        Ok((
            Self {
                store,
                vector_store,
                graph,
                vectorizer,
                settings,
                root: root.to_path_buf(),
            },
            report,
        ))
    }

    /// `load_index(path)` (§6): opens an already-built store and vector
    /// store, then rebuilds the in-memory call graph from committed
    /// `symbol_references` rows — the graph itself is never persisted
    /// (SPEC_FULL §B.3).
    pub fn load(root: &Path, settings: Arc<Settings>, vectorizer: Option<Arc<dyn Vectorizer>>) -> IndexResult<Self> {
        let store = IndexStore::open(settings.data_dir.join("index.db"))?;
        let vectorizer = vectorizer.unwrap_or_else(|| Arc::new(DeterministicVectorizer::default()));
        let vector_store = VectorStore::load(settings.data_dir.join(VECTORS_BASE_NAME)).unwrap_or_else(|_| VectorStore::new(vectorizer.dimension()));
        let (_, graph) = resolution::run_pipeline(&store)?;

        Ok(Self {
            store,
            vector_store,
            graph,
            vectorizer,
            settings,
            root: root.to_path_buf(),
        })
    }

    /// `update_index(handle, changes?)` (§6): incremental re-scan, replacing
    /// this handle's in-memory graph with the freshly re-resolved one.
    pub fn update(&mut self) -> IndexResult<UpdateReport> {
        let updater = IncrementalUpdater::new(self.settings.clone(), self.vectorizer.clone());
        let (report, graph) = updater.update(&self.root, &self.store, &self.vector_store, DETERMINISTIC_MODEL_NAME)?;
        self.graph = graph;
        self.vector_store
            .save(self.settings.data_dir.join(VECTORS_BASE_NAME))
            .map_err(|e| crate::error::IndexError::General(format!("failed to persist vector store: {e}")))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn build_then_load_preserves_the_graph() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def a():\n    return b()\n\ndef b():\n    return 1\n").unwrap();

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let (handle, report) = IndexHandle::build(dir.path(), settings.clone(), None).unwrap();
        assert!(report.symbols_indexed >= 2);
        drop(handle);

        let loaded = IndexHandle::load(dir.path(), settings, None).unwrap();
        assert!(!loaded.graph.is_empty());
    }
}
