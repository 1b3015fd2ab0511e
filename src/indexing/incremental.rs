//! Incremental update (§4.F.1): rescans `root`, classifies changes against
//! what the store already has on record, and applies the minimal set of
//! deletes/inserts before re-running resolution.
//!
//! Re-resolution is global, not scoped to the changed files: a single
//! modified base class can change the MRO of classes anywhere in the repo,
//! and the resolution passes are cheap enough relative to parsing that
//! scoping them was not worth the bookkeeping. This is recorded on every
//! `UpdateReport` as `resolution_scope` rather than left implicit.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::indexing::builder::{commit_parsed_files, parse_file, ParsedFile};
use crate::model::FileRecord;
use crate::parsing::{DefaultParserFactory, ParserFactory};
use crate::resolution::{self, ResolutionCounters};
use crate::scanner::Scanner;
use crate::storage::{CodeGraph, IndexStore};
use crate::types::{FileId, VectorId};
use crate::vector::{symbol_embedding_text, VectorStore, Vectorizer};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct DetectedChange {
    pub kind: ChangeKind,
    pub repo_relative_path: Box<str>,
    pub previous_file_id: Option<FileId>,
}

/// Per-run metadata emitted by an incremental update (§4.F.1).
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub duration: Duration,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub symbols_indexed: usize,
    /// Count of symbols re-embedded by this update (§4.F.4: added/modified
    /// files' symbols only, never the whole store).
    pub symbols_embedded: usize,
    pub resolution: ResolutionCounters,
    pub vector_ids_evicted: usize,
    /// Always `"global"`: every update re-runs resolution over the whole
    /// store rather than just the changed files. See module docs.
    pub resolution_scope: &'static str,
}

pub struct IncrementalUpdater {
    settings: Arc<Settings>,
    parser_factory: Arc<dyn ParserFactory>,
    vectorizer: Arc<dyn Vectorizer>,
}

impl IncrementalUpdater {
    pub fn new(settings: Arc<Settings>, vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self {
            settings,
            parser_factory: Arc::new(DefaultParserFactory),
            vectorizer,
        }
    }

    pub fn with_parser_factory(settings: Arc<Settings>, parser_factory: Arc<dyn ParserFactory>, vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self { settings, parser_factory, vectorizer }
    }

    /// Rescans `root`, diffs against `store`'s current file records by
    /// path + (mtime, size, content hash), and applies the minimal set of
    /// deletes/inserts. Re-embeds exactly the added/modified files' symbols
    /// (§4.F.4 "recompute only this file's embeddings") and returns the
    /// refreshed call/inheritance graph.
    pub fn update(&self, root: &Path, store: &IndexStore, vector_store: &VectorStore, model_name: &str) -> IndexResult<(UpdateReport, CodeGraph)> {
        let start = Instant::now();

        let scanner = Scanner::new(self.settings.clone());
        let (files, _scan_report) = scanner.scan(root);

        let existing = store.query_files()?;
        let mut existing_by_path: HashMap<Box<str>, FileRecord> =
            existing.into_iter().map(|f| (f.repo_relative_path.clone(), f)).collect();

        let mut added_descriptors = Vec::new();
        let mut modified_descriptors = Vec::new();
        let mut changes = Vec::new();

        for descriptor in &files {
            match existing_by_path.remove(&descriptor.repo_relative_path) {
                None => {
                    changes.push(DetectedChange {
                        kind: ChangeKind::Added,
                        repo_relative_path: descriptor.repo_relative_path.clone(),
                        previous_file_id: None,
                    });
                    added_descriptors.push(descriptor.clone());
                }
                Some(previous) => {
                    if has_changed(&previous, descriptor) {
                        changes.push(DetectedChange {
                            kind: ChangeKind::Modified,
                            repo_relative_path: descriptor.repo_relative_path.clone(),
                            previous_file_id: Some(previous.id),
                        });
                        modified_descriptors.push((previous.id, descriptor.clone()));
                    }
                }
            }
        }
        // Anything left in `existing_by_path` was on record but not rescanned.
        let deleted: Vec<FileRecord> = existing_by_path.into_values().collect();
        for record in &deleted {
            changes.push(DetectedChange {
                kind: ChangeKind::Deleted,
                repo_relative_path: record.repo_relative_path.clone(),
                previous_file_id: Some(record.id),
            });
        }

        let mut next_file_id = store.max_file_id()? + 1;
        let mut next_symbol_base = store.max_symbol_id()? + 1;

        let factory = self.parser_factory.clone();
        let mut to_parse = Vec::new();
        for descriptor in &added_descriptors {
            let Some(file_id) = FileId::new(next_file_id) else {
                break;
            };
            to_parse.push((file_id, next_symbol_base, descriptor.clone()));
            next_file_id += 1;
            next_symbol_base += SYMBOL_BLOCK_SIZE;
        }
        for (_, descriptor) in &modified_descriptors {
            let Some(file_id) = FileId::new(next_file_id) else {
                break;
            };
            to_parse.push((file_id, next_symbol_base, descriptor.clone()));
            next_file_id += 1;
            next_symbol_base += SYMBOL_BLOCK_SIZE;
        }

        let parsed: Vec<ParsedFile> = to_parse
            .par_iter()
            .filter_map(|(file_id, symbol_base, descriptor)| parse_file(*file_id, *symbol_base, descriptor, &*factory))
            .collect();

        let mut vector_ids_evicted = 0;
        {
            let mut txn = store.transaction()?;
            for record in &deleted {
                let evicted = txn.delete_file(record.id)?;
                vector_ids_evicted += evicted.len();
                evict_vectors(vector_store, &evicted);
            }
            for (previous_id, _) in &modified_descriptors {
                let evicted = txn.delete_file(*previous_id)?;
                vector_ids_evicted += evicted.len();
                evict_vectors(vector_store, &evicted);
            }
            txn.commit()?;
        }

        let chunk_size = self.settings.indexing.chunk_size;
        let (symbols_indexed, _) = commit_parsed_files(store, &parsed, chunk_size)?;

        let symbols_embedded = self.embed_parsed_files(store, vector_store, &parsed, model_name)?;

        let (resolution, graph) = resolution::run_pipeline(store)?;

        let report = UpdateReport {
            duration: start.elapsed(),
            added: added_descriptors.len(),
            modified: modified_descriptors.len(),
            deleted: deleted.len(),
            symbols_indexed,
            symbols_embedded,
            resolution,
            vector_ids_evicted,
            resolution_scope: "global",
        };

        Ok((report, graph))
    }

    /// Embeds only `parsed`'s files' symbols (§4.F.4), mirroring
    /// `IndexBuilder::vectorize`'s batch-embed-then-write-metadata body but
    /// scoped per file instead of cursoring the whole store.
    fn embed_parsed_files(&self, store: &IndexStore, vector_store: &VectorStore, parsed: &[ParsedFile], model_name: &str) -> IndexResult<usize> {
        let chunk_size = self.settings.indexing.chunk_size;
        let mut embedded = 0;

        for parsed_file in parsed {
            let mut cursor = store.query_symbols(Some(parsed_file.record.id), chunk_size)?;
            loop {
                let batch = cursor.next_batch();
                if batch.is_empty() {
                    break;
                }

                let texts: Vec<String> = batch.iter().map(symbol_embedding_text).collect();
                let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                let vectors = self
                    .vectorizer
                    .embed_batch(&text_refs)
                    .map_err(|e| IndexError::General(format!("embedding failed: {e}")))?;

                let symbol_ids: Vec<_> = batch.iter().map(|s| s.id).collect();
                let vector_ids = vector_store
                    .add_vectors_batch(&symbol_ids, &vectors)
                    .map_err(|e| IndexError::General(format!("vector store write failed: {e}")))?;

                let mut txn = store.transaction()?;
                for (symbol_id, vector_id) in symbol_ids.iter().zip(&vector_ids) {
                    txn.write_embedding_metadata(*symbol_id, *vector_id, model_name)?;
                }
                txn.commit()?;

                embedded += vector_ids.len();
            }
        }

        Ok(embedded)
    }
}

const SYMBOL_BLOCK_SIZE: u32 = 1_000_000;

fn evict_vectors(vector_store: &VectorStore, ids: &[VectorId]) {
    if !ids.is_empty() {
        vector_store.remove_vectors(ids);
    }
}

/// A file is unchanged only if mtime, size, and (when present) content hash
/// all agree; any disagreement is treated as a modification (§4.F.1).
fn has_changed(previous: &FileRecord, current: &crate::scanner::FileDescriptor) -> bool {
    if previous.mtime_unix != current.mtime_unix || previous.size_bytes != current.size_bytes {
        return true;
    }
    if let Some(hash) = &previous.content_hash {
        let current_hash = std::fs::read(&current.absolute_path)
            .map(|bytes| crate::utils::content_hash(&bytes))
            .unwrap_or_default();
        return hash.as_ref() != current_hash.as_str();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::builder::IndexBuilder;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn update_detects_added_modified_and_deleted_files() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();
        fs::write(project.path().join("b.py"), "def b():\n    pass\n").unwrap();

        let index_dir = TempDir::new().unwrap();
        let store = IndexStore::open(index_dir.path()).unwrap();
        let settings = Arc::new(Settings::default());
        let builder = IndexBuilder::new(settings.clone());
        builder.full_build(project.path(), &store).unwrap();

        // Modify b.py, delete nothing yet, add c.py.
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(project.path().join("b.py"), "def b():\n    return 1\n").unwrap();
        fs::write(project.path().join("c.py"), "def c():\n    pass\n").unwrap();
        fs::remove_file(project.path().join("a.py")).unwrap();

        let vector_store = VectorStore::new(crate::vector::VECTOR_DIMENSION_DEFAULT);
        let vectorizer: Arc<dyn Vectorizer> = Arc::new(crate::vector::DeterministicVectorizer::new(crate::vector::VECTOR_DIMENSION_DEFAULT));
        let updater = IncrementalUpdater::new(settings, vectorizer);
        let (report, _graph) = updater.update(project.path(), &store, &vector_store, "deterministic-trigram").unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.modified, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.resolution_scope, "global");

        let remaining = store.query_files().unwrap();
        let paths: Vec<_> = remaining.iter().map(|f| f.repo_relative_path.to_string()).collect();
        assert!(!paths.iter().any(|p| p.ends_with("a.py")));
        assert!(paths.iter().any(|p| p.ends_with("b.py")));
        assert!(paths.iter().any(|p| p.ends_with("c.py")));
    }

    #[test]
    fn added_and_modified_files_get_fresh_embeddings() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();

        let index_dir = TempDir::new().unwrap();
        let store = IndexStore::open(index_dir.path()).unwrap();
        let settings = Arc::new(Settings::default());
        let builder = IndexBuilder::new(settings.clone());
        builder.full_build(project.path(), &store).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(project.path().join("a.py"), "def a():\n    return 1\n").unwrap();
        fs::write(project.path().join("b.py"), "def b():\n    pass\n").unwrap();

        let vector_store = VectorStore::new(crate::vector::VECTOR_DIMENSION_DEFAULT);
        let vectorizer: Arc<dyn Vectorizer> = Arc::new(crate::vector::DeterministicVectorizer::new(crate::vector::VECTOR_DIMENSION_DEFAULT));
        let updater = IncrementalUpdater::new(settings, vectorizer);
        let (report, _graph) = updater.update(project.path(), &store, &vector_store, "deterministic-trigram").unwrap();

        assert_eq!(report.symbols_embedded, 2);
        assert_eq!(vector_store.len(), 2);
    }
}
