//! The Mutation Engine (§4.H): orchestrates Locate → Reformat → Splice →
//! Atomic write → Ledger → Index refresh behind two entry points,
//! `edit_symbol` and `delete_symbol`, matching the `mutate_edit`/
//! `mutate_delete` library calls of §6.
//!
//! Grounded in `original_source/tests/test_mutation_integration.py`'s
//! `MutationFacade` pipeline shape (locate → edit → validate → save →
//! ledger), reworked into a typed `Result`-returning engine instead of a
//! `result.success`/`result.errors` facade object.

use crate::error::{MutationError, MutationResult};
use crate::handle::DETERMINISTIC_MODEL_NAME;
use crate::indexing::IncrementalUpdater;
use crate::mutation::guard::{self, RiskLevel};
use crate::mutation::ledger::{DiffLedger, MutationOperation};
use crate::mutation::{atomic_write, locate, reformat, splice, validate};
use crate::storage::graph::CodeGraph;
use crate::storage::IndexStore;
use crate::types::SymbolKind;
use crate::vector::{DeterministicVectorizer, VectorStore, Vectorizer};
use crate::config::Settings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct MutationOptions {
    pub dry_run: bool,
    pub preserve_indentation: bool,
    pub run_syntax_check: bool,
    pub backup: bool,
    /// Overrides a HIGH risk-gate verdict (§4.H "Risk gate").
    pub force: bool,
    pub expected_kind: Option<SymbolKind>,
}

impl MutationOptions {
    pub fn from_config(config: &crate::config::MutationConfig, dry_run: bool) -> Self {
        Self {
            dry_run,
            preserve_indentation: config.preserve_indentation,
            run_syntax_check: config.run_syntax_check,
            backup: config.backup,
            force: false,
            expected_kind: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub operation: MutationOperation,
    pub symbol_name: String,
    pub file_path: PathBuf,
    pub lines_changed: u32,
    pub lines_total: u32,
    pub write_efficiency: f32,
    pub tokens_saved: u32,
    pub backup_path: Option<PathBuf>,
    pub risk_level: RiskLevel,
    pub dry_run: bool,
}

pub struct MutationEngine<'a> {
    store: &'a IndexStore,
    vector_store: &'a VectorStore,
    graph: &'a CodeGraph,
    vectorizer: Arc<dyn Vectorizer>,
    settings: Arc<Settings>,
    root: PathBuf,
    ledger: Mutex<DiffLedger>,
    ledger_path: PathBuf,
    /// The freshly re-resolved graph from the last `refresh_index` call, if
    /// any. `graph` above stays a `&'a CodeGraph` borrowed at construction
    /// time, so this is how a caller recovers the post-mutation graph —
    /// see `take_refreshed_graph`.
    refreshed_graph: Mutex<Option<CodeGraph>>,
}

impl<'a> MutationEngine<'a> {
    pub fn new(store: &'a IndexStore, vector_store: &'a VectorStore, graph: &'a CodeGraph, settings: Arc<Settings>, root: PathBuf) -> MutationResult<Self> {
        let vectorizer = Arc::new(DeterministicVectorizer::new(vector_store.dimension()));
        Self::with_vectorizer(store, vector_store, graph, settings, root, vectorizer)
    }

    pub fn with_vectorizer(
        store: &'a IndexStore,
        vector_store: &'a VectorStore,
        graph: &'a CodeGraph,
        settings: Arc<Settings>,
        root: PathBuf,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> MutationResult<Self> {
        let ledger_path = settings.data_dir.join("ledger.db");
        let ledger = DiffLedger::open(&ledger_path)?;
        Ok(Self {
            store,
            vector_store,
            graph,
            vectorizer,
            settings,
            root,
            ledger: Mutex::new(ledger),
            ledger_path,
            refreshed_graph: Mutex::new(None),
        })
    }

    /// The graph re-resolved by the last mutation's index refresh, if this
    /// engine has performed one. `handle.graph` (borrowed immutably to build
    /// this engine) does not update itself; callers that want to keep using
    /// a fresh graph after a mutation should take this and install it.
    pub fn take_refreshed_graph(&self) -> Option<CodeGraph> {
        self.refreshed_graph.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    /// `mutate_edit` (§6): replaces `symbol_name`'s body in `file_path` with
    /// `new_code`. On success, if `!dry_run`, the file on disk has already
    /// been rewritten and the index incrementally refreshed.
    ///
    /// Recovering from optimistic-lock failure via `mutation::merge` is not
    /// auto-attempted here: that merge needs the indexed *base* text, which
    /// this engine does not retain (only its content hash, for the lock
    /// check). Callers holding a base copy — e.g. from a prior backup — can
    /// call `mutation::merge::three_way_merge` directly and retry.
    pub fn edit_symbol(&self, file_path: &Path, symbol_name: &str, new_code: &str, options: &MutationOptions) -> MutationResult<MutationOutcome> {
        let located = locate::locate(self.store, &self.root, file_path, symbol_name, options.expected_kind)?;
        locate::check_unchanged(&located.file, &located.source, file_path)?;

        let risk_level = self.check_risk_gate(&located.symbol, file_path, options)?;

        let body = if options.preserve_indentation {
            let indent_unit = reformat::detect_indent_unit(&located.source);
            let target_depth = reformat::leading_indent(
                located.source.lines().nth((located.symbol.range.start_line as usize).saturating_sub(1)).unwrap_or(""),
            )
            .len()
                / indent_unit.len().max(1);
            reformat::reindent(new_code, &indent_unit, target_depth)
        } else {
            new_code.trim_end().to_string()
        };

        let spliced = splice::splice_replace(&located.source, located.symbol.range, &body);
        let line_ending = reformat::detect_line_ending(&located.source);
        let final_text = reformat::normalize_line_endings(&spliced, line_ending);

        if options.run_syntax_check {
            let errors = validate::validate_syntax(&final_text, located.symbol.language).map_err(|e| MutationError::SyntaxValidation {
                path: file_path.to_path_buf(),
                errors: vec![e],
            })?;
            if !errors.is_empty() {
                return Err(MutationError::SyntaxValidation {
                    path: file_path.to_path_buf(),
                    errors,
                });
            }
        }

        let lines_changed = body.lines().count().max(1) as u32;
        let lines_total = final_text.lines().count().max(1) as u32;

        if options.dry_run {
            return Ok(MutationOutcome {
                operation: MutationOperation::Edit,
                symbol_name: symbol_name.to_string(),
                file_path: file_path.to_path_buf(),
                lines_changed,
                lines_total,
                write_efficiency: lines_changed as f32 / lines_total as f32,
                tokens_saved: 4 * lines_total.saturating_sub(lines_changed),
                backup_path: None,
                risk_level,
                dry_run: true,
            });
        }

        let backup_path = self.maybe_backup(file_path, &located.source, options)?;
        atomic_write::atomic_write(file_path, &final_text)?;
        let metric = self.record_and_save(MutationOperation::Edit, file_path, lines_changed, lines_total, backup_path.clone())?;
        self.refresh_index()?;

        Ok(MutationOutcome {
            operation: MutationOperation::Edit,
            symbol_name: symbol_name.to_string(),
            file_path: file_path.to_path_buf(),
            lines_changed: metric.lines_changed,
            lines_total: metric.lines_total,
            write_efficiency: metric.write_efficiency,
            tokens_saved: metric.tokens_saved,
            backup_path,
            risk_level,
            dry_run: false,
        })
    }

    /// `mutate_delete` (§6): removes `symbol_name` (plus a trailing blank
    /// line, per §4.H) and skips reformatting since there is no replacement
    /// body to rewrap.
    pub fn delete_symbol(&self, file_path: &Path, symbol_name: &str, options: &MutationOptions) -> MutationResult<MutationOutcome> {
        let located = locate::locate(self.store, &self.root, file_path, symbol_name, options.expected_kind)?;
        locate::check_unchanged(&located.file, &located.source, file_path)?;

        let risk_level = self.check_risk_gate(&located.symbol, file_path, options)?;

        let spliced = splice::splice_delete(&located.source, located.symbol.range);
        let line_ending = reformat::detect_line_ending(&located.source);
        let final_text = reformat::normalize_line_endings(&spliced, line_ending);

        if options.run_syntax_check {
            let errors = validate::validate_syntax(&final_text, located.symbol.language).map_err(|e| MutationError::SyntaxValidation {
                path: file_path.to_path_buf(),
                errors: vec![e],
            })?;
            if !errors.is_empty() {
                return Err(MutationError::SyntaxValidation {
                    path: file_path.to_path_buf(),
                    errors,
                });
            }
        }

        let lines_changed = (located.symbol.range.end_line - located.symbol.range.start_line + 1).max(1);
        let lines_total = located.source.lines().count().max(1) as u32;

        if options.dry_run {
            return Ok(MutationOutcome {
                operation: MutationOperation::Delete,
                symbol_name: symbol_name.to_string(),
                file_path: file_path.to_path_buf(),
                lines_changed,
                lines_total,
                write_efficiency: lines_changed as f32 / lines_total as f32,
                tokens_saved: 4 * lines_total.saturating_sub(lines_changed),
                backup_path: None,
                risk_level,
                dry_run: true,
            });
        }

        let backup_path = self.maybe_backup(file_path, &located.source, options)?;
        atomic_write::atomic_write(file_path, &final_text)?;
        let metric = self.record_and_save(MutationOperation::Delete, file_path, lines_changed, lines_total, backup_path.clone())?;
        self.refresh_index()?;

        Ok(MutationOutcome {
            operation: MutationOperation::Delete,
            symbol_name: symbol_name.to_string(),
            file_path: file_path.to_path_buf(),
            lines_changed: metric.lines_changed,
            lines_total: metric.lines_total,
            write_efficiency: metric.write_efficiency,
            tokens_saved: metric.tokens_saved,
            backup_path,
            risk_level,
            dry_run: false,
        })
    }

    fn check_risk_gate(&self, symbol: &crate::Symbol, file_path: &Path, options: &MutationOptions) -> MutationResult<RiskLevel> {
        let ledger = self.ledger.lock().unwrap_or_else(|p| p.into_inner());
        let level = guard::classify(self.graph, symbol.id, &ledger, file_path);
        if level == RiskLevel::High && !options.force {
            return Err(MutationError::RiskGateBlocked { path: file_path.to_path_buf() });
        }
        Ok(level)
    }

    fn maybe_backup(&self, file_path: &Path, current_content: &str, options: &MutationOptions) -> MutationResult<Option<PathBuf>> {
        if !options.backup {
            return Ok(None);
        }
        let backups_dir = self.settings.data_dir.join("backups");
        Ok(Some(atomic_write::create_backup(file_path, current_content, &backups_dir)?))
    }

    fn record_and_save(&self, operation: MutationOperation, file_path: &Path, lines_changed: u32, lines_total: u32, backup_path: Option<PathBuf>) -> MutationResult<crate::mutation::ledger::DiffMetric> {
        let mut ledger = self.ledger.lock().unwrap_or_else(|p| p.into_inner());
        let metric = ledger.record(operation, file_path.to_path_buf(), lines_changed, lines_total, backup_path, crate::utils::get_utc_timestamp());
        ledger.save(&self.ledger_path)?;
        Ok(metric)
    }

    fn refresh_index(&self) -> MutationResult<()> {
        let updater = IncrementalUpdater::new(self.settings.clone(), self.vectorizer.clone());
        let (_, graph) = updater
            .update(&self.root, self.store, self.vector_store, DETERMINISTIC_MODEL_NAME)
            .map_err(|e| MutationError::Io {
                path: self.root.clone(),
                source: std::io::Error::other(e.to_string()),
            })?;
        *self.refreshed_graph.lock().unwrap_or_else(|p| p.into_inner()) = Some(graph);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;
    use crate::vector::VectorStore;
    use tempfile::TempDir;

    fn write_project(dir: &Path) -> PathBuf {
        let file_path = dir.join("sample.py");
        std::fs::write(&file_path, "def old_implementation():\n    return \"old\"\n\ndef keep_this():\n    pass\n").unwrap();
        file_path
    }

    #[test]
    fn edit_replaces_only_the_target_symbol() {
        let dir = TempDir::new().unwrap();
        let file_path = write_project(dir.path());

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let store = IndexStore::open(dir.path().join(".cerberus").join("index.db")).unwrap();
        let vector_store = VectorStore::new(64);
        let builder = crate::indexing::IndexBuilder::new(settings.clone());
        builder.full_build(dir.path(), &store).unwrap();

        let graph = CodeGraph::new();
        let engine = MutationEngine::new(&store, &vector_store, &graph, settings, dir.path().to_path_buf()).unwrap();

        let options = MutationOptions {
            dry_run: false,
            preserve_indentation: true,
            run_syntax_check: true,
            backup: true,
            force: false,
            expected_kind: None,
        };

        let outcome = engine
            .edit_symbol(&file_path, "old_implementation", "def old_implementation():\n    return \"new\"\n", &options)
            .unwrap();

        assert_eq!(outcome.operation, MutationOperation::Edit);
        assert!(outcome.backup_path.is_some());

        let modified = std::fs::read_to_string(&file_path).unwrap();
        assert!(modified.contains("\"new\""));
        assert!(modified.contains("keep_this"));
    }

    #[test]
    fn edit_of_missing_symbol_fails() {
        let dir = TempDir::new().unwrap();
        let file_path = write_project(dir.path());

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let store = IndexStore::open(dir.path().join(".cerberus").join("index.db")).unwrap();
        let vector_store = VectorStore::new(64);
        let builder = crate::indexing::IndexBuilder::new(settings.clone());
        builder.full_build(dir.path(), &store).unwrap();

        let graph = CodeGraph::new();
        let engine = MutationEngine::new(&store, &vector_store, &graph, settings, dir.path().to_path_buf()).unwrap();

        let options = MutationOptions {
            dry_run: false,
            preserve_indentation: true,
            run_syntax_check: true,
            backup: false,
            force: false,
            expected_kind: None,
        };

        let err = engine.edit_symbol(&file_path, "nonexistent", "def nonexistent(): pass\n", &options).unwrap_err();
        assert!(matches!(err, MutationError::SymbolNotFound { .. }));
    }

    #[test]
    fn dry_run_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let file_path = write_project(dir.path());
        let original = std::fs::read_to_string(&file_path).unwrap();

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let store = IndexStore::open(dir.path().join(".cerberus").join("index.db")).unwrap();
        let vector_store = VectorStore::new(64);
        let builder = crate::indexing::IndexBuilder::new(settings.clone());
        builder.full_build(dir.path(), &store).unwrap();

        let graph = CodeGraph::new();
        let engine = MutationEngine::new(&store, &vector_store, &graph, settings, dir.path().to_path_buf()).unwrap();

        let options = MutationOptions {
            dry_run: true,
            preserve_indentation: true,
            run_syntax_check: true,
            backup: false,
            force: false,
            expected_kind: None,
        };

        engine
            .edit_symbol(&file_path, "old_implementation", "def old_implementation():\n    return \"new\"\n", &options)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), original);
    }

    #[test]
    fn delete_removes_only_the_target_symbol() {
        let dir = TempDir::new().unwrap();
        let file_path = write_project(dir.path());

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let store = IndexStore::open(dir.path().join(".cerberus").join("index.db")).unwrap();
        let vector_store = VectorStore::new(64);
        let builder = crate::indexing::IndexBuilder::new(settings.clone());
        builder.full_build(dir.path(), &store).unwrap();

        let graph = CodeGraph::new();
        let engine = MutationEngine::new(&store, &vector_store, &graph, settings, dir.path().to_path_buf()).unwrap();

        let options = MutationOptions {
            dry_run: false,
            preserve_indentation: true,
            run_syntax_check: true,
            backup: false,
            force: false,
            expected_kind: None,
        };

        let outcome = engine.delete_symbol(&file_path, "old_implementation", &options).unwrap();
        assert_eq!(outcome.operation, MutationOperation::Delete);

        let modified = std::fs::read_to_string(&file_path).unwrap();
        assert!(!modified.contains("old_implementation"));
        assert!(modified.contains("keep_this"));
    }

    #[test]
    fn edit_leaves_a_refreshed_graph_for_the_caller_to_pick_up() {
        let dir = TempDir::new().unwrap();
        let file_path = write_project(dir.path());

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let store = IndexStore::open(dir.path().join(".cerberus").join("index.db")).unwrap();
        let vector_store = VectorStore::new(64);
        let builder = crate::indexing::IndexBuilder::new(settings.clone());
        builder.full_build(dir.path(), &store).unwrap();

        let graph = CodeGraph::new();
        let engine = MutationEngine::new(&store, &vector_store, &graph, settings, dir.path().to_path_buf()).unwrap();

        assert!(engine.take_refreshed_graph().is_none());

        let options = MutationOptions {
            dry_run: false,
            preserve_indentation: true,
            run_syntax_check: true,
            backup: false,
            force: false,
            expected_kind: None,
        };
        engine
            .edit_symbol(&file_path, "old_implementation", "def old_implementation():\n    return \"new\"\n", &options)
            .unwrap();

        let refreshed = engine.take_refreshed_graph();
        assert!(refreshed.is_some());
        // Consumed once; a second take without another mutation is empty.
        assert!(engine.take_refreshed_graph().is_none());
    }
}
