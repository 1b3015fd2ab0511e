//! Scenario 5: an edit that introduces a syntax error is rejected wholesale —
//! the file on disk is untouched and no ledger entry is appended.

use cerberus::config::Settings;
use cerberus::error::MutationError;
use cerberus::indexing::IndexBuilder;
use cerberus::mutation::{DiffLedger, MutationEngine, MutationOptions};
use cerberus::storage::{CodeGraph, IndexStore};
use cerberus::vector::VectorStore;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn syntax_broken_edit_leaves_the_file_and_ledger_untouched() {
    let project = TempDir::new().unwrap();
    let file_path = project.path().join("x.py");
    let original = "def foo(): return 1\n";
    std::fs::write(&file_path, original).unwrap();

    let mut settings = Settings::default();
    settings.data_dir = project.path().join(".cerberus");
    let settings = Arc::new(settings);

    let store = IndexStore::open(settings.data_dir.join("index.db")).unwrap();
    let builder = IndexBuilder::new(settings.clone());
    builder.full_build(project.path(), &store).unwrap();
    let vector_store = VectorStore::new(64);
    let graph = CodeGraph::new();

    let engine = MutationEngine::new(&store, &vector_store, &graph, settings.clone(), project.path().to_path_buf()).unwrap();
    let options = MutationOptions {
        dry_run: false,
        preserve_indentation: true,
        run_syntax_check: true,
        backup: false,
        force: false,
        expected_kind: None,
    };

    let err = engine
        .edit_symbol(&file_path, "foo", "def foo(:\n    return 2\n", &options)
        .expect_err("malformed replacement body must fail syntax validation");
    assert!(matches!(err, MutationError::SyntaxValidation { .. }));

    let bytes_after = std::fs::read(&file_path).unwrap();
    assert_eq!(bytes_after, original.as_bytes());

    let ledger_path = settings.data_dir.join("ledger.db");
    if ledger_path.exists() {
        let ledger = DiffLedger::open(&ledger_path).unwrap();
        assert_eq!(ledger.statistics().total_operations, 0);
    }
}
