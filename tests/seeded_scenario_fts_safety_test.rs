//! Scenario 3: Tantivy query-syntax characters never surface as engine
//! errors from `fts_search`, and boolean operators are not quoted away.

use cerberus::config::Settings;
use cerberus::indexing::IndexBuilder;
use cerberus::storage::IndexStore;
use std::sync::Arc;
use tempfile::TempDir;

fn build_nonempty_index() -> (TempDir, IndexStore) {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("a.py"),
        "def parse(text):\n    \"\"\"Parses a func() call with a decorator.\"\"\"\n    return text\n",
    )
    .unwrap();

    let index_dir = TempDir::new().unwrap();
    let store = IndexStore::open(index_dir.path().join("index")).unwrap();
    let settings = Arc::new(Settings::default());
    IndexBuilder::new(settings).full_build(project.path(), &store).unwrap();
    (index_dir, store)
}

#[test]
fn special_characters_never_raise_an_engine_syntax_error() {
    let (_dir, store) = build_nonempty_index();
    for query in ["@decorator", "func()", "name:value", "a^b", "\"unterminated", "a+b-c*d"] {
        let result = store.fts_search(query, 10);
        assert!(result.is_ok(), "query {query:?} should not raise an engine error");
    }
}

#[test]
fn boolean_operators_are_interpreted_not_quoted() {
    let (_dir, store) = build_nonempty_index();
    let hits = store.fts_search("function AND parse", 10).unwrap();
    // A literal-quoted "function AND parse" phrase would never match this
    // file; interpreted as a boolean query over "parse" it does.
    assert!(hits.iter().any(|(s, _)| s.name.as_ref() == "parse"));
}
