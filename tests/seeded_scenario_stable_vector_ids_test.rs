//! Scenario 2: a symbol's vector-id and score against a fixed probe survive
//! an incremental update that only touches a different file.

use cerberus::config::Settings;
use cerberus::indexing::{IncrementalUpdater, IndexBuilder};
use cerberus::storage::IndexStore;
use cerberus::vector::{symbol_embedding_text, DeterministicVectorizer, VectorStore, Vectorizer, VECTOR_DIMENSION_DEFAULT};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn vector_id_and_score_survive_an_update_to_an_unrelated_file() {
    let project = TempDir::new().unwrap();
    std::fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();
    std::fs::write(project.path().join("b.py"), "def g():\n    pass\n").unwrap();

    let index_dir = TempDir::new().unwrap();
    let store = IndexStore::open(index_dir.path().join("index")).unwrap();
    let settings = Arc::new(Settings::default());
    let builder = IndexBuilder::new(settings.clone());
    builder.full_build(project.path(), &store).unwrap();

    let vectorizer = DeterministicVectorizer::new(VECTOR_DIMENSION_DEFAULT);
    let vector_store = VectorStore::new(VECTOR_DIMENSION_DEFAULT);
    builder.vectorize(&store, &vector_store, &vectorizer, "deterministic-trigram").unwrap();

    let g = store.find_symbol_by_name("g").unwrap().remove(0);
    let probe = vectorizer.embed(&symbol_embedding_text(&g)).unwrap();

    let before = vector_store.search(&probe, 1).unwrap();
    let (before_score, before_id) = before[0];
    assert_eq!(store.find_symbol_by_vector_id(before_id).unwrap().unwrap().id, g.id);

    std::thread::sleep(std::time::Duration::from_millis(10));
    std::fs::write(project.path().join("a.py"), "def a():\n    return 1\n").unwrap();
    let updater = IncrementalUpdater::new(settings, Arc::new(vectorizer));
    updater.update(project.path(), &store, &vector_store, "deterministic-trigram").unwrap();

    let after = vector_store.search(&probe, 1).unwrap();
    let (after_score, after_id) = after[0];

    assert_eq!(before_id, after_id);
    assert!((before_score - after_score).abs() < 1e-6);
}
