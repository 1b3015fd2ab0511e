//! Scenario 1: a small Python file with one class and one free function.

use cerberus::config::Settings;
use cerberus::indexing::IndexBuilder;
use cerberus::retrieval::{FusionStrategy, HybridRetriever, QueryMode};
use cerberus::storage::IndexStore;
use cerberus::types::ReferenceKind;
use cerberus::vector::DeterministicVectorizer;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn method_is_found_and_ranked_and_linked_to_its_caller() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("a.py"),
        "class C:\n    def m(self):\n        pass\n\ndef f():\n    c = C()\n    c.m()\n",
    )
    .unwrap();

    let settings = Arc::new(Settings::default());
    let store = IndexStore::open(dir.path().join("index")).unwrap();
    let builder = IndexBuilder::new(settings.clone());
    let (_report, graph) = builder.full_build(dir.path(), &store).unwrap();

    let found = store.find_symbol_by_name("m").unwrap();
    assert_eq!(found.len(), 1);
    let m = &found[0];
    assert_eq!(m.kind.as_str(), "method");
    assert_eq!(m.range.start_line, 2);
    assert_eq!(m.range.end_line, 3);

    let vector_store = cerberus::vector::VectorStore::new(64);
    let vectorizer = DeterministicVectorizer::new(64);
    let retriever = HybridRetriever::new(&store, &vector_store, &vectorizer, settings);
    let hits = retriever.search("m", QueryMode::Keyword, 5, FusionStrategy::ReciprocalRank).unwrap();
    assert_eq!(hits[0].symbol.name.as_ref(), "m");

    let f = store.find_symbol_by_name("f").unwrap().remove(0);
    let refs = store
        .query_symbol_references_filtered(Some(f.id), None, Some(ReferenceKind::Calls))
        .unwrap();
    let edge = refs.iter().find(|r| r.target_symbol == m.id).expect("f -> C.m calls edge");
    assert!(edge.confidence >= 0.9);

    // The graph built alongside the store carries the same edge.
    let callees = graph.neighbors(f.id, cerberus::types::GraphDirection::Forward, Some(ReferenceKind::Calls));
    assert!(callees.contains(&m.id));
}
