//! Scenario 4: diamond inheritance (`class D(B, C)`, both deriving from `A`)
//! linearizes by C3, and descendants of `A` are found by walking `Inherits`
//! edges against the grain.

use cerberus::config::Settings;
use cerberus::indexing::IndexBuilder;
use cerberus::storage::IndexStore;
use cerberus::types::{GraphDirection, ReferenceKind};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn diamond_hierarchy_linearizes_and_reports_all_descendants() {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("hierarchy.py"),
        "class A:\n    pass\n\nclass B(A):\n    pass\n\nclass C(A):\n    pass\n\nclass D(B, C):\n    pass\n",
    )
    .unwrap();

    let index_dir = TempDir::new().unwrap();
    let store = IndexStore::open(index_dir.path().join("index")).unwrap();
    let settings = Arc::new(Settings::default());
    let (_report, graph) = IndexBuilder::new(settings).full_build(project.path(), &store).unwrap();

    let id_of = |name: &str| store.find_symbol_by_name(name).unwrap().remove(0).id;
    let (a, b, c, d) = (id_of("A"), id_of("B"), id_of("C"), id_of("D"));

    let mro = cerberus::resolution::compute_mro(&graph, d).unwrap();
    assert_eq!(mro, vec![d, b, c, a]);

    // Descendants of A: BFS against the Inherits edge direction.
    let mut descendants = HashSet::new();
    let mut frontier = vec![a];
    while let Some(node) = frontier.pop() {
        for child in graph.neighbors(node, GraphDirection::Reverse, Some(ReferenceKind::Inherits)) {
            if descendants.insert(child) {
                frontier.push(child);
            }
        }
    }
    assert_eq!(descendants, HashSet::from([b, c, d]));
}
