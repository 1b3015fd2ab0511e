//! The public library surface (§6 "Library surface"): free functions over
//! an `IndexHandle`, one per operation the section lists. This is the layer
//! a CLI or MCP host would call; none of it is exposed here (§1 Non-goals).

use crate::error::{IndexResult, MutationResult};
use crate::handle::IndexHandle;
use crate::indexing::{BuildReport, UpdateReport};
use crate::mutation::{MutationEngine, MutationOptions, MutationOutcome};
use crate::retrieval::{FusionStrategy, Hit, HybridRetriever, QueryMode};
use crate::storage::StoreStats;
use crate::types::{GraphDirection, ReferenceKind, SymbolId};
use crate::vector::Vectorizer;
use crate::config::Settings;
use crate::Symbol;
use std::path::Path;
use std::sync::Arc;

/// `build_index(root, output_dir, opts) -> IndexHandle`.
pub fn build_index(root: &Path, settings: Arc<Settings>, vectorizer: Option<Arc<dyn Vectorizer>>) -> IndexResult<(IndexHandle, BuildReport)> {
    IndexHandle::build(root, settings, vectorizer)
}

/// `load_index(path) -> IndexHandle`.
pub fn load_index(root: &Path, settings: Arc<Settings>, vectorizer: Option<Arc<dyn Vectorizer>>) -> IndexResult<IndexHandle> {
    IndexHandle::load(root, settings, vectorizer)
}

/// `update_index(handle, changes?) -> UpdateReport`. `changes` is not taken
/// as a parameter: the updater always re-derives its own change set by
/// rescanning `handle.root` (§4.F.1), so there is nothing for a caller-
/// supplied change list to add.
pub fn update_index(handle: &mut IndexHandle) -> IndexResult<UpdateReport> {
    handle.update()
}

/// `hybrid_search(handle, query, mode, top_k) -> list<Hit>`.
pub fn hybrid_search(handle: &IndexHandle, query: &str, mode: QueryMode, top_k: usize) -> IndexResult<Vec<Hit>> {
    let retriever = HybridRetriever::new(&handle.store, &handle.vector_store, handle.vectorizer.as_ref(), handle.settings.clone());
    retriever.search(query, mode, top_k, FusionStrategy::ReciprocalRank)
}

/// `find_symbol(handle, name) -> list<Symbol>`.
pub fn find_symbol(handle: &IndexHandle, name: &str) -> IndexResult<Vec<Symbol>> {
    Ok(handle.store.find_symbol_by_name(name)?)
}

/// `read_range(file, start, end, pad?) -> Snippet`.
pub fn read_range(file_path: &Path, start_line: u32, end_line: u32, pad: u32) -> IndexResult<crate::retrieval::Snippet> {
    let source = std::fs::read_to_string(file_path).map_err(|e| crate::error::IndexError::FileRead {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    let range = crate::types::Range::new(start_line, 0, end_line, 0);
    Ok(crate::retrieval::read_span(&source, range, pad))
}

/// `get_stats(handle) -> Stats`.
pub fn get_stats(handle: &IndexHandle) -> IndexResult<StoreStats> {
    Ok(handle.store.get_stats()?)
}

/// `mutate_edit(handle, file, symbol, new_code, opts) -> MutationResult`.
/// Refreshes `handle.graph` in place from the mutation's own index refresh,
/// so it never goes stale relative to the just-edited file.
pub fn mutate_edit(handle: &mut IndexHandle, file_path: &Path, symbol_name: &str, new_code: &str, options: &MutationOptions) -> MutationResult<MutationOutcome> {
    let engine = MutationEngine::with_vectorizer(&handle.store, &handle.vector_store, &handle.graph, handle.settings.clone(), handle.root.clone(), handle.vectorizer.clone())?;
    let outcome = engine.edit_symbol(file_path, symbol_name, new_code, options)?;
    if let Some(graph) = engine.take_refreshed_graph() {
        handle.graph = graph;
    }
    Ok(outcome)
}

/// `mutate_delete(handle, file, symbol, opts) -> MutationResult`. See
/// `mutate_edit` on the post-mutation graph refresh.
pub fn mutate_delete(handle: &mut IndexHandle, file_path: &Path, symbol_name: &str, options: &MutationOptions) -> MutationResult<MutationOutcome> {
    let engine = MutationEngine::with_vectorizer(&handle.store, &handle.vector_store, &handle.graph, handle.settings.clone(), handle.root.clone(), handle.vectorizer.clone())?;
    let outcome = engine.delete_symbol(file_path, symbol_name, options)?;
    if let Some(graph) = engine.take_refreshed_graph() {
        handle.graph = graph;
    }
    Ok(outcome)
}

/// `call_graph(handle, symbol, direction, max_depth) -> Graph`: the edges
/// leaving (or entering, for `Reverse`) every symbol within `max_depth` hops
/// of `symbol_id`, `symbol_id` itself included as the root.
pub fn call_graph(handle: &IndexHandle, symbol_id: SymbolId, direction: GraphDirection, max_depth: usize) -> Vec<(SymbolId, SymbolId, ReferenceKind)> {
    let mut nodes = handle.graph.reachable_within(symbol_id, direction, max_depth);
    nodes.push(symbol_id);

    let mut edges = Vec::new();
    for &node in &nodes {
        for (kind, others) in handle.graph.edges_by_kind(node, direction) {
            for other in others {
                let (from, to) = match direction {
                    GraphDirection::Forward => (node, other),
                    GraphDirection::Reverse => (other, node),
                };
                edges.push((from, to, kind));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_symbol_returns_indexed_functions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def handle_request():\n    return 1\n").unwrap();

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let (handle, _report) = build_index(dir.path(), settings, None).unwrap();
        let found = find_symbol(&handle, "handle_request").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn get_stats_counts_the_built_symbols() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "def a():\n    pass\n").unwrap();

        let mut settings = Settings::default();
        settings.data_dir = dir.path().join(".cerberus");
        let settings = Arc::new(settings);

        let (handle, _report) = build_index(dir.path(), settings, None).unwrap();
        let stats = get_stats(&handle).unwrap();
        assert!(stats.counts.values().sum::<usize>() > 0);
    }
}
