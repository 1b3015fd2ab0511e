//! Builds the in-memory `CodeGraph` from resolved `SymbolReference`s (§4.C.7).

use crate::model::SymbolReference;
use crate::storage::CodeGraph;

pub fn build_graph(refs: &[SymbolReference]) -> CodeGraph {
    let graph = CodeGraph::new();
    for reference in refs {
        graph.add_edge(reference.source_symbol, reference.target_symbol, reference.kind);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileId, GraphDirection, ReferenceKind, SymbolId};

    #[test]
    fn builds_edges_from_references() {
        let refs = vec![SymbolReference::new(
            FileId::new(1).unwrap(),
            3,
            SymbolId::new(1).unwrap(),
            FileId::new(1).unwrap(),
            SymbolId::new(2).unwrap(),
            ReferenceKind::Calls,
            0.9,
            "method_receiver_type",
        )];
        let graph = build_graph(&refs);
        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph.neighbors(SymbolId::new(1).unwrap(), GraphDirection::Forward, None),
            vec![SymbolId::new(2).unwrap()]
        );
    }
}
