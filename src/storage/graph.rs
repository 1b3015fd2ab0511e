//! In-memory call/inheritance graph (§4.C.7, §6 `call_graph`), adapted from
//! the teacher's `DependencyGraph`: a petgraph digraph keyed by `SymbolId`,
//! edges weighted by `ReferenceKind`, with depth-bounded traversal over an
//! explicit visited set rather than unbounded recursion (§9 "iterative
//! traversal with visited sets").

use crate::types::{GraphDirection, ReferenceKind, SymbolId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub kind: ReferenceKind,
}

/// Built once per build/update cycle from the committed `SymbolReference`
/// rows (§4.F) and held by the `IndexHandle` for `call_graph` queries.
#[derive(Debug)]
pub struct CodeGraph {
    graph: RwLock<DiGraph<SymbolId, GraphEdge>>,
    node_map: RwLock<HashMap<SymbolId, NodeIndex>>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            node_map: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_symbol(&self, symbol_id: SymbolId) -> NodeIndex {
        let mut graph = self.graph.write().unwrap();
        let mut node_map = self.node_map.write().unwrap();

        if let Some(&idx) = node_map.get(&symbol_id) {
            idx
        } else {
            let idx = graph.add_node(symbol_id);
            node_map.insert(symbol_id, idx);
            idx
        }
    }

    pub fn add_edge(&self, from: SymbolId, to: SymbolId, kind: ReferenceKind) {
        let from_idx = self.add_symbol(from);
        let to_idx = self.add_symbol(to);
        let mut graph = self.graph.write().unwrap();
        graph.add_edge(from_idx, to_idx, GraphEdge { kind });
    }

    pub fn remove_symbol(&self, symbol_id: SymbolId) {
        let mut graph = self.graph.write().unwrap();
        let mut node_map = self.node_map.write().unwrap();
        if let Some(idx) = node_map.remove(&symbol_id) {
            graph.remove_node(idx);
        }
    }

    /// Direct neighbors in `direction` (optionally filtered to one edge kind).
    pub fn neighbors(
        &self,
        symbol_id: SymbolId,
        direction: GraphDirection,
        kind: Option<ReferenceKind>,
    ) -> Vec<SymbolId> {
        let graph = self.graph.read().unwrap();
        let node_map = self.node_map.read().unwrap();
        let Some(&idx) = node_map.get(&symbol_id) else {
            return Vec::new();
        };

        let petgraph_dir = match direction {
            GraphDirection::Forward => petgraph::Direction::Outgoing,
            GraphDirection::Reverse => petgraph::Direction::Incoming,
        };

        graph
            .edges_directed(idx, petgraph_dir)
            .filter(|edge| kind.is_none_or(|k| edge.weight().kind == k))
            .filter_map(|edge| {
                let other = match direction {
                    GraphDirection::Forward => edge.target(),
                    GraphDirection::Reverse => edge.source(),
                };
                graph.node_weight(other).copied()
            })
            .collect()
    }

    /// BFS frontier-by-frontier from `start`, bounded by `max_depth`
    /// (§6 `call_graph` depth parameter). A visited set prevents revisiting
    /// nodes reachable by more than one path, so cyclic call graphs still
    /// terminate.
    pub fn traverse(
        &self,
        start: SymbolId,
        direction: GraphDirection,
        max_depth: usize,
    ) -> Vec<Vec<SymbolId>> {
        let graph = self.graph.read().unwrap();
        let node_map = self.node_map.read().unwrap();
        let mut levels = Vec::new();

        let Some(&start_idx) = node_map.get(&start) else {
            return levels;
        };

        let petgraph_dir = match direction {
            GraphDirection::Forward => petgraph::Direction::Outgoing,
            GraphDirection::Reverse => petgraph::Direction::Incoming,
        };

        let mut current = vec![start_idx];
        let mut visited = HashSet::new();
        visited.insert(start_idx);

        while !current.is_empty() && levels.len() < max_depth {
            let mut level_symbols = Vec::new();
            let mut next = Vec::new();

            for node_idx in current {
                if let Some(&symbol_id) = graph.node_weight(node_idx) {
                    level_symbols.push(symbol_id);
                    for edge in graph.edges_directed(node_idx, petgraph_dir) {
                        let other = match direction {
                            GraphDirection::Forward => edge.target(),
                            GraphDirection::Reverse => edge.source(),
                        };
                        if visited.insert(other) {
                            next.push(other);
                        }
                    }
                }
            }

            if !level_symbols.is_empty() {
                levels.push(level_symbols);
            }
            current = next;
        }

        levels
    }

    /// Everything reachable from `symbol_id` within `max_depth` hops,
    /// flattened (§6 `call_graph` "impact radius" use case).
    pub fn reachable_within(
        &self,
        symbol_id: SymbolId,
        direction: GraphDirection,
        max_depth: usize,
    ) -> Vec<SymbolId> {
        self.traverse(symbol_id, direction, max_depth)
            .into_iter()
            .skip(1)
            .flatten()
            .collect()
    }

    pub fn edges_by_kind(
        &self,
        symbol_id: SymbolId,
        direction: GraphDirection,
    ) -> HashMap<ReferenceKind, Vec<SymbolId>> {
        let graph = self.graph.read().unwrap();
        let node_map = self.node_map.read().unwrap();
        let mut out: HashMap<ReferenceKind, Vec<SymbolId>> = HashMap::new();

        let Some(&idx) = node_map.get(&symbol_id) else {
            return out;
        };
        let petgraph_dir = match direction {
            GraphDirection::Forward => petgraph::Direction::Outgoing,
            GraphDirection::Reverse => petgraph::Direction::Incoming,
        };

        for edge in graph.edges_directed(idx, petgraph_dir) {
            let other = match direction {
                GraphDirection::Forward => edge.target(),
                GraphDirection::Reverse => edge.source(),
            };
            if let Some(&other_id) = graph.node_weight(other) {
                out.entry(edge.weight().kind).or_default().push(other_id);
            }
        }
        out
    }

    pub fn clear(&self) {
        self.graph.write().unwrap().clear();
        self.node_map.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.node_map.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u32) -> SymbolId {
        SymbolId::new(n).unwrap()
    }

    #[test]
    fn add_symbol_is_idempotent() {
        let graph = CodeGraph::new();
        let a = graph.add_symbol(sid(1));
        let b = graph.add_symbol(sid(1));
        assert_eq!(a, b);
    }

    #[test]
    fn forward_and_reverse_neighbors() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(1), sid(2), ReferenceKind::Calls);

        assert_eq!(
            graph.neighbors(sid(1), GraphDirection::Forward, None),
            vec![sid(2)]
        );
        assert_eq!(
            graph.neighbors(sid(2), GraphDirection::Reverse, None),
            vec![sid(1)]
        );
        assert!(graph
            .neighbors(sid(1), GraphDirection::Forward, Some(ReferenceKind::Inherits))
            .is_empty());
    }

    #[test]
    fn traverse_respects_depth_and_cycles() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(1), sid(2), ReferenceKind::Calls);
        graph.add_edge(sid(2), sid(3), ReferenceKind::Calls);
        graph.add_edge(sid(3), sid(1), ReferenceKind::Calls); // cycle back to start

        let levels = graph.traverse(sid(1), GraphDirection::Forward, 5);
        assert_eq!(levels.len(), 3); // {1}, {2}, {3} — visited set stops the cycle
        assert_eq!(levels[0], vec![sid(1)]);
        assert_eq!(levels[2], vec![sid(3)]);
    }

    #[test]
    fn reachable_within_excludes_start() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(1), sid(2), ReferenceKind::Calls);
        graph.add_edge(sid(2), sid(3), ReferenceKind::Calls);

        let reachable = graph.reachable_within(sid(1), GraphDirection::Forward, 5);
        assert!(reachable.contains(&sid(2)));
        assert!(reachable.contains(&sid(3)));
        assert!(!reachable.contains(&sid(1)));
    }

    #[test]
    fn edges_by_kind_groups_correctly() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(1), sid(2), ReferenceKind::Calls);
        graph.add_edge(sid(1), sid(3), ReferenceKind::Inherits);

        let grouped = graph.edges_by_kind(sid(1), GraphDirection::Forward);
        assert_eq!(grouped.get(&ReferenceKind::Calls), Some(&vec![sid(2)]));
        assert_eq!(grouped.get(&ReferenceKind::Inherits), Some(&vec![sid(3)]));
    }
}
