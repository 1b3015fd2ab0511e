//! Inheritance resolution (§4.C.4) and C3-linearized MRO computation (§4.C.5).

use super::ResolutionCounters;
use crate::error::{ResolutionAmbiguity, StorageResult};
use crate::model::SymbolReference;
use crate::storage::{CodeGraph, IndexStore};
use crate::types::{GraphDirection, ReferenceKind, SymbolId};
use crate::Symbol;
use std::collections::HashSet;

pub fn resolve_inheritance(store: &IndexStore, counters: &mut ResolutionCounters) -> StorageResult<Vec<SymbolReference>> {
    let mut refs = Vec::new();

    for file in store.query_files()? {
        let symbols: Vec<Symbol> = store.query_symbols(Some(file.id), 1000)?.collect();
        let import_links = store.query_import_links(Some(file.id))?;

        for class_symbol in symbols.iter().filter(|s| s.kind.is_class_like() && !s.bases.is_empty()) {
            for base_name in &class_symbol.bases {
                let local = symbols
                    .iter()
                    .find(|s| s.kind.is_class_like() && s.id != class_symbol.id && s.name.as_ref() == base_name.as_ref());

                if let Some(base_symbol) = local {
                    refs.push(SymbolReference::new(
                        file.id,
                        class_symbol.range.start_line,
                        class_symbol.id,
                        file.id,
                        base_symbol.id,
                        ReferenceKind::Inherits,
                        1.0,
                        "inherits_local_scope",
                    ));
                    counters.inherits_resolved += 1;
                    continue;
                }

                let via_import = import_links.iter().find(|link| {
                    link.is_resolved()
                        && (link.imported_symbols.iter().any(|s| s.as_ref() == base_name.as_ref())
                            || link.alias.as_deref() == Some(base_name.as_ref()))
                });

                if let Some(link) = via_import {
                    if let (Some(def_file), Some(def_symbol)) = (link.definition_file, link.definition_symbol) {
                        refs.push(SymbolReference::new(
                            file.id,
                            class_symbol.range.start_line,
                            class_symbol.id,
                            def_file,
                            def_symbol,
                            ReferenceKind::Inherits,
                            0.8,
                            "inherits_via_import",
                        ));
                        counters.inherits_resolved += 1;
                        continue;
                    }
                }

                counters.inherits_unresolved += 1;
            }
        }
    }

    Ok(refs)
}

/// C3 linearization of `symbol_id`'s method resolution order, walking
/// `Inherits` edges in `graph`. Cycle-safe via an insert/remove visited guard
/// (§9 "never recurse unbounded"); legitimate diamond revisits (the same
/// ancestor reached through two base paths) are fine, a revisit of a symbol
/// still on the current DFS stack is reported as a cycle.
pub fn compute_mro(graph: &CodeGraph, symbol_id: SymbolId) -> Result<Vec<SymbolId>, ResolutionAmbiguity> {
    let mut seen = HashSet::new();
    linearize(graph, symbol_id, &mut seen)
}

fn linearize(graph: &CodeGraph, symbol_id: SymbolId, seen: &mut HashSet<SymbolId>) -> Result<Vec<SymbolId>, ResolutionAmbiguity> {
    if !seen.insert(symbol_id) {
        return Err(ResolutionAmbiguity::InheritanceCycle(symbol_id));
    }

    // `CodeGraph::neighbors` walks petgraph's per-node adjacency list, which
    // yields edges in reverse insertion order; reverse back so the base list
    // matches declaration order (`class D(B, C)` -> [B, C], not [C, B]).
    let mut bases = graph.neighbors(symbol_id, GraphDirection::Forward, Some(ReferenceKind::Inherits));
    bases.reverse();

    if bases.is_empty() {
        seen.remove(&symbol_id);
        return Ok(vec![symbol_id]);
    }

    let mut base_linearizations = Vec::with_capacity(bases.len());
    for base in &bases {
        base_linearizations.push(linearize(graph, *base, seen)?);
    }

    seen.remove(&symbol_id);

    let merged = c3_merge(base_linearizations, bases)
        .ok_or(ResolutionAmbiguity::InheritanceCycle(symbol_id))?;

    let mut result = vec![symbol_id];
    result.extend(merged);
    Ok(result)
}

/// Standard C3 merge: repeatedly take the head of the first list that does
/// not appear in the tail of any other list.
fn c3_merge(mut lists: Vec<Vec<SymbolId>>, base_order: Vec<SymbolId>) -> Option<Vec<SymbolId>> {
    lists.push(base_order);
    let mut result = Vec::new();

    loop {
        lists.retain(|l| !l.is_empty());
        if lists.is_empty() {
            return Some(result);
        }

        let mut chosen = None;
        for candidate_list in &lists {
            let candidate = candidate_list[0];
            let in_any_tail = lists.iter().any(|l| l[1..].contains(&candidate));
            if !in_any_tail {
                chosen = Some(candidate);
                break;
            }
        }

        let candidate = chosen?;
        result.push(candidate);
        for list in &mut lists {
            list.retain(|s| *s != candidate);
        }
    }
}

/// Runs `compute_mro` over every class-like symbol in the store, counting
/// cycles into `counters.mro_cycles` (§4.C.5 "count, never raise").
pub fn count_mro_cycles(store: &IndexStore, graph: &CodeGraph, counters: &mut ResolutionCounters) -> StorageResult<()> {
    let mut cursor = store.query_symbols(None, 1000)?;
    loop {
        let batch = cursor.next_batch();
        if batch.is_empty() {
            break;
        }
        for symbol in batch.iter().filter(|s| s.kind.is_class_like()) {
            if compute_mro(graph, symbol.id).is_err() {
                counters.mro_cycles += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u32) -> SymbolId {
        SymbolId::new(n).unwrap()
    }

    /// `class D(B, C)`, `class B(A)`, `class C(A)`, `class A()` -> `[D, B, C, A]`.
    #[test]
    fn diamond_inheritance_linearizes_to_expected_mro() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(4), sid(2), ReferenceKind::Inherits); // D -> B
        graph.add_edge(sid(4), sid(3), ReferenceKind::Inherits); // D -> C
        graph.add_edge(sid(2), sid(1), ReferenceKind::Inherits); // B -> A
        graph.add_edge(sid(3), sid(1), ReferenceKind::Inherits); // C -> A

        let mro = compute_mro(&graph, sid(4)).unwrap();
        assert_eq!(mro, vec![sid(4), sid(2), sid(3), sid(1)]);
    }

    #[test]
    fn self_referential_inheritance_is_reported_as_cycle() {
        let graph = CodeGraph::new();
        graph.add_edge(sid(1), sid(2), ReferenceKind::Inherits);
        graph.add_edge(sid(2), sid(1), ReferenceKind::Inherits);

        let result = compute_mro(&graph, sid(1));
        assert!(matches!(result, Err(ResolutionAmbiguity::InheritanceCycle(_))));
    }

    #[test]
    fn no_bases_linearizes_to_self_only() {
        let graph = CodeGraph::new();
        graph.add_symbol(sid(1));
        assert_eq!(compute_mro(&graph, sid(1)).unwrap(), vec![sid(1)]);
    }
}
