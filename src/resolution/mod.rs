//! Resolution engine (§4.C): turns the name-based facts extracted by parsing
//! (`ImportLink`, `MethodCall`, class `bases`) into confidence-scored
//! `SymbolReference` edges, best-effort throughout — nothing here raises a
//! hard error for an unresolved reference, everything is counted instead
//! (§4.C failure semantics, §9 "counters over exceptions for expected
//! misses").
//!
//! Re-resolution is global on every build/update rather than scoped to
//! changed files: an edit to one file can change what a symbol in an
//! unrelated file resolves to (a newly added class, a renamed import target),
//! and the store is small enough that a full pass is cheap relative to
//! parsing (see SPEC_FULL.md §C).

pub mod call_graph;
pub mod imports;
pub mod inheritance;
pub mod methods;
pub mod types_pass;

pub use inheritance::compute_mro;

use crate::error::StorageResult;
use crate::storage::{CodeGraph, IndexStore};

/// Tallies from one resolution pass (§4.C, §6 build/update reports).
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolutionCounters {
    pub imports_resolved: usize,
    pub imports_unresolved: usize,
    pub methods_resolved: usize,
    pub methods_unresolved: usize,
    pub inherits_resolved: usize,
    pub inherits_unresolved: usize,
    pub mro_cycles: usize,
}

impl ResolutionCounters {
    pub fn import_ratio(&self) -> f32 {
        ratio(self.imports_resolved, self.imports_unresolved)
    }

    pub fn method_ratio(&self) -> f32 {
        ratio(self.methods_resolved, self.methods_unresolved)
    }

    pub fn inherits_ratio(&self) -> f32 {
        ratio(self.inherits_resolved, self.inherits_unresolved)
    }
}

fn ratio(resolved: usize, unresolved: usize) -> f32 {
    let total = resolved + unresolved;
    if total == 0 {
        1.0
    } else {
        resolved as f32 / total as f32
    }
}

/// Runs the full resolution pipeline over everything currently committed to
/// `store`: imports, then method calls (which depend on the per-file type
/// map built from type annotations), then inheritance, then the MRO
/// cycle-detection pass over the resulting graph. All resolved rows replace
/// whatever was previously stored for their table in one transaction
/// (§4.D "delete-then-rewrite"), so a resolution run is idempotent.
pub fn run_pipeline(store: &IndexStore) -> StorageResult<(ResolutionCounters, CodeGraph)> {
    let mut counters = ResolutionCounters::default();

    let import_links = imports::resolve_imports(store, &mut counters)?;

    let mut txn = store.transaction()?;
    txn.replace_all_import_links(&import_links)?;
    txn.commit()?;

    let method_refs = methods::resolve_method_calls(store, &mut counters)?;
    let inherits_refs = inheritance::resolve_inheritance(store, &mut counters)?;

    let mut all_refs = method_refs;
    all_refs.extend(inherits_refs);

    let mut txn = store.transaction()?;
    txn.replace_all_symbol_references(&all_refs)?;
    txn.commit()?;

    let graph = call_graph::build_graph(&all_refs);
    inheritance::count_mro_cycles(store, &graph, &mut counters)?;

    Ok((counters, graph))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_one_when_nothing_attempted() {
        let counters = ResolutionCounters::default();
        assert_eq!(counters.import_ratio(), 1.0);
    }

    #[test]
    fn ratio_reflects_resolved_fraction() {
        let counters = ResolutionCounters {
            methods_resolved: 3,
            methods_unresolved: 1,
            ..Default::default()
        };
        assert_eq!(counters.method_ratio(), 0.75);
    }
}
