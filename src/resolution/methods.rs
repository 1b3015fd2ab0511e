//! Method-call resolution (§4.C.3): `MethodCall` -> `SymbolReference(calls)`.

use super::types_pass::build_type_map;
use super::ResolutionCounters;
use crate::error::StorageResult;
use crate::model::SymbolReference;
use crate::storage::IndexStore;
use crate::types::{ReferenceKind, SymbolId, SymbolKind};
use crate::Symbol;

const SELF_NAMES: &[&str] = &["self", "this"];

pub fn resolve_method_calls(store: &IndexStore, counters: &mut ResolutionCounters) -> StorageResult<Vec<SymbolReference>> {
    let mut refs = Vec::new();

    for file in store.query_files()? {
        let type_map = build_type_map(store, file.id)?;
        let symbols: Vec<Symbol> = store.query_symbols(Some(file.id), 1000)?.collect();
        let calls = store.query_method_calls_filtered(None, Some(file.id))?;

        for call in calls {
            let Some(caller_symbol) = call.caller_symbol else {
                counters.methods_unresolved += 1;
                continue;
            };

            let receiver_head = call.receiver_head();
            let resolved_type_name = if SELF_NAMES.contains(&receiver_head) {
                enclosing_class(&symbols, caller_symbol).map(|c| c.name.to_string())
            } else {
                type_map.get(receiver_head).map(|t| t.to_string())
            };

            let owner_class = resolved_type_name
                .as_deref()
                .and_then(|type_name| symbols.iter().find(|s| s.kind.is_class_like() && s.name.as_ref() == type_name));

            if let Some(class_symbol) = owner_class {
                if let Some(method) = find_method_in_class(&symbols, class_symbol, &call.method_name) {
                    refs.push(SymbolReference::new(
                        call.caller_file,
                        call.line,
                        caller_symbol,
                        file.id,
                        method.id,
                        ReferenceKind::Calls,
                        0.9,
                        "method_receiver_type",
                    ));
                    counters.methods_resolved += 1;
                    continue;
                }
            }

            if let Some(direct) = symbols
                .iter()
                .find(|s| s.name.as_ref() == receiver_head && matches!(s.kind, SymbolKind::Module | SymbolKind::Function))
            {
                refs.push(SymbolReference::new(
                    call.caller_file,
                    call.line,
                    caller_symbol,
                    file.id,
                    direct.id,
                    ReferenceKind::Calls,
                    0.4,
                    "receiver_name_match",
                ));
                counters.methods_resolved += 1;
                continue;
            }

            counters.methods_unresolved += 1;
        }
    }

    Ok(refs)
}

/// Smallest class-like symbol in the same file whose span contains `inner`
/// (§4.C.3 "honoring `self` -> enclosing-class scope").
fn enclosing_class(symbols: &[Symbol], inner: SymbolId) -> Option<&Symbol> {
    let inner_symbol = symbols.iter().find(|s| s.id == inner)?;
    symbols
        .iter()
        .filter(|s| s.kind.is_class_like() && s.id != inner_symbol.id)
        .filter(|s| {
            s.range.start_line <= inner_symbol.range.start_line && s.range.end_line >= inner_symbol.range.end_line
        })
        .min_by_key(|s| s.range.end_line - s.range.start_line)
}

fn find_method_in_class<'a>(symbols: &'a [Symbol], class_symbol: &Symbol, method_name: &str) -> Option<&'a Symbol> {
    symbols
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Method | SymbolKind::Function))
        .filter(|s| s.name.as_ref() == method_name && s.id != class_symbol.id)
        .find(|s| s.range.start_line >= class_symbol.range.start_line && s.range.end_line <= class_symbol.range.end_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodCall, TypeInfo, TypeInfoSource};
    use crate::storage::IndexStore;
    use crate::types::{FileId, Language, Range};
    use tempfile::TempDir;

    fn sym(id: u32, name: &str, kind: SymbolKind, start: u32, end: u32) -> Symbol {
        Symbol::new(
            SymbolId::new(id).unwrap(),
            name,
            kind,
            FileId::new(1).unwrap(),
            Language::Python,
            Range::new(start, 0, end, 0),
        )
    }

    #[test]
    fn resolves_self_dot_method_to_enclosing_class_method() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let file_id = FileId::new(1).unwrap();

        let class_sym = sym(1, "Trainer", SymbolKind::Class, 1, 20);
        let init_method = sym(2, "__init__", SymbolKind::Method, 2, 5);
        let step_method = sym(3, "step", SymbolKind::Method, 6, 10);

        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[class_sym, init_method.clone(), step_method]).unwrap();
        txn.write_method_calls_batch(&[MethodCall {
            caller_file: file_id,
            caller_symbol: Some(init_method.id),
            receiver_expression: "self".into(),
            method_name: "step".into(),
            line: 3,
        }])
        .unwrap();
        txn.commit().unwrap();

        let mut counters = ResolutionCounters::default();
        let refs = resolve_method_calls(&store, &mut counters).unwrap();
        assert_eq!(counters.methods_resolved, 1);
        assert_eq!(refs[0].target_symbol, SymbolId::new(3).unwrap());
        assert!(refs[0].confidence >= 0.9);
    }

    #[test]
    fn resolves_typed_receiver_via_annotation() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let file_id = FileId::new(1).unwrap();

        let class_sym = sym(1, "Adam", SymbolKind::Class, 1, 20);
        let method_sym = sym(2, "step", SymbolKind::Method, 2, 5);
        let caller_sym = sym(3, "train", SymbolKind::Function, 30, 40);

        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[class_sym, method_sym, caller_sym.clone()]).unwrap();
        txn.write_type_infos_batch(&[TypeInfo {
            file_id,
            name: "optimizer".into(),
            type_name: "Adam".into(),
            line: 31,
            source: TypeInfoSource::Annotation,
            scope_symbol: Some(caller_sym.id),
        }])
        .unwrap();
        txn.write_method_calls_batch(&[MethodCall {
            caller_file: file_id,
            caller_symbol: Some(caller_sym.id),
            receiver_expression: "optimizer".into(),
            method_name: "step".into(),
            line: 32,
        }])
        .unwrap();
        txn.commit().unwrap();

        let mut counters = ResolutionCounters::default();
        let refs = resolve_method_calls(&store, &mut counters).unwrap();
        assert_eq!(counters.methods_resolved, 1);
        assert_eq!(refs[0].target_symbol, SymbolId::new(2).unwrap());
    }
}
