//! Per-file name→type map (§4.C.2), feeding method-call resolution (§4.C.3).

use crate::error::StorageResult;
use crate::model::{base_type_name, TypeInfoSource};
use crate::storage::IndexStore;
use crate::types::FileId;
use std::collections::HashMap;

/// Maps a variable/field/return-slot name to its base type name (generics
/// and module qualifiers stripped), preferring an explicit annotation over
/// a constructor-inferred type when both exist for the same name.
pub fn build_type_map(store: &IndexStore, file_id: FileId) -> StorageResult<HashMap<Box<str>, Box<str>>> {
    let infos = store.query_type_infos(file_id)?;
    let mut map: HashMap<Box<str>, (Box<str>, TypeInfoSource)> = HashMap::new();

    for info in infos {
        let base: Box<str> = base_type_name(&info.type_name).into();
        let should_replace = match map.get(&info.name) {
            None => true,
            Some((_, existing_source)) => {
                matches!(info.source, TypeInfoSource::Annotation)
                    && !matches!(existing_source, TypeInfoSource::Annotation)
            }
        };
        if should_replace {
            map.insert(info.name.clone(), (base, info.source));
        }
    }

    Ok(map.into_iter().map(|(name, (ty, _))| (name, ty)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;
    use crate::model::TypeInfo;
    use crate::types::SymbolId;
    use tempfile::TempDir;

    #[test]
    fn annotation_wins_over_inferred_for_same_name() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let file_id = FileId::new(1).unwrap();

        let mut txn = store.transaction().unwrap();
        txn.write_type_infos_batch(&[
            TypeInfo {
                file_id,
                name: "optimizer".into(),
                type_name: "object".into(),
                line: 1,
                source: TypeInfoSource::Inferred,
                scope_symbol: SymbolId::new(1),
            },
            TypeInfo {
                file_id,
                name: "optimizer".into(),
                type_name: "torch.optim.Adam".into(),
                line: 2,
                source: TypeInfoSource::Annotation,
                scope_symbol: SymbolId::new(1),
            },
        ])
        .unwrap();
        txn.commit().unwrap();

        let map = build_type_map(&store, file_id).unwrap();
        assert_eq!(map.get("optimizer").map(|b| b.as_ref()), Some("Adam"));
    }
}
