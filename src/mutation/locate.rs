//! Step 1 of the mutation pipeline (§4.H "Locate"): resolve a symbol name to
//! its exact span in a file, and check the file is still byte-identical to
//! what the index saw before anything is rewritten.

use crate::error::{MutationError, MutationResult};
use crate::model::FileRecord;
use crate::storage::IndexStore;
use crate::types::SymbolKind;
use crate::utils::content_hash;
use crate::Symbol;
use std::path::Path;

/// A symbol resolved to a file plus the file's current on-disk bytes.
pub struct Located {
    pub symbol: Symbol,
    pub file: FileRecord,
    pub source: String,
}

/// Resolves `symbol_name` (optionally narrowed by `expected_kind`) to exactly
/// one symbol in `file_path`, reading the file's current content in the same
/// pass. `SymbolNotFound`/`AmbiguousSymbol` mirror §4.H's disambiguation
/// inputs; ambiguity is never silently resolved by picking the first match.
pub fn locate(store: &IndexStore, root: &Path, file_path: &Path, symbol_name: &str, expected_kind: Option<SymbolKind>) -> MutationResult<Located> {
    let repo_relative = crate::utils::repo_relative_path(root, file_path);
    let file = store
        .find_file_by_repo_path(&repo_relative)
        .map_err(|e| MutationError::Io {
            path: file_path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?
        .ok_or_else(|| MutationError::SymbolNotFound {
            path: file_path.to_path_buf(),
            name: symbol_name.to_string(),
        })?;

    let candidates: Vec<Symbol> = store
        .find_symbol_by_name(symbol_name)
        .map_err(|e| MutationError::Io {
            path: file_path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?
        .into_iter()
        .filter(|s| s.file_id == file.id)
        .filter(|s| expected_kind.is_none_or(|k| s.kind == k))
        .collect();

    let symbol = match candidates.len() {
        0 => {
            return Err(MutationError::SymbolNotFound {
                path: file_path.to_path_buf(),
                name: symbol_name.to_string(),
            })
        }
        1 => candidates.into_iter().next().unwrap(),
        count => {
            return Err(MutationError::AmbiguousSymbol {
                path: file_path.to_path_buf(),
                name: symbol_name.to_string(),
                candidate_count: count,
            })
        }
    };

    let source = std::fs::read_to_string(file_path).map_err(|e| MutationError::Io {
        path: file_path.to_path_buf(),
        source: e,
    })?;

    Ok(Located { symbol, file, source })
}

/// Optimistic lock check (§4.H step 1): fails if the file on disk has
/// changed since the index last saw it. Compared by content hash so a
/// touch-without-change (mtime bump, no byte change) does not false-positive.
pub fn check_unchanged(file: &FileRecord, source: &str, file_path: &Path) -> MutationResult<()> {
    let Some(recorded) = &file.content_hash else {
        return Ok(());
    };
    let current = content_hash(source.as_bytes());
    if current.as_str() != recorded.as_ref() {
        return Err(MutationError::OptimisticLockFailed {
            path: file_path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRecord;
    use crate::types::{FileId, Language};

    fn sample_file() -> FileRecord {
        FileRecord {
            id: FileId::new(1).unwrap(),
            repo_relative_path: "a.py".into(),
            absolute_path: "/tmp/a.py".into(),
            size_bytes: 10,
            mtime_unix: 0,
            content_hash: Some(content_hash(b"def f(): pass").into()),
            language: Language::Python,
        }
    }

    #[test]
    fn unchanged_file_passes_the_lock() {
        let file = sample_file();
        assert!(check_unchanged(&file, "def f(): pass", Path::new("a.py")).is_ok());
    }

    #[test]
    fn drifted_file_fails_the_lock() {
        let file = sample_file();
        let err = check_unchanged(&file, "def f(): return 1", Path::new("a.py")).unwrap_err();
        assert!(matches!(err, MutationError::OptimisticLockFailed { .. }));
    }

    #[test]
    fn missing_hash_skips_the_check() {
        let mut file = sample_file();
        file.content_hash = None;
        assert!(check_unchanged(&file, "anything at all", Path::new("a.py")).is_ok());
    }
}
