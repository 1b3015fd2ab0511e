//! Import resolution (§4.C.1): maps an `ImportLink.module` string to an
//! indexed `File`, and where possible to the specific `Symbol` it names.

use super::ResolutionCounters;
use crate::error::StorageResult;
use crate::model::ImportLink;
use crate::storage::IndexStore;
use crate::types::Language;

/// Names treated as external (standard library or well-known packages)
/// rather than unresolved — best-effort, not exhaustive.
const STDLIB_ALLOWLIST: &[&str] = &[
    "os", "sys", "json", "re", "typing", "collections", "itertools", "functools", "pathlib",
    "asyncio", "dataclasses", "enum", "abc", "logging",
    "fmt", "errors", "context", "strings", "strconv", "time", "sync", "net", "io",
    "react", "react-dom", "path", "fs", "http", "util",
];

pub fn resolve_imports(store: &IndexStore, counters: &mut ResolutionCounters) -> StorageResult<Vec<ImportLink>> {
    let files = store.query_files()?;
    let mut resolved = Vec::new();

    for file in &files {
        for mut link in store.query_import_links(Some(file.id))? {
            if STDLIB_ALLOWLIST.contains(&link.module.as_ref()) {
                counters.imports_unresolved += 1;
                resolved.push(link);
                continue;
            }

            let target_file = find_target_file(&files, &link.module, file.language);

            if let Some(target) = target_file {
                link.definition_file = Some(target.id);
                if let Some(first_name) = link.imported_symbols.first() {
                    if let Some(symbol) = store.find_symbol_by_name_in_file(target.id, first_name)? {
                        link.definition_symbol = Some(symbol.id);
                    }
                }
                counters.imports_resolved += 1;
            } else {
                counters.imports_unresolved += 1;
            }

            resolved.push(link);
        }
    }

    Ok(resolved)
}

fn find_target_file<'a>(
    files: &'a [crate::model::FileRecord],
    module: &str,
    language: Language,
) -> Option<&'a crate::model::FileRecord> {
    let normalized = normalize_module_path(module, language);

    // (a) relative-path rewrite: "a.b.c" -> "a/b/c.<ext>"
    let by_path = language
        .extensions()
        .iter()
        .map(|ext| format!("{normalized}.{ext}"))
        .find_map(|candidate| files.iter().find(|f| f.repo_relative_path.as_ref() == candidate));
    if by_path.is_some() {
        return by_path;
    }

    // (b) exact-name match: last path segment against file stem.
    let last_segment = module.rsplit(['.', '/']).next().unwrap_or(module);
    files.iter().find(|f| file_stem(&f.repo_relative_path) == last_segment)
}

fn normalize_module_path(module: &str, language: Language) -> String {
    match language {
        Language::Python => module.replace('.', "/"),
        Language::Go | Language::TypeScript | Language::JavaScript => module
            .trim_start_matches("./")
            .trim_start_matches("../")
            .to_string(),
    }
}

fn file_stem(repo_relative_path: &str) -> &str {
    let name = repo_relative_path.rsplit('/').next().unwrap_or(repo_relative_path);
    name.split('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;
    use crate::model::FileRecord;
    use crate::types::FileId;
    use tempfile::TempDir;

    fn file(id: u32, path: &str) -> FileRecord {
        FileRecord {
            id: FileId::new(id).unwrap(),
            repo_relative_path: path.into(),
            absolute_path: format!("/repo/{path}").into(),
            size_bytes: 10,
            mtime_unix: 0,
            content_hash: None,
            language: Language::Python,
        }
    }

    #[test]
    fn resolves_dotted_python_module_to_file_path() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let mut txn = store.transaction().unwrap();
        txn.write_file(&file(1, "pkg/utils.py")).unwrap();
        txn.write_file(&file(2, "main.py")).unwrap();
        txn.write_import_links_batch(&[ImportLink {
            file_id: FileId::new(2).unwrap(),
            module: "pkg.utils".into(),
            imported_symbols: vec!["helper".into()],
            alias: None,
            is_glob: false,
            line: 1,
            definition_file: None,
            definition_symbol: None,
        }])
        .unwrap();
        txn.commit().unwrap();

        let mut counters = ResolutionCounters::default();
        let resolved = resolve_imports(&store, &mut counters).unwrap();
        assert_eq!(counters.imports_resolved, 1);
        assert_eq!(resolved[0].definition_file, Some(FileId::new(1).unwrap()));
    }

    #[test]
    fn stdlib_modules_are_counted_as_external_not_resolved() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let mut txn = store.transaction().unwrap();
        txn.write_file(&file(1, "main.py")).unwrap();
        txn.write_import_links_batch(&[ImportLink {
            file_id: FileId::new(1).unwrap(),
            module: "os".into(),
            imported_symbols: vec![],
            alias: None,
            is_glob: false,
            line: 1,
            definition_file: None,
            definition_symbol: None,
        }])
        .unwrap();
        txn.commit().unwrap();

        let mut counters = ResolutionCounters::default();
        let resolved = resolve_imports(&store, &mut counters).unwrap();
        assert!(resolved[0].definition_file.is_none());
    }
}
