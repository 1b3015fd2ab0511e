//! Full index build (§4.F): scan -> parallel parse -> buffered commits ->
//! resolution passes -> (optional) vectorization -> final commit.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::model::FileRecord;
use crate::parsing::{DefaultParserFactory, ParserFactory};
use crate::resolution::{self, ResolutionCounters};
use crate::scanner::{ScanReport, Scanner};
use crate::storage::{CodeGraph, IndexStore};
use crate::types::{FileId, SymbolCounter};
use crate::vector::{symbol_embedding_text, VectorStore, Vectorizer};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Disjoint per-file id block, generous enough that no single source file
/// plausibly defines this many symbols; keeps parallel parsing lock-free
/// (§4.F "parser stage MAY parallelize across files") while guaranteeing
/// distinct `SymbolId`s without a shared atomic counter.
const SYMBOL_BLOCK_SIZE: u32 = 1_000_000;

/// Per-run metadata emitted by a full build (§4.F).
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub duration: Duration,
    pub files_indexed: usize,
    pub symbols_indexed: usize,
    pub scan_report: ScanReport,
    pub files_unreadable: usize,
    pub files_regex_fallback: usize,
    pub resolution: ResolutionCounters,
}

pub struct IndexBuilder {
    settings: Arc<Settings>,
    parser_factory: Arc<dyn ParserFactory>,
}

impl IndexBuilder {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            parser_factory: Arc::new(DefaultParserFactory),
        }
    }

    pub fn with_parser_factory(settings: Arc<Settings>, parser_factory: Arc<dyn ParserFactory>) -> Self {
        Self { settings, parser_factory }
    }

    /// Scans `root`, parses every discovered file, commits facts, then runs
    /// resolution. Returns the resulting call/inheritance graph alongside the
    /// build report so callers don't need a second pass to materialize it.
    pub fn full_build(&self, root: &Path, store: &IndexStore) -> IndexResult<(BuildReport, CodeGraph)> {
        let start = Instant::now();

        let scanner = Scanner::new(self.settings.clone());
        let (files, scan_report) = scanner.scan(root);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads)
            .build()
            .map_err(|e| IndexError::General(format!("failed to build parser thread pool: {e}")))?;

        let factory = self.parser_factory.clone();
        let parsed: Vec<ParsedFile> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .filter_map(|(idx, descriptor)| {
                    let file_id = FileId::new(idx as u32 + 1)?;
                    let symbol_base = (idx as u32).saturating_mul(SYMBOL_BLOCK_SIZE) + 1;
                    parse_file(file_id, symbol_base, descriptor, &*factory)
                })
                .collect()
        });

        let chunk_size = self.settings.indexing.chunk_size;
        let (symbols_indexed, files_regex_fallback) = commit_parsed_files(store, &parsed, chunk_size)?;
        let files_unreadable = scan_report.skipped_unreadable;

        let (resolution, graph) = resolution::run_pipeline(store)?;

        let report = BuildReport {
            duration: start.elapsed(),
            files_indexed: parsed.len(),
            symbols_indexed,
            scan_report,
            files_unreadable,
            files_regex_fallback,
            resolution,
        };

        Ok((report, graph))
    }

    /// Embeds every indexed symbol's lexical document and upserts the
    /// resulting vectors, writing back the `vector_id` link for each symbol
    /// (§4.F "optionally computes vectors and upserts them into Vector Store").
    pub fn vectorize(&self, store: &IndexStore, vector_store: &VectorStore, vectorizer: &dyn Vectorizer, model_name: &str) -> IndexResult<usize> {
        let mut cursor = store.query_symbols(None, self.settings.indexing.chunk_size)?;
        let mut embedded = 0;
        loop {
            let batch = cursor.next_batch();
            if batch.is_empty() {
                break;
            }

            let texts: Vec<String> = batch.iter().map(symbol_embedding_text).collect();
            let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let vectors = vectorizer
                .embed_batch(&text_refs)
                .map_err(|e| IndexError::General(format!("embedding failed: {e}")))?;

            let symbol_ids: Vec<_> = batch.iter().map(|s| s.id).collect();
            let vector_ids = vector_store
                .add_vectors_batch(&symbol_ids, &vectors)
                .map_err(|e| IndexError::General(format!("vector store write failed: {e}")))?;

            let mut txn = store.transaction()?;
            for (symbol_id, vector_id) in symbol_ids.iter().zip(&vector_ids) {
                txn.write_embedding_metadata(*symbol_id, *vector_id, model_name)?;
            }
            txn.commit()?;

            embedded += vector_ids.len();
        }
        Ok(embedded)
    }
}

pub(crate) struct ParsedFile {
    pub record: FileRecord,
    pub products: crate::parsing::ParseProducts,
    pub regex_fallback: bool,
}

/// Parses one file into a `ParsedFile`, assigning `file_id` and a
/// `SymbolCounter` seeded at `symbol_base` (§4.F id-allocation, shared by
/// both the full build and the incremental updater).
pub(crate) fn parse_file(
    file_id: FileId,
    symbol_base: u32,
    descriptor: &crate::scanner::FileDescriptor,
    factory: &dyn ParserFactory,
) -> Option<ParsedFile> {
    let source = match std::fs::read_to_string(&descriptor.absolute_path) {
        Ok(s) => s,
        Err(reason) => {
            tracing::warn!(path = %descriptor.absolute_path.display(), %reason, "skipping unreadable file");
            return None;
        }
    };

    let mut parser = match factory.create(descriptor.language) {
        Ok(parser) => parser,
        Err(reason) => {
            tracing::warn!(language = %descriptor.language, %reason, "no parser available; skipping file");
            return None;
        }
    };

    let mut counter = SymbolCounter::starting_at(symbol_base, 1);
    let products = parser.parse(&source, file_id, &mut counter);
    let regex_fallback = parser.backend() == crate::parsing::ParserBackend::Regex;

    let record = FileRecord {
        id: file_id,
        repo_relative_path: descriptor.repo_relative_path.clone(),
        absolute_path: descriptor.absolute_path.to_string_lossy().into_owned().into(),
        size_bytes: descriptor.size_bytes,
        mtime_unix: descriptor.mtime_unix,
        content_hash: Some(crate::utils::content_hash(source.as_bytes()).into()),
        language: descriptor.language,
    };

    Some(ParsedFile { record, products, regex_fallback })
}

/// Commits every parsed file's rows into `store` in one transaction, chunked
/// per `chunk_size` (§4.D `write_symbols_batch(chunk_size=1000)`). Shared by
/// the full build and the incremental updater.
pub(crate) fn commit_parsed_files(store: &IndexStore, parsed: &[ParsedFile], chunk_size: usize) -> IndexResult<(usize, usize)> {
    let mut symbols_indexed = 0;
    let mut regex_fallback_count = 0;
    let mut txn = store.transaction()?;

    for parsed_file in parsed {
        if parsed_file.regex_fallback {
            regex_fallback_count += 1;
        }
        txn.write_file(&parsed_file.record)?;
        symbols_indexed += parsed_file.products.symbols.len();
        for chunk in parsed_file.products.symbols.chunks(chunk_size) {
            txn.write_symbols_batch(chunk)?;
        }
        if !parsed_file.products.imports.is_empty() {
            txn.write_imports_batch(&parsed_file.products.imports)?;
        }
        if !parsed_file.products.import_links.is_empty() {
            txn.write_import_links_batch(&parsed_file.products.import_links)?;
        }
        if !parsed_file.products.calls.is_empty() {
            txn.write_calls_batch(&parsed_file.products.calls)?;
        }
        if !parsed_file.products.method_calls.is_empty() {
            txn.write_method_calls_batch(&parsed_file.products.method_calls)?;
        }
        if !parsed_file.products.type_infos.is_empty() {
            txn.write_type_infos_batch(&parsed_file.products.type_infos)?;
        }
    }
    txn.commit()?;
    Ok((symbols_indexed, regex_fallback_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn full_build_indexes_a_small_python_file() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("main.py"),
            "class Trainer:\n    def step(self):\n        pass\n",
        )
        .unwrap();

        let index_dir = TempDir::new().unwrap();
        let store = IndexStore::open(index_dir.path()).unwrap();
        let builder = IndexBuilder::new(Arc::new(Settings::default()));

        let (report, _graph) = builder.full_build(project.path(), &store).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert!(report.symbols_indexed >= 2);

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.counts.get("file").copied().unwrap_or(0), 1);
    }
}
