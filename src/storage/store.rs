//! The Index Store (§4.D): one Tantivy index realizing ten logical tables
//! behind a `doc_type` discriminator, grounded in the teacher's
//! `storage::tantivy::DocumentIndex` start_batch/commit_batch idiom — recast
//! here as an RAII `Transaction` so commit-on-success/rollback-on-failure
//! (§4.D "scoped acquisition") falls out of Rust's drop order instead of a
//! manually-balanced start/commit pair.

use super::schema::{
    IndexSchema, DOC_TYPE_CALL, DOC_TYPE_EMBEDDING_METADATA, DOC_TYPE_FILE, DOC_TYPE_IMPORT,
    DOC_TYPE_IMPORT_LINK, DOC_TYPE_METADATA, DOC_TYPE_METHOD_CALL, DOC_TYPE_SYMBOL,
    DOC_TYPE_SYMBOL_REFERENCE, DOC_TYPE_TYPE_INFO,
};
use crate::error::{StorageError, StorageResult};
use crate::model::{
    CallReference, FileRecord, ImportLink, ImportReference, MethodCall, SymbolReference, TypeInfo,
    TypeInfoSource,
};
use crate::types::{FileId, Language, Range, ReferenceKind, SymbolId, SymbolKind, VectorId};
use crate::Symbol;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument, Term};

const WRITER_BUDGET_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
const UNBOUNDED_SCAN_LIMIT: usize = 1_000_000;

pub struct IndexStore {
    index: Index,
    reader: IndexReader,
    schema: IndexSchema,
    index_path: PathBuf,
    write_lock: Mutex<()>,
}

impl IndexStore {
    pub fn open(index_path: impl AsRef<Path>) -> StorageResult<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&index_path).map_err(|e| StorageError::Tantivy(e.into()))?;

        let (schema, fields) = IndexSchema::build();
        let meta_exists = index_path.join("meta.json").exists();
        let index = if meta_exists {
            Index::open_in_dir(&index_path)?
        } else {
            let dir = MmapDirectory::open(&index_path)?;
            Index::create(dir, schema, IndexSettings::default())?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        if meta_exists {
            reader.reload()?;
        }

        Ok(Self {
            index,
            reader,
            schema: fields,
            index_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Scoped write acquisition (§4.D): commits on success, rolls back on any
    /// early return or panic unwind, never leaves the reader pointed at a
    /// half-written segment.
    pub fn transaction(&self) -> StorageResult<Transaction<'_>> {
        let guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let writer = self.index.writer::<TantivyDocument>(WRITER_BUDGET_BYTES)?;
        Ok(Transaction {
            store: self,
            writer,
            _guard: guard,
            committed: false,
        })
    }

    fn searcher(&self) -> tantivy::Searcher {
        self.reader.searcher()
    }

    /// Restartable, constant-memory cursor over `symbol` documents (§4.D,
    /// §9 "coroutine-ish streaming → explicit lazy iterators").
    pub fn query_symbols(&self, file_id: Option<FileId>, batch_size: usize) -> StorageResult<SymbolCursor> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_SYMBOL, file_id.map(|f| (self.schema.file_id, f.value() as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let symbols = top_docs
            .into_iter()
            .filter_map(|(_, addr)| searcher.doc(addr).ok())
            .filter_map(|doc: TantivyDocument| self.doc_to_symbol(&doc))
            .collect();
        Ok(SymbolCursor {
            symbols,
            position: 0,
            batch_size: batch_size.max(1),
        })
    }

    /// Innermost Symbol whose span contains `line` (§4.D `find_symbol_by_line`).
    pub fn find_symbol_by_line(&self, file_id: FileId, line: u32) -> StorageResult<Option<Symbol>> {
        let mut cursor = self.query_symbols(Some(file_id), DEFAULT_CHUNK_SIZE)?;
        let mut best: Option<Symbol> = None;
        for symbol in cursor.by_ref() {
            if symbol.range.start_line <= line && line <= symbol.range.end_line {
                let span = symbol.range.end_line - symbol.range.start_line;
                let better = best
                    .as_ref()
                    .map(|b| span < b.range.end_line - b.range.start_line)
                    .unwrap_or(true);
                if better {
                    best = Some(symbol);
                }
            }
        }
        Ok(best)
    }

    /// Full-text search over name/signature/doc-summary (§4.D `fts_search`,
    /// P4 injection resistance). Special characters are escaped before
    /// parsing; `AND`/`OR`/`NOT` pass through so boolean queries still work.
    pub fn fts_search(&self, query: &str, top_k: usize) -> StorageResult<Vec<(Symbol, f32)>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.searcher();
        let mut parser = QueryParser::for_index(
            &self.index,
            vec![self.schema.name, self.schema.signature, self.schema.doc_summary, self.schema.lexical_text],
        );
        parser.set_conjunction_by_default();

        let escaped = escape_fts_query(query);
        let parsed: Box<dyn Query> = match parser.parse_query(&escaped) {
            Ok(q) => q,
            Err(_) => return Ok(Vec::new()),
        };

        let type_filter = TermQuery::new(
            Term::from_field_text(self.schema.doc_type, DOC_TYPE_SYMBOL),
            IndexRecordOption::Basic,
        );
        let combined = BooleanQuery::new(vec![
            (Occur::Must, parsed),
            (Occur::Must, Box::new(type_filter)),
        ]);

        let top_docs = searcher.search(&combined, &TopDocs::with_limit(top_k))?;
        let mut results = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            if let Some(symbol) = self.doc_to_symbol(&doc) {
                results.push((symbol, score));
            }
        }
        Ok(results)
    }

    pub fn query_calls_by_callee(&self, callee_name: &str) -> StorageResult<Vec<CallReference>> {
        let searcher = self.searcher();
        let query = self.doc_type_term_query(DOC_TYPE_CALL, self.schema.callee_name, callee_name);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            out.push(CallReference {
                caller_file: FileId::new(get_u64(&doc, self.schema.caller_file).unwrap_or(1) as u32).unwrap(),
                caller_symbol: get_u64(&doc, self.schema.caller_symbol).and_then(|v| SymbolId::new(v as u32)),
                callee_name: get_text(&doc, self.schema.callee_name).into(),
                line: get_u64(&doc, self.schema.call_line).unwrap_or(0) as u32,
            });
        }
        Ok(out)
    }

    pub fn query_method_calls_filtered(&self, method_name: Option<&str>, file_id: Option<FileId>) -> StorageResult<Vec<MethodCall>> {
        let searcher = self.searcher();
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Must,
            Box::new(TermQuery::new(
                Term::from_field_text(self.schema.doc_type, DOC_TYPE_METHOD_CALL),
                IndexRecordOption::Basic,
            )),
        )];
        if let Some(name) = method_name {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(Term::from_field_text(self.schema.method_name, name), IndexRecordOption::Basic)),
            ));
        }
        if let Some(f) = file_id {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(Term::from_field_u64(self.schema.caller_file, f.value() as u64), IndexRecordOption::Basic)),
            ));
        }
        let query = BooleanQuery::new(clauses);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            out.push(MethodCall {
                caller_file: FileId::new(get_u64(&doc, self.schema.caller_file).unwrap_or(1) as u32).unwrap(),
                caller_symbol: get_u64(&doc, self.schema.caller_symbol).and_then(|v| SymbolId::new(v as u32)),
                receiver_expression: get_text(&doc, self.schema.receiver_expression).into(),
                method_name: get_text(&doc, self.schema.method_name).into(),
                line: get_u64(&doc, self.schema.call_line).unwrap_or(0) as u32,
            });
        }
        Ok(out)
    }

    pub fn query_symbol_references_filtered(
        &self,
        source_symbol: Option<SymbolId>,
        target_symbol: Option<SymbolId>,
        kind: Option<ReferenceKind>,
    ) -> StorageResult<Vec<SymbolReference>> {
        let searcher = self.searcher();
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Must,
            Box::new(TermQuery::new(
                Term::from_field_text(self.schema.doc_type, DOC_TYPE_SYMBOL_REFERENCE),
                IndexRecordOption::Basic,
            )),
        )];
        if let Some(s) = source_symbol {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(Term::from_field_u64(self.schema.source_symbol, s.value() as u64), IndexRecordOption::Basic)),
            ));
        }
        if let Some(t) = target_symbol {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(Term::from_field_u64(self.schema.target_symbol, t.value() as u64), IndexRecordOption::Basic)),
            ));
        }
        if let Some(k) = kind {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(Term::from_field_text(self.schema.reference_kind, k.as_str()), IndexRecordOption::Basic)),
            ));
        }
        let query = BooleanQuery::new(clauses);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            out.push(SymbolReference {
                source_file: FileId::new(get_u64(&doc, self.schema.source_file).unwrap_or(1) as u32).unwrap(),
                source_line: get_u64(&doc, self.schema.source_line).unwrap_or(0) as u32,
                source_symbol: SymbolId::new(get_u64(&doc, self.schema.source_symbol).unwrap_or(1) as u32).unwrap(),
                target_file: FileId::new(get_u64(&doc, self.schema.target_file).unwrap_or(1) as u32).unwrap(),
                target_symbol: SymbolId::new(get_u64(&doc, self.schema.target_symbol).unwrap_or(1) as u32).unwrap(),
                kind: ReferenceKind::from_str_tag(&get_text(&doc, self.schema.reference_kind)).unwrap_or(ReferenceKind::Calls),
                confidence: get_f64(&doc, self.schema.confidence).unwrap_or(0.0) as f32,
                resolution_method: leak_str(get_text(&doc, self.schema.resolution_method)),
            });
        }
        Ok(out)
    }

    pub fn query_import_links(&self, file_id: Option<FileId>) -> StorageResult<Vec<ImportLink>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_IMPORT_LINK, file_id.map(|f| (self.schema.file_id, f.value() as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            out.push(ImportLink {
                file_id: FileId::new(get_u64(&doc, self.schema.file_id).unwrap_or(1) as u32).unwrap(),
                module: get_text(&doc, self.schema.module).into(),
                imported_symbols: get_text_multi(&doc, self.schema.imported_symbols),
                alias: get_text_opt(&doc, self.schema.alias),
                is_glob: get_u64(&doc, self.schema.is_glob).unwrap_or(0) != 0,
                line: get_u64(&doc, self.schema.import_line).unwrap_or(0) as u32,
                definition_file: get_u64(&doc, self.schema.definition_file).and_then(|v| FileId::new(v as u32)),
                definition_symbol: get_u64(&doc, self.schema.definition_symbol).and_then(|v| SymbolId::new(v as u32)),
            });
        }
        Ok(out)
    }

    pub fn query_type_infos(&self, file_id: FileId) -> StorageResult<Vec<TypeInfo>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_TYPE_INFO, Some((self.schema.file_id, file_id.value() as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let source = if get_text(&doc, self.schema.type_source) == "inferred" {
                TypeInfoSource::Inferred
            } else {
                TypeInfoSource::Annotation
            };
            out.push(TypeInfo {
                file_id,
                name: get_text(&doc, self.schema.name).into(),
                type_name: get_text(&doc, self.schema.type_name).into(),
                line: get_u64(&doc, self.schema.import_line).unwrap_or(0) as u32,
                source,
                scope_symbol: get_u64(&doc, self.schema.scope_symbol).and_then(|v| SymbolId::new(v as u32)),
            });
        }
        Ok(out)
    }

    pub fn query_files(&self) -> StorageResult<Vec<FileRecord>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_FILE, None);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            if let Some(record) = self.doc_to_file(&doc) {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn find_file_by_id(&self, file_id: FileId) -> StorageResult<Option<FileRecord>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_FILE, Some((self.schema.file_id, file_id.value() as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        if let Some((_, addr)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(addr)?;
            Ok(self.doc_to_file(&doc))
        } else {
            Ok(None)
        }
    }

    pub fn find_file_by_repo_path(&self, repo_relative_path: &str) -> StorageResult<Option<FileRecord>> {
        let searcher = self.searcher();
        let query = self.doc_type_term_query(DOC_TYPE_FILE, self.schema.repo_relative_path, repo_relative_path);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        if let Some((_, addr)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(addr)?;
            Ok(self.doc_to_file(&doc))
        } else {
            Ok(None)
        }
    }

    /// Highest `FileId` currently committed, 0 if the store is empty. Used
    /// to seed a fresh `SymbolCounter` so a build/update never mints an id
    /// that collides with one already on disk (§4.F).
    pub fn max_file_id(&self) -> StorageResult<u32> {
        Ok(self.query_files()?.iter().map(|f| f.id.value()).max().unwrap_or(0))
    }

    /// Highest `SymbolId` currently committed, 0 if the store is empty.
    pub fn max_symbol_id(&self) -> StorageResult<u32> {
        let mut max = 0u32;
        let mut cursor = self.query_symbols(None, DEFAULT_CHUNK_SIZE)?;
        loop {
            let batch = cursor.next_batch();
            if batch.is_empty() {
                break;
            }
            for symbol in &batch {
                max = max.max(symbol.id.value());
            }
        }
        Ok(max)
    }

    /// Exact-name lookup within one file, used by import/method/inheritance
    /// resolution (§4.C.1/3/4) to turn a bare name into a Symbol.
    pub fn find_symbol_by_name_in_file(&self, file_id: FileId, name: &str) -> StorageResult<Option<Symbol>> {
        let searcher = self.searcher();
        let query = BooleanQuery::new(vec![
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(self.schema.doc_type, DOC_TYPE_SYMBOL), IndexRecordOption::Basic)) as Box<dyn Query>),
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_u64(self.schema.file_id, file_id.value() as u64), IndexRecordOption::Basic))),
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(self.schema.name, name), IndexRecordOption::Basic))),
        ]);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        if let Some((_, addr)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(addr)?;
            Ok(self.doc_to_symbol(&doc))
        } else {
            Ok(None)
        }
    }

    /// Every Symbol named `name`, across all files (§4.G `find_symbol`); the
    /// caller disambiguates by file/kind/line when more than one comes back.
    pub fn find_symbol_by_name(&self, name: &str) -> StorageResult<Vec<Symbol>> {
        let searcher = self.searcher();
        let query = self.doc_type_term_query(DOC_TYPE_SYMBOL, self.schema.name, name);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut out = Vec::new();
        for (_, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            if let Some(symbol) = self.doc_to_symbol(&doc) {
                out.push(symbol);
            }
        }
        Ok(out)
    }

    /// Joins a `vector_id` back to its Symbol via `embeddings_metadata` then
    /// `symbol` (§4.G vector search "join to Symbols via embeddings_metadata").
    pub fn find_symbol_by_vector_id(&self, vector_id: VectorId) -> StorageResult<Option<Symbol>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_EMBEDDING_METADATA, Some((self.schema.vector_id, vector_id.0 as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, addr)) = top_docs.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(addr)?;
        let Some(symbol_id) = get_u64(&doc, self.schema.symbol_id).and_then(|v| SymbolId::new(v as u32)) else {
            return Ok(None);
        };
        self.find_symbol_by_id(symbol_id)
    }

    /// Exact-id Symbol lookup, used by call-graph traversal and the
    /// vector-id join above.
    pub fn find_symbol_by_id(&self, symbol_id: SymbolId) -> StorageResult<Option<Symbol>> {
        let searcher = self.searcher();
        let query = self.doc_type_query(DOC_TYPE_SYMBOL, Some((self.schema.symbol_id, symbol_id.value() as u64)));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        if let Some((_, addr)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(addr)?;
            Ok(self.doc_to_symbol(&doc))
        } else {
            Ok(None)
        }
    }

    fn doc_to_file(&self, doc: &TantivyDocument) -> Option<FileRecord> {
        let id = FileId::new(get_u64(doc, self.schema.file_id)? as u32)?;
        let language = Language::from_tag(&get_text(doc, self.schema.language))?;
        Some(FileRecord {
            id,
            repo_relative_path: get_text(doc, self.schema.repo_relative_path).into(),
            absolute_path: get_text(doc, self.schema.absolute_path).into(),
            size_bytes: get_u64(doc, self.schema.size_bytes).unwrap_or(0),
            mtime_unix: doc.get_first(self.schema.mtime_unix).and_then(|v| v.as_i64()).unwrap_or(0),
            content_hash: get_text_opt(doc, self.schema.content_hash).map(Into::into),
            language,
        })
    }

    pub fn get_metadata(&self, key: &str) -> StorageResult<Option<String>> {
        let searcher = self.searcher();
        let query = self.doc_type_term_query(DOC_TYPE_METADATA, self.schema.meta_key, key);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        if let Some((_, addr)) = top_docs.into_iter().next() {
            let doc: TantivyDocument = searcher.doc(addr)?;
            Ok(Some(get_text(&doc, self.schema.meta_value)))
        } else {
            Ok(None)
        }
    }

    pub fn get_stats(&self) -> StorageResult<StoreStats> {
        let searcher = self.searcher();
        let mut counts = BTreeMap::new();
        for doc_type in [
            DOC_TYPE_FILE,
            DOC_TYPE_SYMBOL,
            DOC_TYPE_IMPORT,
            DOC_TYPE_IMPORT_LINK,
            DOC_TYPE_CALL,
            DOC_TYPE_METHOD_CALL,
            DOC_TYPE_TYPE_INFO,
            DOC_TYPE_SYMBOL_REFERENCE,
            DOC_TYPE_EMBEDDING_METADATA,
        ] {
            let query = TermQuery::new(Term::from_field_text(self.schema.doc_type, doc_type), IndexRecordOption::Basic);
            let count = searcher.search(&query, &tantivy::collector::Count)?;
            counts.insert(doc_type.to_string(), count);
        }
        let disk_bytes = dir_size(&self.index_path);
        Ok(StoreStats { counts, disk_bytes })
    }

    fn doc_to_symbol(&self, doc: &TantivyDocument) -> Option<Symbol> {
        let id = SymbolId::new(get_u64(doc, self.schema.symbol_id)? as u32)?;
        let file_id = FileId::new(get_u64(doc, self.schema.file_id)? as u32)?;
        let kind = SymbolKind::from_str_tag(&get_text(doc, self.schema.kind))?;
        let language = Language::from_tag(&get_text(doc, self.schema.language))?;
        let range = Range::new(
            get_u64(doc, self.schema.start_line)? as u32,
            get_u64(doc, self.schema.start_column).unwrap_or(0) as u16,
            get_u64(doc, self.schema.end_line)? as u32,
            get_u64(doc, self.schema.end_column).unwrap_or(0) as u16,
        );
        let mut symbol = Symbol::new(id, get_text(doc, self.schema.name), kind, file_id, language, range);
        let signature = get_text_opt(doc, self.schema.signature);
        if let Some(sig) = signature {
            symbol = symbol.with_signature(sig);
        }
        if let Some(summary) = get_text_opt(doc, self.schema.doc_summary) {
            symbol = symbol.with_doc_summary(summary);
        }
        let bases = get_text_multi(doc, self.schema.bases);
        symbol = symbol.with_bases(bases);
        if get_u64(doc, self.schema.parser_regex_fallback).unwrap_or(0) != 0 {
            symbol = symbol.mark_regex_fallback();
        }
        Some(symbol)
    }

    fn doc_type_query(&self, doc_type: &str, extra_u64: Option<(Field, u64)>) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Must,
            Box::new(TermQuery::new(Term::from_field_text(self.schema.doc_type, doc_type), IndexRecordOption::Basic)),
        )];
        if let Some((field, value)) = extra_u64 {
            clauses.push((Occur::Must, Box::new(TermQuery::new(Term::from_field_u64(field, value), IndexRecordOption::Basic))));
        }
        Box::new(BooleanQuery::new(clauses))
    }

    fn doc_type_term_query(&self, doc_type: &str, field: Field, value: &str) -> Box<dyn Query> {
        Box::new(BooleanQuery::new(vec![
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(self.schema.doc_type, doc_type), IndexRecordOption::Basic)) as Box<dyn Query>),
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(field, value), IndexRecordOption::Basic))),
        ]))
    }

    #[allow(dead_code)]
    fn all(&self) -> Box<dyn Query> {
        Box::new(AllQuery)
    }
}

/// Restartable, bounded-memory cursor (§9 "explicit lazy iterators").
/// Materializes results up front — a pragmatic simplification of a true
/// segment-at-a-time cursor — but exposes the same `next_batch` contract so
/// callers never hold the whole result set resident if they don't need to.
pub struct SymbolCursor {
    symbols: Vec<Symbol>,
    position: usize,
    batch_size: usize,
}

impl SymbolCursor {
    pub fn next_batch(&mut self) -> Vec<Symbol> {
        let end = (self.position + self.batch_size).min(self.symbols.len());
        let batch = self.symbols[self.position..end].to_vec();
        self.position = end;
        batch
    }
}

impl Iterator for SymbolCursor {
    type Item = Symbol;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.symbols.len() {
            return None;
        }
        let item = self.symbols[self.position].clone();
        self.position += 1;
        Some(item)
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub counts: BTreeMap<String, usize>,
    pub disk_bytes: u64,
}

pub struct Transaction<'a> {
    store: &'a IndexStore,
    writer: IndexWriter,
    _guard: std::sync::MutexGuard<'a, ()>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn write_file(&mut self, file: &FileRecord) -> StorageResult<()> {
        let s = &self.store.schema;
        let mut doc = TantivyDocument::new();
        doc.add_text(s.doc_type, DOC_TYPE_FILE);
        doc.add_u64(s.file_id, file.id.value() as u64);
        doc.add_text(s.repo_relative_path, file.repo_relative_path.as_ref());
        doc.add_text(s.absolute_path, file.absolute_path.as_ref());
        doc.add_u64(s.size_bytes, file.size_bytes);
        doc.add_i64(s.mtime_unix, file.mtime_unix);
        if let Some(hash) = &file.content_hash {
            doc.add_text(s.content_hash, hash.as_ref());
        }
        doc.add_text(s.language, file.language.tag());
        self.writer.add_document(doc)?;
        Ok(())
    }

    pub fn write_symbols_batch(&mut self, symbols: &[Symbol]) -> StorageResult<()> {
        for chunk in symbols.chunks(DEFAULT_CHUNK_SIZE) {
            for symbol in chunk {
                let s = &self.store.schema;
                let mut doc = TantivyDocument::new();
                doc.add_text(s.doc_type, DOC_TYPE_SYMBOL);
                doc.add_u64(s.symbol_id, symbol.id.value() as u64);
                doc.add_u64(s.file_id, symbol.file_id.value() as u64);
                doc.add_text(s.name, symbol.name.as_ref());
                doc.add_text(s.kind, symbol.kind.as_str());
                doc.add_u64(s.start_line, symbol.range.start_line as u64);
                doc.add_u64(s.end_line, symbol.range.end_line as u64);
                doc.add_u64(s.start_column, symbol.range.start_column as u64);
                doc.add_u64(s.end_column, symbol.range.end_column as u64);
                doc.add_text(s.language, symbol.language.tag());
                if let Some(sig) = &symbol.signature {
                    doc.add_text(s.signature, sig.as_ref());
                }
                if let Some(summary) = &symbol.doc_summary {
                    doc.add_text(s.doc_summary, summary.as_ref());
                }
                for base in &symbol.bases {
                    doc.add_text(s.bases, base.as_ref());
                }
                doc.add_u64(s.parser_regex_fallback, symbol.is_regex_fallback() as u64);
                doc.add_text(s.lexical_text, symbol.lexical_document());
                self.writer.add_document(doc)?;
            }
        }
        Ok(())
    }

    pub fn write_imports_batch(&mut self, imports: &[ImportReference]) -> StorageResult<()> {
        let s = &self.store.schema;
        for import in imports {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_IMPORT);
            doc.add_u64(s.file_id, import.file_id.value() as u64);
            doc.add_text(s.module, import.module.as_ref());
            doc.add_u64(s.import_line, import.line as u64);
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    pub fn write_import_links_batch(&mut self, links: &[ImportLink]) -> StorageResult<()> {
        let s = &self.store.schema;
        for link in links {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_IMPORT_LINK);
            doc.add_u64(s.file_id, link.file_id.value() as u64);
            doc.add_text(s.module, link.module.as_ref());
            for name in &link.imported_symbols {
                doc.add_text(s.imported_symbols, name.as_ref());
            }
            if let Some(alias) = &link.alias {
                doc.add_text(s.alias, alias.as_ref());
            }
            doc.add_u64(s.is_glob, link.is_glob as u64);
            doc.add_u64(s.import_line, link.line as u64);
            if let Some(def_file) = link.definition_file {
                doc.add_u64(s.definition_file, def_file.value() as u64);
            }
            if let Some(def_symbol) = link.definition_symbol {
                doc.add_u64(s.definition_symbol, def_symbol.value() as u64);
            }
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    /// Drops every `import_link` row and rewrites `links` in its place.
    /// Resolution (§4.C.1) re-resolves globally on each build/update, so the
    /// whole table is replaced rather than patched row by row — Tantivy
    /// documents are immutable once written.
    pub fn replace_all_import_links(&mut self, links: &[ImportLink]) -> StorageResult<()> {
        let s = &self.store.schema;
        self.writer.delete_term(Term::from_field_text(s.doc_type, DOC_TYPE_IMPORT_LINK));
        self.write_import_links_batch(links)
    }

    pub fn write_calls_batch(&mut self, calls: &[CallReference]) -> StorageResult<()> {
        let s = &self.store.schema;
        for call in calls {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_CALL);
            doc.add_u64(s.caller_file, call.caller_file.value() as u64);
            if let Some(caller) = call.caller_symbol {
                doc.add_u64(s.caller_symbol, caller.value() as u64);
            }
            doc.add_text(s.callee_name, call.callee_name.as_ref());
            doc.add_u64(s.call_line, call.line as u64);
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    pub fn write_method_calls_batch(&mut self, calls: &[MethodCall]) -> StorageResult<()> {
        let s = &self.store.schema;
        for call in calls {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_METHOD_CALL);
            doc.add_u64(s.caller_file, call.caller_file.value() as u64);
            if let Some(caller) = call.caller_symbol {
                doc.add_u64(s.caller_symbol, caller.value() as u64);
            }
            doc.add_text(s.receiver_expression, call.receiver_expression.as_ref());
            doc.add_text(s.method_name, call.method_name.as_ref());
            doc.add_u64(s.call_line, call.line as u64);
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    pub fn write_type_infos_batch(&mut self, infos: &[TypeInfo]) -> StorageResult<()> {
        let s = &self.store.schema;
        for info in infos {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_TYPE_INFO);
            doc.add_u64(s.file_id, info.file_id.value() as u64);
            doc.add_text(s.name, info.name.as_ref());
            doc.add_text(s.type_name, info.type_name.as_ref());
            doc.add_u64(s.import_line, info.line as u64);
            doc.add_text(s.type_source, match info.source {
                TypeInfoSource::Annotation => "annotation",
                TypeInfoSource::Inferred => "inferred",
            });
            if let Some(scope) = info.scope_symbol {
                doc.add_u64(s.scope_symbol, scope.value() as u64);
            }
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    pub fn write_symbol_references_batch(&mut self, refs: &[SymbolReference]) -> StorageResult<()> {
        let s = &self.store.schema;
        for reference in refs {
            let mut doc = TantivyDocument::new();
            doc.add_text(s.doc_type, DOC_TYPE_SYMBOL_REFERENCE);
            doc.add_u64(s.source_file, reference.source_file.value() as u64);
            doc.add_u64(s.source_line, reference.source_line as u64);
            doc.add_u64(s.source_symbol, reference.source_symbol.value() as u64);
            doc.add_u64(s.target_file, reference.target_file.value() as u64);
            doc.add_u64(s.target_symbol, reference.target_symbol.value() as u64);
            doc.add_text(s.reference_kind, reference.kind.as_str());
            doc.add_f64(s.confidence, reference.confidence as f64);
            doc.add_text(s.resolution_method, reference.resolution_method);
            self.writer.add_document(doc)?;
        }
        Ok(())
    }

    /// Drops every `symbol_reference` row and rewrites `refs` in its place,
    /// for the same reason as [`Self::replace_all_import_links`].
    pub fn replace_all_symbol_references(&mut self, refs: &[SymbolReference]) -> StorageResult<()> {
        let s = &self.store.schema;
        self.writer.delete_term(Term::from_field_text(s.doc_type, DOC_TYPE_SYMBOL_REFERENCE));
        self.write_symbol_references_batch(refs)
    }

    pub fn write_embedding_metadata(
        &mut self,
        symbol_id: SymbolId,
        vector_id: VectorId,
        model_name: &str,
    ) -> StorageResult<()> {
        let s = &self.store.schema;
        let mut doc = TantivyDocument::new();
        doc.add_text(s.doc_type, DOC_TYPE_EMBEDDING_METADATA);
        doc.add_u64(s.symbol_id, symbol_id.value() as u64);
        doc.add_u64(s.vector_id, vector_id.0 as u64);
        doc.add_text(s.model_name, model_name);
        self.writer.add_document(doc)?;
        Ok(())
    }

    pub fn set_metadata(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let s = &self.store.schema;
        self.writer.delete_term(Term::from_field_text(s.meta_key, key));
        let mut doc = TantivyDocument::new();
        doc.add_text(s.doc_type, DOC_TYPE_METADATA);
        doc.add_text(s.meta_key, key);
        doc.add_text(s.meta_value, value);
        self.writer.add_document(doc)?;
        Ok(())
    }

    /// Cascading delete (§4.D, P2): removes every row referencing `file_id`
    /// across every table and returns the vector-ids orphaned by the
    /// deleted symbols' `embeddings_metadata` rows, for eviction from the
    /// vector store (§4.E).
    pub fn delete_file(&mut self, file_id: FileId) -> StorageResult<Vec<VectorId>> {
        let searcher = self.store.searcher();
        let s = &self.store.schema;

        let symbol_query = BooleanQuery::new(vec![
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(s.doc_type, DOC_TYPE_SYMBOL), IndexRecordOption::Basic)) as Box<dyn Query>),
            (Occur::Must, Box::new(TermQuery::new(Term::from_field_u64(s.file_id, file_id.value() as u64), IndexRecordOption::Basic))),
        ]);
        let symbol_docs = searcher.search(&symbol_query, &TopDocs::with_limit(UNBOUNDED_SCAN_LIMIT))?;
        let mut symbol_ids = Vec::new();
        for (_, addr) in symbol_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            if let Some(id) = get_u64(&doc, s.symbol_id) {
                symbol_ids.push(id);
            }
        }

        let mut evicted = Vec::new();
        for symbol_id in &symbol_ids {
            let embed_query = BooleanQuery::new(vec![
                (Occur::Must, Box::new(TermQuery::new(Term::from_field_text(s.doc_type, DOC_TYPE_EMBEDDING_METADATA), IndexRecordOption::Basic)) as Box<dyn Query>),
                (Occur::Must, Box::new(TermQuery::new(Term::from_field_u64(s.symbol_id, *symbol_id), IndexRecordOption::Basic))),
            ]);
            let embed_docs = searcher.search(&embed_query, &TopDocs::with_limit(1))?;
            for (_, addr) in embed_docs {
                let doc: TantivyDocument = searcher.doc(addr)?;
                if let Some(v) = get_u64(&doc, s.vector_id) {
                    evicted.push(VectorId(v as u32));
                }
            }
            self.writer.delete_term(Term::from_field_u64(s.symbol_id, *symbol_id));
        }

        for field in [s.file_id, s.caller_file, s.source_file, s.target_file] {
            self.writer.delete_term(Term::from_field_u64(field, file_id.value() as u64));
        }

        Ok(evicted)
    }

    pub fn commit(mut self) -> StorageResult<()> {
        self.writer.commit()?;
        self.store.reader.reload()?;
        self.committed = true;
        Ok(())
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.writer.rollback();
        }
    }
}

/// Escapes Tantivy query-syntax metacharacters (§8 P4) while leaving the
/// recognized boolean operators AND/OR/NOT untouched.
pub fn escape_fts_query(query: &str) -> String {
    const SPECIAL: &[char] = &['@', '(', ')', '*', ':', '^', '"', '+', '-', '[', ']', '{', '}', '~', '\\'];
    let mut escaped = String::with_capacity(query.len());
    for word in query.split_whitespace() {
        if !escaped.is_empty() {
            escaped.push(' ');
        }
        if matches!(word, "AND" | "OR" | "NOT") {
            escaped.push_str(word);
            continue;
        }
        for c in word.chars() {
            if SPECIAL.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
    }
    escaped
}

fn get_u64(doc: &TantivyDocument, field: Field) -> Option<u64> {
    doc.get_first(field).and_then(|v| v.as_u64())
}

fn get_f64(doc: &TantivyDocument, field: Field) -> Option<f64> {
    doc.get_first(field).and_then(|v| v.as_f64())
}

fn get_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn get_text_opt(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn get_text_multi(doc: &TantivyDocument, field: Field) -> Vec<Box<str>> {
    doc.get_all(field).filter_map(|v| v.as_str()).map(Box::from).collect()
}

/// `SymbolReference::resolution_method` is `&'static str`; reconstructing one
/// from a stored value needs a leak. These are a handful of short, fixed
/// strings re-read per query, never per symbol, so the leak is bounded.
fn leak_str(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_dir() {
                    total += dir_size(&entry.path());
                } else {
                    total += metadata.len();
                }
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language as Lang;
    use tempfile::TempDir;

    fn sample_symbol(id: u32, file: u32, name: &str) -> Symbol {
        Symbol::new(
            SymbolId::new(id).unwrap(),
            name,
            SymbolKind::Function,
            FileId::new(file).unwrap(),
            Lang::Python,
            Range::new(1, 0, 3, 0),
        )
    }

    #[test]
    fn write_and_query_symbols_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[sample_symbol(1, 1, "handle_request")]).unwrap();
        txn.commit().unwrap();

        let found: Vec<_> = store.query_symbols(None, 100).unwrap().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_ref(), "handle_request");
    }

    #[test]
    fn delete_file_cascades_and_rolls_back_on_drop() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();

        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[sample_symbol(1, 1, "f"), sample_symbol(2, 2, "g")]).unwrap();
        txn.commit().unwrap();

        {
            let mut txn = store.transaction().unwrap();
            txn.delete_file(FileId::new(1).unwrap()).unwrap();
            // dropped without commit: should roll back, leaving both symbols.
        }
        let found: Vec<_> = store.query_symbols(None, 100).unwrap().collect();
        assert_eq!(found.len(), 2);

        let mut txn = store.transaction().unwrap();
        txn.delete_file(FileId::new(1).unwrap()).unwrap();
        txn.commit().unwrap();
        let found: Vec<_> = store.query_symbols(None, 100).unwrap().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_ref(), "g");
    }

    #[test]
    fn fts_search_never_errors_on_special_characters() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[sample_symbol(1, 1, "parse_function")]).unwrap();
        txn.commit().unwrap();

        for query in ["@decorator", "func()", "name:value", "function AND parse"] {
            let result = store.fts_search(query, 5);
            assert!(result.is_ok(), "query {query:?} must not error");
        }
    }

    #[test]
    fn get_stats_counts_symbols() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let mut txn = store.transaction().unwrap();
        txn.write_symbols_batch(&[sample_symbol(1, 1, "f")]).unwrap();
        txn.commit().unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.counts[DOC_TYPE_SYMBOL], 1);
    }
}
