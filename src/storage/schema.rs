//! Tantivy schema for the Index Store (§4.D).
//!
//! Grounded in the teacher's `storage::tantivy::IndexSchema`: one Tantivy
//! index holds every logical table, discriminated by a `doc_type` field.
//! Cerberus widens the field set to cover the ten tables §4.D names instead
//! of the teacher's symbols/relationships/files/metadata set.

use tantivy::schema::{
    Field, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing, TextOptions, FAST, STORED, STRING,
};

#[derive(Debug)]
pub struct IndexSchema {
    pub doc_type: Field,

    // files
    pub file_id: Field,
    pub repo_relative_path: Field,
    pub absolute_path: Field,
    pub size_bytes: Field,
    pub mtime_unix: Field,
    pub content_hash: Field,
    pub language: Field,

    // symbols
    pub symbol_id: Field,
    pub name: Field,
    pub kind: Field,
    pub start_line: Field,
    pub end_line: Field,
    pub start_column: Field,
    pub end_column: Field,
    pub signature: Field,
    pub doc_summary: Field,
    pub parser_regex_fallback: Field,
    pub lexical_text: Field,
    pub bases: Field,

    // imports
    pub module: Field,
    pub import_line: Field,

    // import_links
    pub imported_symbols: Field,
    pub alias: Field,
    pub is_glob: Field,
    pub definition_file: Field,
    pub definition_symbol: Field,

    // calls
    pub caller_file: Field,
    pub caller_symbol: Field,
    pub callee_name: Field,
    pub call_line: Field,

    // method_calls
    pub receiver_expression: Field,
    pub method_name: Field,

    // type_infos
    pub type_name: Field,
    pub type_source: Field,
    pub scope_symbol: Field,

    // symbol_references
    pub source_file: Field,
    pub source_line: Field,
    pub source_symbol: Field,
    pub target_file: Field,
    pub target_symbol: Field,
    pub reference_kind: Field,
    pub confidence: Field,
    pub resolution_method: Field,

    // embeddings_metadata
    pub vector_id: Field,
    pub model_name: Field,

    // metadata (key/value)
    pub meta_key: Field,
    pub meta_value: Field,
}

impl IndexSchema {
    pub fn build() -> (Schema, IndexSchema) {
        let mut b = SchemaBuilder::default();

        let doc_type = b.add_text_field("doc_type", STRING | STORED | FAST);

        let file_id = b.add_u64_field("file_id", STORED | FAST);
        let repo_relative_path = b.add_text_field("repo_relative_path", STRING | STORED | FAST);
        let absolute_path = b.add_text_field("absolute_path", STRING | STORED);
        let size_bytes = b.add_u64_field("size_bytes", STORED);
        let mtime_unix = b.add_i64_field("mtime_unix", STORED);
        let content_hash = b.add_text_field("content_hash", STRING | STORED);
        let language = b.add_text_field("language", STRING | STORED | FAST);

        let symbol_id = b.add_u64_field("symbol_id", STORED | FAST);
        let name = b.add_text_field("name", STRING | STORED | FAST);
        let kind = b.add_text_field("kind", STRING | STORED | FAST);
        let start_line = b.add_u64_field("start_line", STORED | FAST);
        let end_line = b.add_u64_field("end_line", STORED | FAST);
        let start_column = b.add_u64_field("start_column", STORED);
        let end_column = b.add_u64_field("end_column", STORED);
        let signature = b.add_text_field("signature", searchable_text());
        let doc_summary = b.add_text_field("doc_summary", searchable_text());
        let parser_regex_fallback = b.add_u64_field("parser_regex_fallback", STORED);
        let lexical_text = b.add_text_field("lexical_text", searchable_text());
        let bases = b.add_text_field("bases", STRING | STORED);

        let module = b.add_text_field("module", STRING | STORED | FAST);
        let import_line = b.add_u64_field("import_line", STORED);

        let imported_symbols = b.add_text_field("imported_symbols", STRING | STORED);
        let alias = b.add_text_field("alias", STRING | STORED);
        let is_glob = b.add_u64_field("is_glob", STORED);
        let definition_file = b.add_u64_field("definition_file", STORED);
        let definition_symbol = b.add_u64_field("definition_symbol", STORED);

        let caller_file = b.add_u64_field("caller_file", STORED | FAST);
        let caller_symbol = b.add_u64_field("caller_symbol", STORED);
        let callee_name = b.add_text_field("callee_name", STRING | STORED | FAST);
        let call_line = b.add_u64_field("call_line", STORED);

        let receiver_expression = b.add_text_field("receiver_expression", STRING | STORED);
        let method_name = b.add_text_field("method_name", STRING | STORED | FAST);

        let type_name = b.add_text_field("type_name", STRING | STORED);
        let type_source = b.add_text_field("type_source", STRING | STORED);
        let scope_symbol = b.add_u64_field("scope_symbol", STORED);

        let source_file = b.add_u64_field("source_file", STORED | FAST);
        let source_line = b.add_u64_field("source_line", STORED);
        let source_symbol = b.add_u64_field("source_symbol", STORED | FAST);
        let target_file = b.add_u64_field("target_file", STORED | FAST);
        let target_symbol = b.add_u64_field("target_symbol", STORED | FAST);
        let reference_kind = b.add_text_field("reference_kind", STRING | STORED | FAST);
        let confidence = b.add_f64_field("confidence", STORED);
        let resolution_method = b.add_text_field("resolution_method", STRING | STORED);

        let vector_id = b.add_u64_field("vector_id", STORED | FAST);
        let model_name = b.add_text_field("model_name", STRING | STORED);

        let meta_key = b.add_text_field("meta_key", STRING | STORED | FAST);
        let meta_value = b.add_text_field("meta_value", STORED);

        let schema = b.build();
        let fields = IndexSchema {
            doc_type,
            file_id,
            repo_relative_path,
            absolute_path,
            size_bytes,
            mtime_unix,
            content_hash,
            language,
            symbol_id,
            name,
            kind,
            start_line,
            end_line,
            start_column,
            end_column,
            signature,
            doc_summary,
            parser_regex_fallback,
            lexical_text,
            bases,
            module,
            import_line,
            imported_symbols,
            alias,
            is_glob,
            definition_file,
            definition_symbol,
            caller_file,
            caller_symbol,
            callee_name,
            call_line,
            receiver_expression,
            method_name,
            type_name,
            type_source,
            scope_symbol,
            source_file,
            source_line,
            source_symbol,
            target_file,
            target_symbol,
            reference_kind,
            confidence,
            resolution_method,
            vector_id,
            model_name,
            meta_key,
            meta_value,
        };
        (schema, fields)
    }
}

fn searchable_text() -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("default")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored()
}

/// Every doc-type discriminator value, in table order (§4.D).
pub const DOC_TYPE_FILE: &str = "file";
pub const DOC_TYPE_SYMBOL: &str = "symbol";
pub const DOC_TYPE_IMPORT: &str = "import";
pub const DOC_TYPE_IMPORT_LINK: &str = "import_link";
pub const DOC_TYPE_CALL: &str = "call";
pub const DOC_TYPE_METHOD_CALL: &str = "method_call";
pub const DOC_TYPE_TYPE_INFO: &str = "type_info";
pub const DOC_TYPE_SYMBOL_REFERENCE: &str = "symbol_reference";
pub const DOC_TYPE_EMBEDDING_METADATA: &str = "embedding_metadata";
pub const DOC_TYPE_METADATA: &str = "metadata";
