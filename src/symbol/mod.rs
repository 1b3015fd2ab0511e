//! The `Symbol` entity (§3) — a named code entity with a file and line span.

use crate::types::{compact_string, CompactString, FileId, Language, Range, SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named code entity: function, method, class, struct, interface, enum,
/// variable or module.
///
/// `metadata` carries free-form debuggability tags; the one the core itself
/// writes is `parser=regex`, set by the regex-fallback backend (§4.B) so
/// retrieval and mutation can lower their confidence in degraded results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub file_id: FileId,
    pub language: Language,
    pub range: Range,
    pub signature: Option<Box<str>>,
    pub parameters: Vec<Box<str>>,
    /// First line of the docstring/doc-comment, if any.
    pub doc_summary: Option<Box<str>>,
    /// Explicit base-type names captured at parse time for class-like
    /// symbols (§4.C.4 inheritance resolution input). Empty for languages
    /// or kinds without inheritance (e.g. Go structs).
    pub bases: Vec<Box<str>>,
    pub metadata: BTreeMap<String, String>,
}

impl Symbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<CompactString>,
        kind: SymbolKind,
        file_id: FileId,
        language: Language,
        range: Range,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            file_id,
            language,
            range,
            signature: None,
            parameters: Vec::new(),
            doc_summary: None,
            bases: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_bases(mut self, bases: Vec<Box<str>>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<Box<str>>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Box<str>>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_doc_summary(mut self, summary: impl Into<Box<str>>) -> Self {
        self.doc_summary = Some(summary.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn mark_regex_fallback(self) -> Self {
        self.with_metadata("parser", "regex")
    }

    pub fn is_regex_fallback(&self) -> bool {
        self.metadata.get("parser").map(String::as_str) == Some("regex")
    }

    /// Natural key per §3 invariant 2: `(file, name, start-line, kind)`.
    pub fn natural_key(&self) -> (FileId, &str, u32, SymbolKind) {
        (self.file_id, &self.name, self.range.start_line, self.kind)
    }

    /// Document text fed to the lexical index: name + signature + doc summary.
    pub fn lexical_document(&self) -> String {
        let mut doc = String::from(self.name.as_ref());
        if let Some(sig) = &self.signature {
            doc.push(' ');
            doc.push_str(sig);
        }
        if let Some(summary) = &self.doc_summary {
            doc.push(' ');
            doc.push_str(summary);
        }
        doc
    }
}

pub fn name(s: &str) -> CompactString {
    compact_string(s)
}
