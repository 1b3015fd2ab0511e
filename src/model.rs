//! Data-model entities other than `Symbol` and `File` (§3). These are the
//! facts a per-language parser extracts and the resolution engine turns into
//! `SymbolReference`s.

use crate::types::{FileId, ReferenceKind, SymbolId};
use serde::{Deserialize, Serialize};

/// A scanned, committed file (§3 File). Natural key is `repo_relative_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub repo_relative_path: Box<str>,
    pub absolute_path: Box<str>,
    pub size_bytes: u64,
    pub mtime_unix: i64,
    /// Used by the incremental detector (§4.F.1) when VCS metadata is absent.
    pub content_hash: Option<Box<str>>,
    pub language: crate::types::Language,
}

/// Coarse-grained "this file imports this module" fact (§3 ImportReference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReference {
    pub file_id: FileId,
    pub module: Box<str>,
    pub line: u32,
}

/// Fine-grained "these names are pulled from this module" fact (§3 ImportLink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLink {
    pub file_id: FileId,
    pub module: Box<str>,
    pub imported_symbols: Vec<Box<str>>,
    pub alias: Option<Box<str>>,
    pub is_glob: bool,
    pub line: u32,
    /// Set iff resolution (§4.C.1) mapped `module` to an indexed file.
    pub definition_file: Option<FileId>,
    /// Set iff, additionally, the named symbol was found in that file.
    pub definition_symbol: Option<SymbolId>,
}

impl ImportLink {
    pub fn is_resolved(&self) -> bool {
        self.definition_file.is_some()
    }
}

/// Unresolved, name-based call site: `name(` not part of a definition head
/// (§3 CallReference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReference {
    pub caller_file: FileId,
    pub caller_symbol: Option<SymbolId>,
    pub callee_name: Box<str>,
    pub line: u32,
}

/// Unresolved `receiver.method(` call site; `receiver_expression` keeps the
/// full dotted prefix for chained receivers (§3 MethodCall, §4.B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub caller_file: FileId,
    pub caller_symbol: Option<SymbolId>,
    pub receiver_expression: Box<str>,
    pub method_name: Box<str>,
    pub line: u32,
}

impl MethodCall {
    /// Outermost segment of the receiver expression, e.g. `self` in
    /// `self.optimizer.step()`, used by §4.C.3 to honor `self` scoping.
    pub fn receiver_head(&self) -> &str {
        self.receiver_expression
            .split('.')
            .next()
            .unwrap_or(&self.receiver_expression)
    }
}

/// Type annotation or constructor-inferred type (§3 TypeInfo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub file_id: FileId,
    /// Name of the variable, field, or return slot this type describes.
    pub name: Box<str>,
    pub type_name: Box<str>,
    pub line: u32,
    pub source: TypeInfoSource,
    /// Enclosing function/method/class, when known — lets method-call
    /// resolution build a per-scope name→type map (§4.C.2).
    pub scope_symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeInfoSource {
    /// Explicit annotation: `x: T`, `func(): T`.
    Annotation,
    /// Constructor-call inference: `x = T(...)`, `x := T{...}`.
    Inferred,
}

/// Base-type extraction for generics, per §4.C.2: `List[T]` -> `List`,
/// `torch.optim.Adam` -> `Adam`.
pub fn base_type_name(type_name: &str) -> &str {
    let without_generic = type_name.split(['[', '<']).next().unwrap_or(type_name);
    without_generic
        .rsplit('.')
        .next()
        .unwrap_or(without_generic)
        .trim()
}

/// A resolved edge between two Symbols (§3 SymbolReference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub source_file: FileId,
    pub source_line: u32,
    pub source_symbol: SymbolId,
    pub target_file: FileId,
    pub target_symbol: SymbolId,
    pub kind: ReferenceKind,
    /// §3 invariant 4: confidence bands reflecting derivation method.
    pub confidence: f32,
    /// Debuggability tag naming the resolution step that produced this edge,
    /// e.g. `"type_annotation"`, `"receiver_name_match"`, `"inherits_local_scope"`.
    pub resolution_method: &'static str,
}

impl SymbolReference {
    pub fn new(
        source_file: FileId,
        source_line: u32,
        source_symbol: SymbolId,
        target_file: FileId,
        target_symbol: SymbolId,
        kind: ReferenceKind,
        confidence: f32,
        resolution_method: &'static str,
    ) -> Self {
        debug_assert!((0.0..=1.0).contains(&confidence));
        Self {
            source_file,
            source_line,
            source_symbol,
            target_file,
            target_symbol,
            kind,
            confidence,
            resolution_method,
        }
    }
}

/// Links a Symbol row to one vector in the vector store (§3 EmbeddingMetadata).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub symbol_id: SymbolId,
    pub vector_id: crate::types::VectorId,
    pub model_name: Box<str>,
}

/// Append-only mutation audit record (§3 MutationLedgerEntry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationLedgerEntry {
    pub timestamp_unix: i64,
    pub operation: MutationOperation,
    pub file: Box<str>,
    pub symbol: Box<str>,
    pub lines_changed: u32,
    pub lines_total: u32,
    pub tokens_saved_estimate: u32,
    pub backup_path: Option<Box<str>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOperation {
    Edit,
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_name_strips_generics_and_module_path() {
        assert_eq!(base_type_name("List[T]"), "List");
        assert_eq!(base_type_name("torch.optim.Adam"), "Adam");
        assert_eq!(base_type_name("Vec<String>"), "Vec");
        assert_eq!(base_type_name("int"), "int");
    }

    #[test]
    fn method_call_receiver_head_takes_outermost_segment() {
        let call = MethodCall {
            caller_file: FileId::new(1).unwrap(),
            caller_symbol: None,
            receiver_expression: "self.optimizer".into(),
            method_name: "step".into(),
            line: 5,
        };
        assert_eq!(call.receiver_head(), "self");
    }
}
