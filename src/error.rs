//! Structured error types (§7 Error Handling Design).
//!
//! Kinds, not names, matter to the spec: recoverable conditions
//! (`ParserError`, `LimitExceeded`, `ResolutionAmbiguity`) are counted into
//! build/update reports and never abort a scan; integrity failures
//! (`IndexCorrupted`, `StoreWriteError` after retry) abort the operation.
//! Every variant carries enough structure (path, line, reason) for a
//! single-sentence remediation hint via `recovery_suggestions()`.

use crate::types::{FileId, SymbolId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the filesystem scanner (§4.A). Scanning itself never raises
/// these as exceptions that halt the walk — they are collected into
/// `ScanReport::skipped` — but the type exists so callers can inspect why a
/// particular path was skipped.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read directory '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' exceeds the configured size cap of {cap_bytes} bytes ({actual_bytes} bytes)")]
    SizeCapExceeded {
        path: PathBuf,
        cap_bytes: u64,
        actual_bytes: u64,
    },

    #[error("symlink loop detected at '{path}'")]
    SymlinkLoop { path: PathBuf },
}

/// Errors specific to per-language parsing (§4.B, §7 ParserError).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to initialize {language} parser: {reason}")]
    ParserInit { language: String, reason: String },

    #[error("unparseable bytes in '{path}' ({language}): {reason}")]
    UnparseableBytes {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error("invalid UTF-8 in source file '{path}'")]
    InvalidUtf8 { path: PathBuf },
}

/// Top-level index/build errors (§7 taxonomy).
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("index appears to be corrupted: {reason}")]
    IndexCorrupted { reason: String },

    #[error("store write failed after retry: {reason}")]
    StoreWriteError { reason: String },

    #[error("limit exceeded: {limit} (at '{context}')")]
    LimitExceeded { limit: String, context: String },

    #[error("symbol '{name}' not found")]
    SymbolNotFound { name: String },

    #[error("symbol '{name}' is ambiguous: {candidate_count} candidates")]
    AmbiguousSymbol { name: String, candidate_count: usize },

    #[error("file id {id:?} not found in index")]
    FileNotFound { id: FileId },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    General(String),
}

impl IndexError {
    /// Single-sentence remediation hint (§7 "user-visible failure behavior").
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::IndexCorrupted { .. } => vec![
                "Rebuild the index from scratch with build_index(..., force=true)",
                "Check for disk errors or filesystem corruption in the data directory",
            ],
            Self::StoreWriteError { .. } => vec![
                "The write was retried once and still failed; the current build step aborted",
                "Check disk space and permissions under .cerberus/",
            ],
            Self::LimitExceeded { .. } => vec![
                "Raise the relevant limit in configuration, or exclude the offending path",
            ],
            Self::SymbolNotFound { .. } => vec![
                "Check the symbol name and that its file has been indexed",
            ],
            Self::AmbiguousSymbol { .. } => vec![
                "Disambiguate with a file path, line number, or symbol kind",
            ],
            Self::Cancelled => vec!["The prior transaction was rolled back; retry the operation"],
            Self::FileRead { .. } => {
                vec!["Check the file exists and is readable by the current process"]
            }
            _ => vec![],
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IndexCorrupted { .. } | Self::StoreWriteError { .. }
        )
    }
}

/// Errors from the relational store (§4.D, backed by tantivy) and the bincode
/// ledger/persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("document not found for symbol {id:?}")]
    DocumentNotFound { id: SymbolId },

    #[error("schema mismatch: expected field '{field}'")]
    SchemaMismatch { field: String },
}

/// Errors from the vector store (§4.E).
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector id {0:?} not found")]
    NotFound(crate::types::VectorId),

    #[error("failed to persist vector store to '{path}': {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load vector store from '{path}': {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Errors from the mutation engine (§4.H, §7).
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("symbol '{name}' not found in '{path}'")]
    SymbolNotFound { path: PathBuf, name: String },

    #[error("symbol '{name}' is ambiguous in '{path}': {candidate_count} candidates")]
    AmbiguousSymbol {
        path: PathBuf,
        name: String,
        candidate_count: usize,
    },

    #[error("file '{path}' changed since it was indexed (optimistic lock failed)")]
    OptimisticLockFailed { path: PathBuf },

    #[error("merge conflict in '{path}': overlapping changes at lines {conflicting_lines:?}")]
    MergeConflict {
        path: PathBuf,
        conflicting_lines: Vec<u32>,
    },

    #[error("syntax validation failed for '{path}': {errors:?}")]
    SyntaxValidation { path: PathBuf, errors: Vec<String> },

    #[error("'{path}' is classified HIGH risk; pass force=true to override")]
    RiskGateBlocked { path: PathBuf },

    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MutationError {
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::OptimisticLockFailed { .. } => vec![
                "Re-read the current file and retry, or enable merge to reconcile disjoint edits",
            ],
            Self::MergeConflict { .. } => {
                vec!["Resolve the conflicting lines manually and retry"]
            }
            Self::SyntaxValidation { .. } => {
                vec!["The file on disk is unchanged; fix the new code and retry"]
            }
            Self::RiskGateBlocked { .. } => {
                vec!["Pass force=true if you are certain the edit is safe"]
            }
            _ => vec![],
        }
    }
}

/// Resolution-pass ambiguity (§4.C, §7 ResolutionAmbiguity, P6): never fatal,
/// always counted. Not a hard error type on its own — see
/// `resolution::ResolutionCounters` — but cycle detection in MRO computation
/// surfaces this as a typed value so callers can distinguish it from success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAmbiguity {
    #[error("inheritance cycle detected involving symbol {0:?}")]
    InheritanceCycle(SymbolId),

    #[error("multiple candidate targets for import '{module}' in file {file_id:?}")]
    AmbiguousImport {
        module: String,
        file_id: FileId,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type VectorResult<T> = Result<T, VectorError>;
pub type MutationResult<T> = Result<T, MutationError>;

/// Helper trait for adding path/operation context to foreign errors, mirroring
/// the teacher's `ErrorContext` convention.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, IndexError>;
    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, IndexError> {
        self.map_err(|e| IndexError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError> {
        self.map_err(|e| IndexError::General(format!("error processing '{}': {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_flagged() {
        let err = IndexError::IndexCorrupted {
            reason: "bad schema".into(),
        };
        assert!(err.is_fatal());
        assert!(!err.recovery_suggestions().is_empty());

        let err = IndexError::SymbolNotFound {
            name: "foo".into(),
        };
        assert!(!err.is_fatal());
    }
}
