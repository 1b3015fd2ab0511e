//! Step 5 of the mutation pipeline (§4.H "Ledger"): an append-only record of
//! every mutation, kept for the write-efficiency accounting
//! `original_source/tests/test_mutation.py::TestDiffLedger` exercises
//! (`record_mutation`/`get_statistics`/`get_recent_metrics`).
//!
//! Persisted the way `vector::store::VectorStore` persists itself — the
//! whole collection bincode-serialized to one file — rather than via the
//! Python original's sqlite table, since this crate has no sqlite dependency.

use crate::error::MutationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 4 characters per line not written is the estimator §4.H names
/// ("tokens-saved estimate ≈ 4 × (lines_total − lines_changed)").
const TOKENS_PER_LINE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOperation {
    Edit,
    Delete,
}

impl MutationOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffMetric {
    pub operation: MutationOperation,
    pub file_path: PathBuf,
    pub lines_changed: u32,
    pub lines_total: u32,
    pub write_efficiency: f32,
    pub tokens_saved: u32,
    pub backup_path: Option<PathBuf>,
    pub recorded_at_unix: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DiffLedger {
    entries: Vec<DiffMetric>,
}

#[derive(Debug)]
pub struct LedgerStatistics {
    pub total_operations: usize,
    pub total_tokens_saved: u64,
    pub operations_by_type: BTreeMap<&'static str, usize>,
}

impl DiffLedger {
    pub fn open(path: &Path) -> Result<Self, MutationError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
        bincode::deserialize(&bytes).map_err(|e| MutationError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), MutationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
        }
        let encoded = bincode::serialize(self).map_err(|e| MutationError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
        std::fs::write(path, encoded).map_err(|e| io_err(path, e))
    }

    /// Appends an entry and returns it, computing `write_efficiency` and
    /// `tokens_saved` from `lines_changed`/`lines_total`.
    pub fn record(&mut self, operation: MutationOperation, file_path: PathBuf, lines_changed: u32, lines_total: u32, backup_path: Option<PathBuf>, recorded_at_unix: i64) -> DiffMetric {
        let write_efficiency = if lines_total > 0 { lines_changed as f32 / lines_total as f32 } else { 0.0 };
        let tokens_saved = TOKENS_PER_LINE * lines_total.saturating_sub(lines_changed);
        let metric = DiffMetric {
            operation,
            file_path,
            lines_changed,
            lines_total,
            write_efficiency,
            tokens_saved,
            backup_path,
            recorded_at_unix,
        };
        self.entries.push(metric.clone());
        metric
    }

    pub fn statistics(&self) -> LedgerStatistics {
        let mut operations_by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut total_tokens_saved = 0u64;
        for entry in &self.entries {
            *operations_by_type.entry(entry.operation.as_str()).or_insert(0) += 1;
            total_tokens_saved += entry.tokens_saved as u64;
        }
        LedgerStatistics {
            total_operations: self.entries.len(),
            total_tokens_saved,
            operations_by_type,
        }
    }

    /// Most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&DiffMetric> {
        self.entries.iter().rev().take(limit).collect()
    }

    /// Count of recorded mutations touching `file_path`, used by the risk
    /// gate's churn signal (§4.H "Risk gate").
    pub fn mutation_count_for(&self, file_path: &Path) -> usize {
        self.entries.iter().filter(|e| e.file_path == file_path).count()
    }
}

fn io_err(path: &Path, source: std::io::Error) -> MutationError {
    MutationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_computes_efficiency_and_tokens_saved() {
        let mut ledger = DiffLedger::default();
        let metric = ledger.record(MutationOperation::Edit, PathBuf::from("test.py"), 10, 100, None, 0);
        assert_eq!(metric.write_efficiency, 0.1);
        assert_eq!(metric.tokens_saved, 360);
    }

    #[test]
    fn statistics_aggregate_by_operation() {
        let mut ledger = DiffLedger::default();
        ledger.record(MutationOperation::Edit, PathBuf::from("file1.py"), 5, 100, None, 0);
        ledger.record(MutationOperation::Edit, PathBuf::from("file2.py"), 10, 200, None, 0);
        ledger.record(MutationOperation::Delete, PathBuf::from("file3.py"), 20, 100, None, 0);

        let stats = ledger.statistics();
        assert_eq!(stats.total_operations, 3);
        assert!(stats.total_tokens_saved > 0);
        assert_eq!(stats.operations_by_type["edit"], 2);
        assert_eq!(stats.operations_by_type["delete"], 1);
    }

    #[test]
    fn recent_returns_newest_first() {
        let mut ledger = DiffLedger::default();
        ledger.record(MutationOperation::Edit, PathBuf::from("file1.py"), 5, 100, None, 0);
        ledger.record(MutationOperation::Edit, PathBuf::from("file2.py"), 10, 200, None, 1);

        let recent = ledger.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].file_path, PathBuf::from("file2.py"));
        assert_eq!(recent[1].file_path, PathBuf::from("file1.py"));
    }

    #[test]
    fn save_then_open_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let mut ledger = DiffLedger::default();
        ledger.record(MutationOperation::Edit, PathBuf::from("a.py"), 1, 10, None, 0);
        ledger.save(&path).unwrap();

        let reopened = DiffLedger::open(&path).unwrap();
        assert_eq!(reopened.statistics().total_operations, 1);
    }
}
