//! Optional three-way merge (§4.H "Merge (optional)"), used when the
//! optimistic lock in `locate` finds the file has drifted since indexing.
//!
//! Grounded directly on `original_source/src/cerberus/mutation/smart_merge.py`'s
//! `SmartMerge.can_merge`: a line-based (not AST-based) three-way merge.
//! `can_merge` diffs base→local and base→remote into two sets of changed
//! line numbers; if they're disjoint both changes apply cleanly, otherwise
//! the overlap is returned as a conflict list and the merge fails. The
//! Python original also carries unused AST-node-diff helpers
//! (`_get_changed_nodes`, `_detect_conflicts` on tree-sitter nodes) that
//! `can_merge` never actually calls — the line-based path is the real
//! behavior, and the one reproduced here.

use crate::error::{MutationError, MutationResult};
use std::collections::HashSet;
use std::path::Path;

/// Line numbers (0-indexed) that differ between `base` and `other`, including
/// lines appended past the end of the shorter side.
fn changed_lines(base: &[&str], other: &[&str]) -> HashSet<usize> {
    let len = base.len().max(other.len());
    (0..len)
        .filter(|&i| base.get(i) != other.get(i))
        .collect()
}

/// Attempts to apply both `local`'s and `remote`'s changes onto `base`. Fails
/// with `MergeConflict` if any line was changed by both sides.
pub fn three_way_merge(base: &str, local: &str, remote: &str, path: &Path) -> MutationResult<String> {
    let base_lines: Vec<&str> = base.lines().collect();
    let local_lines: Vec<&str> = local.lines().collect();
    let remote_lines: Vec<&str> = remote.lines().collect();

    let local_changed = changed_lines(&base_lines, &local_lines);
    let remote_changed = changed_lines(&base_lines, &remote_lines);

    let mut conflicts: Vec<u32> = local_changed.intersection(&remote_changed).map(|&i| i as u32 + 1).collect();
    if !conflicts.is_empty() {
        conflicts.sort_unstable();
        return Err(MutationError::MergeConflict {
            path: path.to_path_buf(),
            conflicting_lines: conflicts,
        });
    }

    let len = base_lines.len().max(local_lines.len()).max(remote_lines.len());
    let mut merged = Vec::with_capacity(len);
    for i in 0..len {
        let line = if local_changed.contains(&i) {
            local_lines.get(i).copied()
        } else if remote_changed.contains(&i) {
            remote_lines.get(i).copied()
        } else {
            base_lines.get(i).copied()
        };
        if let Some(line) = line {
            merged.push(line);
        }
    }
    Ok(merged.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn disjoint_edits_merge_cleanly() {
        let base = "a\nb\nc\nd\n";
        let local = "A\nb\nc\nd\n";
        let remote = "a\nb\nc\nD\n";
        let merged = three_way_merge(base, local, remote, &PathBuf::from("f.py")).unwrap();
        assert_eq!(merged, "A\nb\nc\nD");
    }

    #[test]
    fn overlapping_edits_conflict() {
        let base = "a\nb\nc\n";
        let local = "A\nb\nc\n";
        let remote = "X\nb\nc\n";
        let err = three_way_merge(base, local, remote, &PathBuf::from("f.py")).unwrap_err();
        match err {
            MutationError::MergeConflict { conflicting_lines, .. } => assert_eq!(conflicting_lines, vec![1]),
            other => panic!("expected MergeConflict, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_input_merges_to_itself() {
        let base = "a\nb\nc\n";
        let merged = three_way_merge(base, base, base, &PathBuf::from("f.py")).unwrap();
        assert_eq!(merged, "a\nb\nc");
    }
}
