//! Step 4 of the mutation pipeline (§4.H "Atomic write"): write to a temp
//! file beside the target, fsync, rename over the original — plus an
//! optional pre-write backup under a content-addressed directory.
//!
//! Grounded in `original_source/tests/test_mutation.py::TestCodeEditor`
//! (`_atomic_write` writes-then-renames; `create_backup` copies the
//! pre-edit content into a backup directory), reworked as free functions
//! using `std::fs` directly rather than a stateful `CodeEditor`.

use crate::error::MutationError;
use crate::utils::content_hash;
use std::path::{Path, PathBuf};

/// Writes `content` to `path` via a same-directory temp file + rename, so a
/// crash mid-write never leaves a half-written file in place.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), MutationError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(".{}.cerberus-tmp", path.file_name().and_then(|n| n.to_str()).unwrap_or("mutation")));

    let mut file = std::fs::File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
    use std::io::Write;
    file.write_all(content.as_bytes()).map_err(|e| io_err(&tmp_path, e))?;
    file.sync_all().map_err(|e| io_err(&tmp_path, e))?;
    drop(file);

    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Copies the current file content into `backups_dir/<content-hash>/<file-name>`
/// (§6 persisted-state layout `.cerberus/backups/<hash>/<file>`), returning
/// the path it wrote to.
pub fn create_backup(path: &Path, current_content: &str, backups_dir: &Path) -> Result<PathBuf, MutationError> {
    let hash = content_hash(current_content.as_bytes());
    let dest_dir = backups_dir.join(&hash);
    std::fs::create_dir_all(&dest_dir).map_err(|e| io_err(&dest_dir, e))?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("backup");
    let dest = dest_dir.join(file_name);
    std::fs::write(&dest, current_content).map_err(|e| io_err(&dest, e))?;
    Ok(dest)
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
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_file_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "original content").unwrap();

        atomic_write(&path, "new content").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new content");
    }

    #[test]
    fn backup_preserves_original_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.py");
        let backups_dir = dir.path().join("backups");

        let backup_path = create_backup(&path, "def foo(): pass", &backups_dir).unwrap();
        assert!(backup_path.exists());
        assert_eq!(std::fs::read_to_string(&backup_path).unwrap(), "def foo(): pass");
    }
}
