//! Filesystem Scanner (§4.A).
//!
//! Enumerates files honoring ignore rules, gathers metadata, and applies
//! size/extension filters. Does not read file contents. Skipped files are
//! reported via counters (`ScanReport`), never via exceptions; symlink loops
//! are broken by tracking visited inodes.

use crate::config::Settings;
use crate::types::Language;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file discovered by the scanner, before bytes are read (§4.A outputs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub repo_relative_path: Box<str>,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub mtime_unix: i64,
    pub language: Language,
}

/// Counters for skipped paths, surfaced instead of exceptions (§4.A contract).
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub files_found: usize,
    pub skipped_unsupported_extension: usize,
    pub skipped_size_cap: usize,
    pub skipped_unreadable: usize,
    pub skipped_symlink_loop: usize,
}

pub struct Scanner {
    settings: Arc<Settings>,
}

impl Scanner {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk `root` and return a deterministic, sorted depth-first sequence of
    /// `FileDescriptor`s alongside a report of what was skipped and why.
    ///
    /// The returned vector (rather than a true streaming iterator) is the
    /// "lazy, restartable sequence" of §4.A materialized for a single build:
    /// callers restart by re-slicing the same deterministic ordering, which
    /// is what the incremental updater relies on when resuming a cancelled
    /// build (§5 cancellation semantics).
    pub fn scan(&self, root: &Path) -> (Vec<FileDescriptor>, ScanReport) {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &self.settings.indexing.ignore_patterns {
            let _ = override_builder.add(&format!("!{pattern}"));
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let size_cap = self.settings.indexing.size_cap_bytes;
        let mut report = ScanReport::default();
        let mut visited_inodes: HashSet<(u64, u64)> = HashSet::new();
        let mut descriptors = Vec::new();

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    report.skipped_unreadable += 1;
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if is_dotfile(path) {
                continue;
            }

            let Some(language) = Language::from_path(path) else {
                report.skipped_unsupported_extension += 1;
                continue;
            };
            if !self.settings.is_language_enabled(language) {
                continue;
            }

            let metadata = match std::fs::symlink_metadata(path) {
                Ok(m) => m,
                Err(_) => {
                    report.skipped_unreadable += 1;
                    continue;
                }
            };

            if metadata.file_type().is_symlink() {
                match std::fs::metadata(path) {
                    Ok(target_meta) => {
                        let key = inode_key(&target_meta);
                        if !visited_inodes.insert(key) {
                            report.skipped_symlink_loop += 1;
                            continue;
                        }
                    }
                    Err(_) => {
                        report.skipped_symlink_loop += 1;
                        continue;
                    }
                }
            }

            let real_metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(_) => {
                    report.skipped_unreadable += 1;
                    continue;
                }
            };

            if real_metadata.len() > size_cap {
                report.skipped_size_cap += 1;
                continue;
            }

            let mtime_unix = real_metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            descriptors.push(FileDescriptor {
                repo_relative_path: crate::utils::repo_relative_path(root, path),
                absolute_path: path.to_path_buf(),
                size_bytes: real_metadata.len(),
                mtime_unix,
                language,
            });
            report.files_found += 1;
        }

        descriptors.sort_by(|a, b| a.repo_relative_path.cmp(&b.repo_relative_path));
        (descriptors, report)
    }
}

fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(unix)]
fn inode_key(metadata: &std::fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn inode_key(metadata: &std::fs::Metadata) -> (u64, u64) {
    (0, metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    #[test]
    fn scan_finds_only_supported_languages() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.py"), "def f(): pass").unwrap();
        fs::write(dir.path().join("readme.md"), "hello").unwrap();
        fs::write(dir.path().join("app.go"), "package main").unwrap();

        let scanner = Scanner::new(settings());
        let (files, report) = scanner.scan(dir.path());

        assert_eq!(files.len(), 2);
        assert_eq!(report.skipped_unsupported_extension, 1);
        assert!(files.iter().any(|f| f.repo_relative_path.ends_with("main.py")));
    }

    #[test]
    fn scan_is_deterministically_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("z.py"), "pass").unwrap();
        fs::write(dir.path().join("a.py"), "pass").unwrap();

        let scanner = Scanner::new(settings());
        let (files, _) = scanner.scan(dir.path());
        let names: Vec<_> = files.iter().map(|f| f.repo_relative_path.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn scan_skips_files_over_size_cap() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.py"), "x".repeat(100)).unwrap();

        let mut settings = Settings::default();
        settings.indexing.size_cap_bytes = 10;
        let scanner = Scanner::new(Arc::new(settings));
        let (files, report) = scanner.scan(dir.path());

        assert_eq!(files.len(), 0);
        assert_eq!(report.skipped_size_cap, 1);
    }

    #[test]
    fn scan_skips_hidden_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden.py"), "pass").unwrap();
        fs::write(dir.path().join("visible.py"), "pass").unwrap();

        let scanner = Scanner::new(settings());
        let (files, _) = scanner.scan(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].repo_relative_path.ends_with("visible.py"));
    }
}
