//! Common utilities shared across modules.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Current UTC timestamp in seconds since UNIX_EPOCH.
pub fn get_utc_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Content hash used by the incremental detector (§4.F.1) when no VCS
/// metadata is available. Hex-encoded SHA-256.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Repo-relative path as a forward-slash-separated string, independent of
/// the host OS's path separator, so natural keys are stable across platforms.
pub fn repo_relative_path(root: &Path, path: &Path) -> Box<str> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
        .into_boxed_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn timestamp_is_recent() {
        let ts = get_utc_timestamp();
        assert!(ts > 1_577_836_800, "timestamp should be after 2020-01-01");
    }

    #[test]
    fn content_hash_is_stable_and_sensitive_to_bytes() {
        let a = content_hash(b"fn main() {}");
        let b = content_hash(b"fn main() {}");
        let c = content_hash(b"fn main() { }");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn repo_relative_path_normalizes_separators() {
        let root = PathBuf::from("/repo");
        let path = PathBuf::from("/repo/src/main.rs");
        assert_eq!(&*repo_relative_path(&root, &path), "src/main.rs");
    }
}
