use std::path::{Path, PathBuf};

/// Directory watched for changes to `blob`.
///
/// The parent is watched rather than the file so atomic `tmp` + rename saves
/// by the storage layer are still observed.
pub fn watch_dir(blob: &Path) -> PathBuf {
    match blob.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// True if a watcher event path names the blob itself.
///
/// Only the parent directory is watched, non-recursively, so comparing file
/// names is enough and sidesteps `/private/var` style canonicalization.
pub fn is_blob_path(path: &Path, blob: &Path) -> bool {
    match (path.file_name(), blob.file_name()) {
        (Some(seen), Some(expected)) => seen == expected,
        _ => false,
    }
}
