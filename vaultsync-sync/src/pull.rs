//! One-shot startup pull.
//!
//! ## `pull_if_newer` protocol
//!
//! 1. Stat the local blob; its mtime becomes `If-Modified-Since`.
//! 2. `304` or `404` end the pull without touching the disk.
//! 3. With a local copy present, a body is only considered when its
//!    `Last-Modified` is strictly newer than the local mtime. A missing
//!    `Last-Modified` proves nothing, so the local copy wins.
//! 4. A body whose SHA-256 matches the local file is ignored.
//! 5. Otherwise write to `<path>.vaultsync.tmp` and rename over the blob.
//!
//! Run this before any coordinator exists: the coordinator pushes local
//! state and would race a concurrent overwrite.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use vaultsync_core::RemoteTarget;
use vaultsync_transport::{Fetched, RemoteFetch};

use crate::error::{io_err, SyncError};

/// What the startup pull did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Local copy is current; nothing written.
    UpToDate,
    /// The remote store has no file at the target yet.
    RemoteMissing,
    /// The local blob was replaced with `bytes` bytes of remote content.
    Pulled { bytes: usize },
}

/// Download the remote blob over `local_path` if the remote copy is newer.
pub async fn pull_if_newer(
    fetch: &dyn RemoteFetch,
    target: &RemoteTarget,
    local_path: &Path,
    cancel: &CancellationToken,
) -> Result<PullOutcome, SyncError> {
    let local_mtime = local_modified(local_path).await?;
    let since = local_mtime.map(truncate_to_second);

    let (bytes, last_modified) = match fetch.fetch(target, since, cancel).await? {
        Fetched::NotModified => {
            tracing::debug!(url = %target, "remote not modified");
            return Ok(PullOutcome::UpToDate);
        }
        Fetched::Missing => {
            tracing::info!(url = %target, "remote file does not exist yet");
            return Ok(PullOutcome::RemoteMissing);
        }
        Fetched::Body {
            bytes,
            last_modified,
        } => (bytes, last_modified),
    };

    if let Some(local) = since {
        match last_modified {
            Some(remote) if remote > local => {}
            Some(remote) => {
                tracing::debug!(%remote, %local, "remote copy is not newer");
                return Ok(PullOutcome::UpToDate);
            }
            None => {
                tracing::debug!(%local, "remote sent no Last-Modified; keeping local copy");
                return Ok(PullOutcome::UpToDate);
            }
        }
    }

    if local_mtime.is_some() {
        let current = tokio::fs::read(local_path)
            .await
            .map_err(|e| io_err(local_path, e))?;
        if sha256_hex(&current) == sha256_hex(&bytes) {
            tracing::debug!(path = %local_path.display(), "remote content identical");
            return Ok(PullOutcome::UpToDate);
        }
    }

    write_atomic(local_path, &bytes).await?;
    tracing::info!(path = %local_path.display(), bytes = bytes.len(), "pulled remote copy");
    Ok(PullOutcome::Pulled { bytes: bytes.len() })
}

async fn local_modified(path: &Path) -> Result<Option<DateTime<Utc>>, SyncError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta.modified().map_err(|e| io_err(path, e))?;
            Ok(Some(system_time_to_utc(modified)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

fn system_time_to_utc(at: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(at)
}

/// HTTP dates carry whole seconds only.
fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;
    }
    let tmp = PathBuf::from(format!("{}.vaultsync.tmp", path.display()));
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(path, e));
    }
    Ok(())
}
