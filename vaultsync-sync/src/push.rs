//! Immediate, unthrottled upload used by `vaultsync push`.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use vaultsync_core::RemoteTarget;
use vaultsync_transport::RemoteStore;

use crate::error::{io_err, SyncError};

/// Read `local_path` and upload it now, bypassing debounce and throttle.
///
/// Returns the number of bytes sent.
pub async fn push_now(
    store: &dyn RemoteStore,
    target: &RemoteTarget,
    local_path: &Path,
    cancel: &CancellationToken,
) -> Result<usize, SyncError> {
    let bytes = tokio::fs::read(local_path)
        .await
        .map_err(|e| io_err(local_path, e))?;
    let size = bytes.len();
    store.upload(target, bytes, cancel).await?;
    tracing::info!(url = %target, bytes = size, "pushed local file");
    Ok(size)
}
