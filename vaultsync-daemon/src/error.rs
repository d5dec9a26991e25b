use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watch runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("settings error: {0}")]
    Settings(#[from] vaultsync_core::SettingsError),

    #[error("sync error: {0}")]
    Sync(#[from] vaultsync_sync::SyncError),

    #[error("transport error: {0}")]
    Transport(#[from] vaultsync_transport::TransportError),

    #[error("ctrl-c handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
