//! Error types for vaultsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use vaultsync_transport::TransportError;

/// Errors surfaced by coordinator construction and the startup pull.
///
/// The coordinator's scheduled uploads never return these; they become
/// `Failed` status events instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote store rejected or never answered a request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The coordinator was built outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
