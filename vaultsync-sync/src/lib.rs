//! # vaultsync-sync
//!
//! Push synchronization of the local encrypted blob.
//!
//! [`SyncCoordinator`] turns "local file changed" notifications into
//! debounced, throttled uploads and reports each transition to
//! [`StatusObserver`]s. [`pull_if_newer`] is the one-shot startup download
//! and [`push_now`] the unthrottled manual upload.

pub mod coordinator;
pub mod error;
pub mod observer;
pub mod pull;
pub mod push;

pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use observer::{status_channel, ChannelObserver, LogObserver, StatusObserver};
pub use pull::{pull_if_newer, PullOutcome};
pub use push::push_now;
