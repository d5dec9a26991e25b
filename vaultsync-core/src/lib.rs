//! vaultsync core library: domain types, settings persistence, errors.
//!
//! Public API surface:
//! - [`types`]: sync states, status events, remote target, credentials, timing
//! - [`error`]: [`SettingsError`]
//! - [`settings`]: load / save / edit the settings file

pub mod error;
pub mod settings;
pub mod types;

pub use error::SettingsError;
pub use settings::{Provider, Settings};
pub use types::{Credentials, RemoteTarget, SyncEvent, SyncState, SyncTiming};
