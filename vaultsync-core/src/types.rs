//! Domain types shared by the transport, the coordinator and the CLI.
//!
//! [`RemoteTarget`] and [`Credentials`] are built once per settings load and
//! never mutated afterwards. [`SyncEvent`] is the only thing observers see.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

// ---------------------------------------------------------------------------
// Sync state
// ---------------------------------------------------------------------------

/// Observable state of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Synchronization is turned off by configuration.
    Disabled,
    /// A change was accepted and a delayed upload is pending.
    Queued,
    /// The last connectivity probe succeeded.
    Connected,
    /// The last scheduled upload succeeded.
    Uploaded,
    /// The last probe or upload failed.
    Failed,
}

impl SyncState {
    /// Returns true for states produced by a finished probe or upload.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            SyncState::Connected | SyncState::Uploaded | SyncState::Failed
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Disabled => write!(f, "disabled"),
            SyncState::Queued => write!(f, "queued"),
            SyncState::Connected => write!(f, "connected"),
            SyncState::Uploaded => write!(f, "uploaded"),
            SyncState::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Status event
// ---------------------------------------------------------------------------

/// One state transition, as delivered to observers.
///
/// `detail` always starts with a `[HH:MM:SS]` stamp; failures append a
/// `cause:` line with the underlying error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncEvent {
    state: SyncState,
    label: String,
    detail: String,
}

impl SyncEvent {
    pub fn disabled() -> Self {
        Self::compose(
            SyncState::Disabled,
            "disabled",
            "WebDAV sync is not enabled",
            None,
            Local::now(),
        )
    }

    pub fn queued() -> Self {
        Self::compose(
            SyncState::Queued,
            "queued",
            "upload queued (waiting for edits to settle)",
            None,
            Local::now(),
        )
    }

    pub fn connected() -> Self {
        Self::compose(
            SyncState::Connected,
            "connected",
            "remote store reachable",
            None,
            Local::now(),
        )
    }

    pub fn uploaded() -> Self {
        Self::compose(
            SyncState::Uploaded,
            "uploaded",
            "upload succeeded",
            None,
            Local::now(),
        )
    }

    /// A probe that could not confirm reachability.
    pub fn connection_failed(cause: &str) -> Self {
        Self::compose(
            SyncState::Failed,
            "connection failed",
            "connection failed",
            Some(cause),
            Local::now(),
        )
    }

    /// An upload that did not complete successfully.
    pub fn upload_failed(cause: &str) -> Self {
        Self::compose(
            SyncState::Failed,
            "upload failed",
            "upload failed",
            Some(cause),
            Local::now(),
        )
    }

    fn compose(
        state: SyncState,
        label: &str,
        message: &str,
        cause: Option<&str>,
        at: DateTime<Local>,
    ) -> Self {
        let mut detail = format!("[{}] {message}", at.format("%H:%M:%S"));
        if let Some(cause) = cause {
            detail.push_str("\ncause: ");
            detail.push_str(cause);
        }
        Self {
            state,
            label: label.to_owned(),
            detail,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Short label suitable for a status indicator.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.detail)
    }
}

// ---------------------------------------------------------------------------
// Remote target
// ---------------------------------------------------------------------------

/// Fully resolved URL of the remote file: `<base>/<folder>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteTarget {
    url: String,
}

impl RemoteTarget {
    /// Resolve a base URL, a folder and a file name into one absolute URL.
    ///
    /// Surrounding whitespace and slashes are trimmed from every part and
    /// repeated slashes inside the path collapse to one. An empty folder
    /// places the file directly under the base.
    pub fn new(base_url: &str, folder: &str, file_name: &str) -> Result<Self, SettingsError> {
        let base = normalize_base(base_url)?;

        let file: Vec<&str> = path_segments(file_name).collect();
        if file.is_empty() {
            return Err(SettingsError::InvalidTarget(
                "remote file name is empty".to_string(),
            ));
        }

        let mut url = base;
        for segment in path_segments(folder).chain(file) {
            url.push('/');
            url.push_str(segment);
        }
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

fn path_segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim().split('/').map(str::trim).filter(|s| !s.is_empty())
}

fn normalize_base(raw: &str) -> Result<String, SettingsError> {
    let raw = raw.trim();
    let (scheme, rest) = raw.split_once("://").ok_or_else(|| {
        SettingsError::InvalidTarget(format!("base URL '{raw}' has no scheme"))
    })?;

    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(SettingsError::InvalidTarget(format!(
            "unsupported scheme '{scheme}'; expected http or https"
        )));
    }

    let mut segments = path_segments(rest);
    let host = segments.next().ok_or_else(|| {
        SettingsError::InvalidTarget(format!("base URL '{raw}' has no host"))
    })?;

    let mut base = format!("{scheme}://{host}");
    for segment in segments {
        base.push('/');
        base.push_str(segment);
    }
    Ok(base)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Basic-auth username and secret. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Debounce window and minimum spacing between two uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    pub debounce: Duration,
    pub min_upload_interval: Duration,
}

impl SyncTiming {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);
    pub const DEFAULT_MIN_UPLOAD_INTERVAL: Duration = Duration::from_secs(15);
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            min_upload_interval: Self::DEFAULT_MIN_UPLOAD_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
