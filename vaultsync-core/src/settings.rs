//! Settings file for the synchronizer.
//!
//! # Storage layout
//!
//! ```text
//! ~/.vaultsync/
//!   settings.yaml   (mode 0600, written with defaults on first load)
//!   data.enc        (default local blob, owned by the storage layer)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::types::{Credentials, RemoteTarget, SyncTiming};

/// Base URL used when the provider is [`Provider::Jianguoyun`].
pub const JIANGUOYUN_BASE_URL: &str = "https://dav.jianguoyun.com/dav/";

/// Environment variable that overrides the stored password.
pub const PASSWORD_ENV: &str = "VAULTSYNC_PASSWORD";

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const DEFAULT_LOCAL_FILE: &str = "data.enc";

/// Which WebDAV service the settings point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Jianguoyun (Nutstore); the base URL is fixed.
    #[default]
    Jianguoyun,
    /// Any other WebDAV server; `base_url` is used as given.
    Custom,
}

/// Persisted sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub provider: Provider,
    pub base_url: String,
    pub remote_folder: String,
    pub remote_file_name: String,
    pub username: String,
    pub password: String,
    /// Local blob to mirror; `~/.vaultsync/data.enc` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_upload_interval_ms: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: Provider::Jianguoyun,
            base_url: JIANGUOYUN_BASE_URL.to_string(),
            remote_folder: "EasyNoteVault".to_string(),
            remote_file_name: DEFAULT_LOCAL_FILE.to_string(),
            username: String::new(),
            password: String::new(),
            local_file: None,
            debounce_ms: None,
            min_upload_interval_ms: None,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Base URL after applying the provider's fixed endpoint.
    pub fn effective_base_url(&self) -> &str {
        match self.provider {
            Provider::Jianguoyun => JIANGUOYUN_BASE_URL,
            Provider::Custom => &self.base_url,
        }
    }

    pub fn remote_target(&self) -> Result<RemoteTarget, SettingsError> {
        RemoteTarget::new(
            self.effective_base_url(),
            &self.remote_folder,
            &self.remote_file_name,
        )
    }

    /// Credentials for basic auth; `VAULTSYNC_PASSWORD` wins over the file.
    pub fn credentials(&self) -> Credentials {
        let password = std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.password.clone());
        Credentials::new(self.username.clone(), password)
    }

    pub fn timing(&self) -> SyncTiming {
        let defaults = SyncTiming::default();
        SyncTiming {
            debounce: self
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            min_upload_interval: self
                .min_upload_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_upload_interval),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Path of the local blob, resolved against `home` when not configured.
    pub fn local_file_at(&self, home: &Path) -> PathBuf {
        self.local_file
            .clone()
            .unwrap_or_else(|| settings_dir_at(home).join(DEFAULT_LOCAL_FILE))
    }

    /// Copy with the password blanked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "********".to_string();
        }
        copy
    }

    /// Assign one field from its `config set` key.
    ///
    /// Keys use kebab-case (`base-url`, `min-upload-interval-ms`, …). An empty
    /// value clears optional fields.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        match key {
            "enabled" => self.enabled = parse_value(key, value)?,
            "provider" => {
                self.provider = match value.to_ascii_lowercase().as_str() {
                    "jianguoyun" => Provider::Jianguoyun,
                    "custom" => Provider::Custom,
                    _ => {
                        return Err(invalid(key, value, "expected: jianguoyun, custom"));
                    }
                }
            }
            "base-url" => self.base_url = value.to_string(),
            "remote-folder" => self.remote_folder = value.to_string(),
            "remote-file-name" => self.remote_file_name = value.to_string(),
            "username" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            "local-file" => {
                self.local_file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "debounce-ms" => self.debounce_ms = parse_optional(key, value)?,
            "min-upload-interval-ms" => self.min_upload_interval_ms = parse_optional(key, value)?,
            "request-timeout-secs" => self.request_timeout_secs = parse_value(key, value)?,
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn parse_optional<T>(key: &str, value: &str) -> Result<Option<T>, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if value.is_empty() {
        return Ok(None);
    }
    parse_value(key, value).map(Some)
}

fn invalid(key: &str, value: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.vaultsync/`. Pure, no I/O.
pub fn settings_dir_at(home: &Path) -> PathBuf {
    home.join(".vaultsync")
}

/// `<home>/.vaultsync/settings.yaml`. Pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    settings_dir_at(home).join(SETTINGS_FILE)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load settings from `<home>/.vaultsync/settings.yaml`.
///
/// A missing file is created with [`Settings::default`] (sync disabled) and
/// the defaults are returned. Malformed YAML is reported with its path.
pub fn load_at(home: &Path) -> Result<Settings, SettingsError> {
    let path = settings_path_at(home);
    if !path.exists() {
        let settings = Settings::default();
        save_at(home, &settings)?;
        return Ok(settings);
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| SettingsError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, SettingsError> {
    load_at(&home()?)
}

/// Atomically save settings to `<home>/.vaultsync/settings.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling created 0600 → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let dir = settings_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = settings_path_at(home);
    let tmp_path = path.with_file_name(format!("{SETTINGS_FILE}.tmp"));

    let yaml = serde_yaml::to_string(settings)?;
    write_private(&tmp_path, yaml.as_bytes())?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), SettingsError> {
    save_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, SettingsError> {
    dirs::home_dir().ok_or(SettingsError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

/// Write `bytes` to a file that is never readable by group or others.
///
/// A stale file left by an interrupted save keeps its old mode on open, so
/// the mode is forced again before any content lands.
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), SettingsError> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), SettingsError> {
    std::fs::write(path, bytes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
