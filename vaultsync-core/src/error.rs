//! Error types for vaultsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from settings and target resolution.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying I/O failure (permission denied, read-only filesystem, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.vaultsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The configured base URL / folder / file name do not form a usable URL.
    #[error("invalid remote target: {0}")]
    InvalidTarget(String),

    /// `config set` was given a key that does not exist.
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),

    /// `config set` was given a value that does not parse for its key.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
