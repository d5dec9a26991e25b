pub mod config;
pub mod probe;
pub mod pull;
pub mod push;
pub mod watch;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use vaultsync_core::{settings, Settings, SyncEvent, SyncState};
use vaultsync_transport::WebDavClient;

pub(crate) fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Load settings and refuse to continue when sync is switched off.
pub(crate) fn enabled_settings(home: &std::path::Path) -> Result<Settings> {
    let settings = settings::load_at(home).context("failed to load settings")?;
    if !settings.enabled {
        bail!(
            "sync is disabled; enable it with `vaultsync config set enabled true` ({})",
            settings::settings_path_at(home).display()
        );
    }
    Ok(settings)
}

pub(crate) fn client(settings: &Settings) -> Result<WebDavClient> {
    WebDavClient::new(settings.credentials(), settings.request_timeout())
        .context("failed to build WebDAV client")
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

pub(crate) fn print_event(event: &SyncEvent) {
    let marker = match event.state() {
        SyncState::Connected | SyncState::Uploaded => "■".green().bold(),
        SyncState::Queued => "■".yellow().bold(),
        SyncState::Failed => "■".red().bold(),
        SyncState::Disabled => "■".dimmed(),
    };
    println!("{marker} {}", event.label());
    for line in event.detail().lines() {
        println!("    {line}");
    }
}
