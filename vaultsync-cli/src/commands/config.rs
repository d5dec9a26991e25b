//! `vaultsync config`: manage the settings file.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use vaultsync_core::{settings, Settings};

use super::home;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default settings file (sync disabled).
    Init {
        /// Overwrite an existing settings file.
        #[arg(long)]
        force: bool,
    },
    /// Print the current settings with the password hidden.
    Show,
    /// Change one setting, e.g. `config set base-url https://dav.example.com/dav/`.
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// enabled | provider | base-url | remote-folder | remote-file-name |
    /// username | password | local-file | debounce-ms |
    /// min-upload-interval-ms | request-timeout-secs
    pub key: String,

    /// New value; an empty string clears optional keys.
    pub value: String,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = home()?;
    let path = settings::settings_path_at(&home);

    match command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("settings already exist: {}", path.display());
                return Ok(());
            }
            settings::save_at(&home, &Settings::default())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ wrote default settings to {}", path.display());
        }
        ConfigCommand::Show => {
            let current = settings::load_at(&home).context("failed to load settings")?;
            let rendered = serde_yaml::to_string(&current.redacted())
                .context("failed to render settings")?;
            println!("# {}", path.display());
            print!("{rendered}");
        }
        ConfigCommand::Set(SetArgs { key, value }) => {
            let mut current = settings::load_at(&home).context("failed to load settings")?;
            current
                .set_field(&key, &value)
                .with_context(|| format!("cannot set '{key}'"))?;
            current
                .remote_target()
                .context("settings would produce an invalid remote target")?;
            settings::save_at(&home, &current)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let shown = if key == "password" { "********" } else { value.as_str() };
            println!("✓ {key} = {shown}");
        }
    }
    Ok(())
}
