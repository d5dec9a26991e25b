//! vaultsync: push an encrypted vault file to a WebDAV store.
//!
//! # Usage
//!
//! ```text
//! vaultsync probe
//! vaultsync push
//! vaultsync pull
//! vaultsync watch [--pull-first]
//! vaultsync config init [--force]
//! vaultsync config show
//! vaultsync config set <key> <value>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, watch::WatchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "vaultsync",
    version,
    about = "Keep an encrypted vault file pushed to a WebDAV store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the WebDAV server answers for the configured file.
    Probe,

    /// Upload the local file now, skipping debounce and throttle.
    Push,

    /// Download the remote file if it is newer than the local copy.
    Pull,

    /// Watch the local file and push every change until ctrl-c.
    Watch(WatchArgs),

    /// Create, inspect or edit ~/.vaultsync/settings.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe => commands::probe::run(),
        Commands::Push => commands::push::run(),
        Commands::Pull => commands::pull::run(),
        Commands::Watch(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
