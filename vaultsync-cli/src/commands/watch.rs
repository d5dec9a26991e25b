//! `vaultsync watch [--pull-first]`: foreground watch loop.

use anyhow::{Context, Result};
use clap::Args;

use vaultsync_core::SyncEvent;
use vaultsync_daemon::{start_blocking, WatchOptions};

use super::{home, print_event};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Download a newer remote copy before watching.
    #[arg(long)]
    pub pull_first: bool,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let options = WatchOptions {
            pull_first: self.pull_first,
        };
        start_blocking(&home, options, |event: &SyncEvent| print_event(event))
            .context("watch exited with error")
    }
}
