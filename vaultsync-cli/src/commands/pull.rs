//! `vaultsync pull`: refresh the local copy from the remote store.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use vaultsync_sync::{pull_if_newer, PullOutcome};

use super::{client, enabled_settings, home, runtime};

pub fn run() -> Result<()> {
    let home = home()?;
    let settings = enabled_settings(&home)?;
    let target = settings.remote_target().context("invalid remote target")?;
    let client = client(&settings)?;
    let blob = settings.local_file_at(&home);

    let outcome = runtime()?
        .block_on(pull_if_newer(
            &client,
            &target,
            &blob,
            &CancellationToken::new(),
        ))
        .with_context(|| format!("failed to pull {target}"))?;

    match outcome {
        PullOutcome::UpToDate => println!("✓ local copy is up to date"),
        PullOutcome::RemoteMissing => println!("· nothing on the server yet ({target})"),
        PullOutcome::Pulled { bytes } => {
            println!("✓ pulled {bytes} bytes into {}", blob.display())
        }
    }
    Ok(())
}
