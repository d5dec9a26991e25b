//! `vaultsync push`

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use vaultsync_sync::push_now;

use super::{client, enabled_settings, home, runtime};

pub fn run() -> Result<()> {
    let home = home()?;
    let settings = enabled_settings(&home)?;
    let target = settings.remote_target().context("invalid remote target")?;
    let client = client(&settings)?;
    let blob = settings.local_file_at(&home);

    let sent = runtime()?
        .block_on(push_now(&client, &target, &blob, &CancellationToken::new()))
        .with_context(|| format!("failed to push {}", blob.display()))?;

    println!("✓ pushed {sent} bytes to {target}");
    Ok(())
}
