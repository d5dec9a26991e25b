//! `vaultsync probe`: one connectivity check, reported as a status event.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use vaultsync_core::settings;
use vaultsync_sync::{status_channel, SyncCoordinator};

use super::{client, home, print_event, runtime};

pub fn run() -> Result<()> {
    let home = home()?;
    let settings = settings::load_at(&home).context("failed to load settings")?;
    let target = settings.remote_target().context("invalid remote target")?;
    let client = Arc::new(client(&settings)?);
    let blob = settings.local_file_at(&home);

    let reachable = runtime()?.block_on(async {
        let coordinator = SyncCoordinator::new(
            client,
            target,
            move || blob.clone(),
            settings.timing(),
            settings.enabled,
        )?;
        let (observer, mut events) = status_channel();
        coordinator.subscribe(observer);

        let reachable = coordinator.test_connectivity().await;
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        Ok::<_, anyhow::Error>(reachable)
    })?;

    if !reachable {
        if !settings.enabled {
            bail!("sync is disabled; enable it with `vaultsync config set enabled true`");
        }
        bail!("remote store is not reachable");
    }
    Ok(())
}
