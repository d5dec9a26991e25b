use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use vaultsync_core::{settings, Settings};
use vaultsync_sync::{
    pull_if_newer, LogObserver, PullOutcome, StatusObserver, SyncCoordinator, SyncError,
};
use vaultsync_transport::{TransportError, WebDavClient};

use crate::error::{io_err, DaemonError};
use crate::paths::{is_blob_path, watch_dir};

/// Knobs for a single `run`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Download a newer remote copy before the coordinator starts.
    pub pull_first: bool,
}

/// Load settings from `home`, start a runtime and block until shutdown.
pub fn start_blocking(
    home: &Path,
    options: WatchOptions,
    observer: impl StatusObserver + 'static,
) -> Result<(), DaemonError> {
    init_tracing();
    let settings = settings::load_at(home)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(
        settings,
        home.to_path_buf(),
        options,
        observer,
        CancellationToken::new(),
    ))
}

/// Watch the local blob and push it until ctrl-c or `shutdown` fires.
pub async fn run(
    settings: Settings,
    home: PathBuf,
    options: WatchOptions,
    observer: impl StatusObserver + 'static,
    shutdown: CancellationToken,
) -> Result<(), DaemonError> {
    let target = settings.remote_target()?;
    let blob = settings.local_file_at(&home);
    let client = Arc::new(WebDavClient::new(
        settings.credentials(),
        settings.request_timeout(),
    )?);

    let stop = shutdown.child_token();
    let signal_handle = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => Ok(()),
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down");
                        stop.cancel();
                        Ok(())
                    }
                    Err(err) => Err(DaemonError::Signal(err.to_string())),
                },
            }
        })
    };

    if options.pull_first && settings.enabled {
        match pull_if_newer(client.as_ref(), &target, &blob, &stop).await {
            Ok(PullOutcome::Pulled { bytes }) => {
                tracing::info!(path = %blob.display(), bytes, "startup pull replaced local copy");
            }
            Ok(outcome) => tracing::info!(?outcome, "startup pull finished"),
            Err(SyncError::Transport(TransportError::Cancelled)) => {
                stop.cancel();
                return finish(signal_handle).await;
            }
            Err(err) => tracing::warn!(error = %err, "startup pull failed; continuing with local copy"),
        }
    }

    let coordinator = {
        let blob = blob.clone();
        SyncCoordinator::new(
            client,
            target,
            move || blob.clone(),
            settings.timing(),
            settings.enabled,
        )?
    };
    coordinator.subscribe(LogObserver);
    coordinator.subscribe(observer);

    if !settings.enabled {
        tracing::info!("sync is disabled in settings; changes will not be pushed");
    }
    coordinator.test_connectivity().await;

    let result = watch_blob(&coordinator, &blob, &stop).await;
    coordinator.dispose();
    stop.cancel();
    result?;
    finish(signal_handle).await
}

async fn watch_blob(
    coordinator: &SyncCoordinator,
    blob: &Path,
    stop: &CancellationToken,
) -> Result<(), DaemonError> {
    let dir = watch_dir(blob);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!(dir = %dir.display(), url = %coordinator.target(), "watching local blob");

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                if event.paths.iter().any(|path| is_blob_path(path, blob)) {
                    tracing::debug!(kind = ?event.kind, "local blob changed");
                    coordinator.notify_local_changed();
                }
            }
        }
    }

    Ok(())
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

async fn finish(
    handle: tokio::task::JoinHandle<Result<(), DaemonError>>,
) -> Result<(), DaemonError> {
    match handle.await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "signal task panicked");
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
