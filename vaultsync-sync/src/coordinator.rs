//! Debounced, throttled, cancellable push of the local blob.
//!
//! ## Lifecycle of one notification
//!
//! 1. `notify_local_changed` cancels the pending schedule (if any), registers
//!    a fresh one under the schedule mutex, emits `Queued` and spawns a task.
//! 2. The task sleeps the debounce window, measured from the notification.
//! 3. It takes the upload gate, then sleeps whatever is left of
//!    `last_upload + min_upload_interval`.
//! 4. It leaves the pending slot, so later notifications no longer cancel
//!    it, reads the local file fresh and uploads.
//!
//! Steps 2 and 3 end silently when superseded. Every step ends silently
//! after [`SyncCoordinator::dispose`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use vaultsync_core::{RemoteTarget, SyncEvent, SyncTiming};
use vaultsync_transport::{RemoteStore, TransportError};

use crate::error::SyncError;
use crate::observer::StatusObserver;

type LocalPath = dyn Fn() -> PathBuf + Send + Sync;

/// Converts local-change notifications into throttled uploads and reports
/// every transition to its observers.
///
/// Dropping the coordinator disposes it.
pub struct SyncCoordinator {
    inner: Arc<Inner>,
    runtime: Handle,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    target: RemoteTarget,
    local_path: Box<LocalPath>,
    timing: SyncTiming,
    /// Written only while the schedule mutex is held.
    enabled: AtomicBool,
    /// Parent of every schedule token; cancelled on dispose.
    root: CancellationToken,
    schedule: Mutex<Schedule>,
    /// Held from the throttle wait through the upload, one schedule at a time.
    upload_gate: tokio::sync::Mutex<()>,
    observers: RwLock<Vec<Arc<dyn StatusObserver>>>,
    /// Read-held for each delivery; `dispose` write-locks it to wait out
    /// deliveries already in progress.
    delivery: RwLock<()>,
}

#[derive(Default)]
struct Schedule {
    generation: u64,
    pending: Option<Pending>,
    last_upload: Option<Instant>,
}

struct Pending {
    generation: u64,
    token: CancellationToken,
}

impl SyncCoordinator {
    /// Build a coordinator bound to the current tokio runtime.
    ///
    /// `local_path` is asked for the blob location each time an upload runs.
    pub fn new<L>(
        store: Arc<dyn RemoteStore>,
        target: RemoteTarget,
        local_path: L,
        timing: SyncTiming,
        enabled: bool,
    ) -> Result<Self, SyncError>
    where
        L: Fn() -> PathBuf + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| SyncError::NoRuntime(e.to_string()))?;
        let inner = Inner {
            store,
            target,
            local_path: Box::new(local_path),
            timing,
            enabled: AtomicBool::new(enabled),
            root: CancellationToken::new(),
            schedule: Mutex::new(Schedule::default()),
            upload_gate: tokio::sync::Mutex::new(()),
            observers: RwLock::new(Vec::new()),
            delivery: RwLock::new(()),
        };
        Ok(Self {
            inner: Arc::new(inner),
            runtime,
        })
    }

    pub fn subscribe(&self, observer: impl StatusObserver + 'static) {
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.inner.target
    }

    pub fn timing(&self) -> SyncTiming {
        self.inner.timing
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Turn synchronization on or off.
    ///
    /// Disabling cancels any pending schedule and emits `Disabled`.
    /// Enabling emits nothing; the next notification or probe reports state.
    pub fn set_enabled(&self, enabled: bool) {
        let disabled = {
            let mut schedule = self.inner.lock_schedule();
            let was = self.inner.enabled.swap(enabled, Ordering::SeqCst);
            if was && !enabled {
                if let Some(pending) = schedule.pending.take() {
                    pending.token.cancel();
                }
            }
            was && !enabled
        };
        if disabled {
            self.inner.emit(SyncEvent::disabled());
        }
    }

    /// Monotonic time of the last successful upload, if any.
    pub fn last_upload(&self) -> Option<Instant> {
        self.inner.lock_schedule().last_upload
    }

    /// True while a schedule is still waiting (debounce, gate or throttle).
    pub fn has_pending(&self) -> bool {
        self.inner.lock_schedule().pending.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Record that the storage layer finished writing the local blob.
    ///
    /// Never blocks on I/O. Supersedes any schedule still waiting.
    pub fn notify_local_changed(&self) {
        if !self.is_enabled() {
            return;
        }
        let scheduled_at = Instant::now();

        let (generation, token) = {
            let mut schedule = self.inner.lock_schedule();
            if self.inner.root.is_cancelled() || !self.is_enabled() {
                return;
            }
            if let Some(previous) = schedule.pending.take() {
                previous.token.cancel();
                tracing::debug!(generation = previous.generation, "superseded pending upload");
            }
            schedule.generation += 1;
            let token = self.inner.root.child_token();
            schedule.pending = Some(Pending {
                generation: schedule.generation,
                token: token.clone(),
            });
            (schedule.generation, token)
        };

        self.inner.emit(SyncEvent::queued());
        let inner = Arc::clone(&self.inner);
        self.runtime
            .spawn(async move { inner.run_scheduled(generation, token, scheduled_at).await });
    }

    /// Probe the remote store once and report `Connected` or `Failed`.
    ///
    /// When disabled, emits `Disabled` and returns false without touching
    /// the network.
    pub async fn test_connectivity(&self) -> bool {
        if self.is_disposed() {
            return false;
        }
        if !self.is_enabled() {
            self.inner.emit(SyncEvent::disabled());
            return false;
        }

        match self
            .inner
            .store
            .probe(&self.inner.target, &self.inner.root)
            .await
        {
            Ok(()) => {
                tracing::info!(url = %self.inner.target, "remote store reachable");
                self.inner.emit(SyncEvent::connected());
                true
            }
            Err(TransportError::Cancelled) => false,
            Err(err) => {
                tracing::warn!(url = %self.inner.target, error = %err, "connectivity probe failed");
                self.inner.emit(SyncEvent::connection_failed(&err.to_string()));
                false
            }
        }
    }

    /// Cancel every pending and in-flight schedule and silence all observers.
    ///
    /// Idempotent. Later notifications are no-ops. Returns only after any
    /// delivery already in progress has finished, so no observer is called
    /// once this returns. Must not be called from inside an observer.
    pub fn dispose(&self) {
        self.inner.root.cancel();
        if let Some(pending) = self.inner.lock_schedule().pending.take() {
            pending.token.cancel();
        }
        drop(
            self.inner
                .delivery
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SyncEvent) {
        let _delivering = self.delivery.read().unwrap_or_else(PoisonError::into_inner);
        if self.root.is_cancelled() {
            return;
        }
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.status_changed(&event);
        }
    }

    async fn run_scheduled(
        self: Arc<Self>,
        generation: u64,
        token: CancellationToken,
        scheduled_at: Instant,
    ) {
        if !sleep_until_or_cancelled(scheduled_at + self.timing.debounce, &token).await {
            tracing::trace!(generation, "cancelled during debounce");
            return;
        }

        let _gate = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::trace!(generation, "cancelled waiting for previous upload");
                return;
            }
            guard = self.upload_gate.lock() => guard,
        };

        let ready_at = self
            .lock_schedule()
            .last_upload
            .map(|at| at + self.timing.min_upload_interval);
        if let Some(ready_at) = ready_at {
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!(
                    generation,
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "throttling upload",
                );
                if !sleep_until_or_cancelled(ready_at, &token).await {
                    tracing::trace!(generation, "cancelled during throttle");
                    return;
                }
            }
        }

        {
            let mut schedule = self.lock_schedule();
            if token.is_cancelled() {
                return;
            }
            if schedule
                .pending
                .as_ref()
                .is_some_and(|p| p.generation == generation)
            {
                schedule.pending = None;
            }
        }

        let path = (self.local_path)();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "local file missing; nothing to upload");
                return;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read local file");
                self.emit(SyncEvent::upload_failed(&format!(
                    "cannot read {}: {err}",
                    path.display()
                )));
                return;
            }
        };

        let size = bytes.len();
        match self.store.upload(&self.target, bytes, &token).await {
            Ok(()) => {
                self.lock_schedule().last_upload = Some(Instant::now());
                tracing::info!(generation, url = %self.target, bytes = size, "upload succeeded");
                self.emit(SyncEvent::uploaded());
            }
            Err(TransportError::Cancelled) => {
                tracing::debug!(generation, "upload cancelled by shutdown");
            }
            Err(err) => {
                tracing::warn!(generation, url = %self.target, error = %err, "upload failed");
                self.emit(SyncEvent::upload_failed(&err.to_string()));
            }
        }
    }
}

/// Returns false if `token` fired before `deadline`.
async fn sleep_until_or_cancelled(deadline: Instant, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep_until(deadline) => true,
    }
}
