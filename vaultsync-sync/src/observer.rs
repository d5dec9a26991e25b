//! Status observers.
//!
//! Observers are invoked from whichever task produced the transition, so
//! they must be cheap and must not block. Anything that needs a UI thread
//! should forward the event over a channel, which is what
//! [`status_channel`] does. An observer must not dispose the coordinator
//! that is calling it: `dispose` waits for deliveries in progress.

use tokio::sync::mpsc;

use vaultsync_core::SyncEvent;

/// Receives every state transition of a coordinator.
pub trait StatusObserver: Send + Sync {
    fn status_changed(&self, event: &SyncEvent);
}

impl<F> StatusObserver for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn status_changed(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Observer that forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl StatusObserver for ChannelObserver {
    fn status_changed(&self, event: &SyncEvent) {
        // Receiver gone means nobody is watching any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Build a channel-backed observer and the receiving end.
pub fn status_channel() -> (ChannelObserver, mpsc::UnboundedReceiver<SyncEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelObserver { tx }, rx)
}

/// Observer that writes each transition to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn status_changed(&self, event: &SyncEvent) {
        match event.state() {
            vaultsync_core::SyncState::Failed => {
                tracing::warn!(state = %event.state(), detail = %event.detail(), "sync status");
            }
            _ => {
                tracing::info!(state = %event.state(), detail = %event.detail(), "sync status");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use vaultsync_core::SyncState;

    use super::*;

    #[test]
    fn closures_are_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |event: &SyncEvent| sink.lock().unwrap().push(event.state());

        observer.status_changed(&SyncEvent::queued());
        observer.status_changed(&SyncEvent::uploaded());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SyncState::Queued, SyncState::Uploaded]
        );
    }

    #[test]
    fn channel_observer_forwards_and_tolerates_dropped_receiver() {
        let (observer, mut rx) = status_channel();
        observer.status_changed(&SyncEvent::connected());
        assert_eq!(rx.try_recv().expect("event").state(), SyncState::Connected);

        drop(rx);
        observer.status_changed(&SyncEvent::connected());
    }
}
