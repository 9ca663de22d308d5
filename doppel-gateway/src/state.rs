//! Shared application state and watch-loop supervision.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::broker::ResponseBroker;
use crate::surface::Surface;
use crate::watch::WatchLoop;
use doppel_core::DispatchEvent;

/// Shared application state.
///
/// Captured once at startup: the broker and timings never change after
/// construction. Watch loops receive their own seen-state; the only thing
/// they share through here is the broker, the observer channel, and the
/// shutdown signal.
pub struct AppState {
    broker: Arc<ResponseBroker>,
    poll_interval: Duration,
    error_backoff: Duration,
    event_tx: broadcast::Sender<DispatchEvent>,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn new(broker: Arc<ResponseBroker>, poll_interval: Duration, error_backoff: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            broker,
            poll_interval,
            error_backoff,
            event_tx,
            shutdown_tx,
        }
    }

    /// The shared response broker.
    pub fn broker(&self) -> &Arc<ResponseBroker> {
        &self.broker
    }

    /// Get a receiver for dispatch events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DispatchEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn one watch loop for `surface`.
    pub fn spawn_watcher(&self, surface: Arc<dyn Surface>) -> JoinHandle<()> {
        let watch_loop = WatchLoop::new(
            surface,
            Arc::clone(&self.broker),
            self.poll_interval,
            self.error_backoff,
            self.event_tx.clone(),
            self.shutdown_tx.subscribe(),
        );
        tokio::spawn(watch_loop.run())
    }

    /// Signal every watch loop to stop.
    ///
    /// Loops abort an in-flight surface read but let an in-flight dispatch
    /// complete naturally; await the handles from [`Self::spawn_watcher`]
    /// for a clean drain.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
