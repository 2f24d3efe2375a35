use crate::lifecycle::ActivationGate;
use crate::notification::NotificationDispatcher;
use crate::snapshot::{FetchError, SnapshotSource};
use crate::store::{EntityStore, SnapshotDelta};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Fetches full snapshots and applies them to the store.
///
/// A fetch is tagged with the activation epoch current when it started. Its
/// result is applied only if that epoch is still current when it completes.
pub struct SnapshotLoader {
    source: Arc<dyn SnapshotSource>,
    store: Arc<EntityStore>,
    dispatcher: Arc<NotificationDispatcher>,
    gate: Arc<ActivationGate>,
}

impl SnapshotLoader {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<EntityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        gate: Arc<ActivationGate>,
    ) -> Self {
        Self {
            source,
            store,
            dispatcher,
            gate,
        }
    }

    /// Fetch and apply a snapshot for the current activation
    pub async fn load(&self) -> Result<SnapshotDelta, FetchError> {
        match self.gate.current() {
            Some(epoch) => self.load_in(epoch).await,
            None => {
                debug!("Snapshot load requested while inactive");
                self.store.metrics.record_discarded();
                Err(FetchError::Discarded)
            }
        }
    }

    /// Fetch and apply a snapshot on behalf of `epoch`.
    ///
    /// On failure the store is left untouched.
    pub async fn load_in(&self, epoch: u64) -> Result<SnapshotDelta, FetchError> {
        let records = match self.source.fetch_records().await {
            Ok(records) => records,
            Err(e) => {
                self.store.metrics.record_snapshot_failed();
                match &e {
                    FetchError::Transport(_) => {
                        error!(error = %e, epoch, "Snapshot fetch failed, keeping current state")
                    }
                    _ => warn!(error = %e, epoch, "Snapshot fetch failed, keeping current state"),
                }
                return Err(e);
            }
        };

        let count = records.len();
        let applied = self.gate.run(epoch, || {
            let delta = self.store.upsert_records(records);
            self.dispatcher.dispatch_snapshot(&delta);
            delta
        });

        match applied {
            Some(delta) => {
                self.store.metrics.record_snapshot_applied();
                Ok(delta)
            }
            None => {
                self.store.metrics.record_discarded();
                info!(epoch, entities = count, "Snapshot arrived after deactivation, discarded");
                Err(FetchError::Discarded)
            }
        }
    }

    /// Load once (if `load_first`) and then every `interval_seconds` until
    /// `shutdown` flips or the epoch is closed. A zero interval disables the
    /// periodic part.
    pub async fn run_refresh_loop(
        &self,
        epoch: u64,
        load_first: bool,
        interval_seconds: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if load_first {
            tokio::select! {
                _ = self.load_in(epoch) => {}
                _ = shutdown.changed() => {
                    debug!(epoch, "Initial snapshot load cancelled");
                    return;
                }
            }
        }

        if interval_seconds == 0 {
            return;
        }

        info!(epoch, interval_seconds, "Starting snapshot refresh loop");

        let mut timer = interval(Duration::from_secs(interval_seconds));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown.changed() => break,
            }

            if !self.gate.is_open(epoch) {
                break;
            }

            tokio::select! {
                _ = self.load_in(epoch) => {}
                _ = shutdown.changed() => break,
            }
        }

        debug!(epoch, "Snapshot refresh loop stopped");
    }
}
