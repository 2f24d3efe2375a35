//! Activation and deactivation of live reconciliation.
//!
//! While active, one event subscriber task and one snapshot refresh task
//! write into the store. Deactivation closes the activation gate before
//! anything else, so nothing from the ended activation can reach the store
//! or the dispatcher afterwards, even if a task has not yet observed the
//! shutdown signal.

use crate::config::FleetConfig;
use crate::notification::NotificationDispatcher;
use crate::push::{EventSubscriber, PushChannel};
use crate::snapshot::{FetchError, SnapshotLoader, SnapshotSource};
use crate::store::{EntityStore, SnapshotDelta};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod config;
mod gate;

pub use config::LifecycleConfig;
pub use gate::ActivationGate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Inactive,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Inactive => f.write_str("inactive"),
            LifecycleState::Active => f.write_str("active"),
        }
    }
}

struct Session {
    epoch: u64,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

/// Starts and stops the subscriber and the snapshot loader together
pub struct LifecycleController {
    store: Arc<EntityStore>,
    dispatcher: Arc<NotificationDispatcher>,
    loader: Arc<SnapshotLoader>,
    channel: Arc<dyn PushChannel>,
    gate: Arc<ActivationGate>,
    config: LifecycleConfig,
    refresh_interval_seconds: u64,
    session: Option<Session>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<EntityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        source: Arc<dyn SnapshotSource>,
        channel: Arc<dyn PushChannel>,
        config: LifecycleConfig,
        refresh_interval_seconds: u64,
    ) -> Self {
        let gate = Arc::new(ActivationGate::new());
        let loader = Arc::new(SnapshotLoader::new(
            source,
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            Arc::clone(&gate),
        ));

        Self {
            store,
            dispatcher,
            loader,
            channel,
            gate,
            config,
            refresh_interval_seconds,
            session: None,
        }
    }

    /// Build the store, dispatcher and controller from configuration
    pub fn from_config(
        config: &FleetConfig,
        source: Arc<dyn SnapshotSource>,
        channel: Arc<dyn PushChannel>,
    ) -> Self {
        let store = Arc::new(EntityStore::with_capacity(config.store.change_capacity));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            config.notifications.clone(),
            store.metrics.clone(),
        ));

        Self::new(
            store,
            dispatcher,
            source,
            channel,
            config.lifecycle.clone(),
            config.snapshot.refresh_interval_seconds,
        )
    }

    /// Open a new activation: subscribe to push events and start loading
    /// snapshots. Activating an active controller does nothing.
    pub async fn activate(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            warn!(epoch = session.epoch, "Already active, ignoring activate");
            return Ok(());
        }

        let epoch = self.gate.open();

        let messages = match self.channel.subscribe().await {
            Ok(messages) => messages,
            Err(e) => {
                self.gate.close();
                return Err(e).context("Failed to subscribe to push channel");
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let subscriber = EventSubscriber::new(
            Arc::clone(&self.store),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.gate),
            epoch,
        );
        tasks.push((
            "event-subscriber",
            tokio::spawn(subscriber.run(messages, shutdown_rx.clone())),
        ));

        let load_first = self.config.load_snapshot_on_activate;
        let interval_seconds = self.refresh_interval_seconds;
        if load_first || interval_seconds > 0 {
            let loader = Arc::clone(&self.loader);
            tasks.push((
                "snapshot-refresh",
                tokio::spawn(async move {
                    loader
                        .run_refresh_loop(epoch, load_first, interval_seconds, shutdown_rx)
                        .await
                }),
            ));
        }

        info!(
            epoch,
            load_snapshot = load_first,
            refresh_interval_seconds = interval_seconds,
            "Live reconciliation activated"
        );

        self.session = Some(Session {
            epoch,
            shutdown_tx,
            tasks,
        });

        Ok(())
    }

    /// End the current activation.
    ///
    /// Returns once no write from the ended activation can still land.
    /// Deactivating an inactive controller does nothing.
    pub async fn deactivate(&mut self) {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                debug!("Already inactive, ignoring deactivate");
                return;
            }
        };

        // Closing waits for any write already holding the gate
        self.gate.close();
        let _ = session.shutdown_tx.send(true);

        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        for (name, mut handle) in session.tasks {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => debug!(task = name, "Task stopped"),
                Ok(Err(e)) => warn!(task = name, error = %e, "Task ended abnormally"),
                Err(_) => {
                    warn!(task = name, "Task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        if self.config.clear_on_deactivate {
            self.store.clear();
        }

        let metrics = self.store.metrics.snapshot();
        info!(
            epoch = session.epoch,
            events_received = metrics.events_received,
            events_applied = metrics.events_applied,
            events_malformed = metrics.events_malformed,
            events_dropped_unknown = metrics.events_dropped_unknown,
            events_discarded = metrics.events_discarded,
            snapshots_applied = metrics.snapshots_applied,
            snapshots_failed = metrics.snapshots_failed,
            notifications_emitted = metrics.notifications_emitted,
            "Live reconciliation deactivated"
        );
    }

    /// Load a snapshot now, outside the periodic schedule
    pub async fn refresh(&self) -> Result<SnapshotDelta, FetchError> {
        self.loader.load().await
    }

    pub fn state(&self) -> LifecycleState {
        if self.session.is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Inactive
        }
    }

    /// Epoch of the current activation
    pub fn epoch(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.epoch)
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn loader(&self) -> &Arc<SnapshotLoader> {
        &self.loader
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.gate.close();
            for (_, handle) in session.tasks {
                handle.abort();
            }
        }
    }
}
