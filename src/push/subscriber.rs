use crate::event::{decode, DecodeError};
use crate::lifecycle::ActivationGate;
use crate::notification::NotificationDispatcher;
use crate::push::{PushMessage, PushStream};
use crate::store::{EntityStore, EventOutcome};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What happened to one push message
#[derive(Debug, PartialEq)]
pub enum MessageOutcome {
    /// Merged into the store. `changed` counts fields whose value moved.
    Applied { changed: usize, notified: usize },
    Malformed(DecodeError),
    UnknownEntity,
    /// Arrived after the activation ended
    Discarded,
}

/// Merges push messages into the store on behalf of one activation
pub struct EventSubscriber {
    store: Arc<EntityStore>,
    dispatcher: Arc<NotificationDispatcher>,
    gate: Arc<ActivationGate>,
    epoch: u64,
}

impl EventSubscriber {
    pub fn new(
        store: Arc<EntityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        gate: Arc<ActivationGate>,
        epoch: u64,
    ) -> Self {
        Self {
            store,
            dispatcher,
            gate,
            epoch,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Decode one message and apply it if the activation is still current
    pub fn handle_message(&self, message: &PushMessage) -> MessageOutcome {
        let metrics = &self.store.metrics;
        metrics.record_received();

        let event = match decode(&message.subject, &message.payload) {
            Ok(event) => event,
            Err(e) => {
                metrics.record_malformed();
                warn!(subject = %message.subject, error = %e, "Malformed push message dropped");
                return MessageOutcome::Malformed(e);
            }
        };

        let outcome = self.gate.run(self.epoch, || {
            let outcome = self.store.apply_event(&event);
            let notified = self.dispatcher.dispatch_all(outcome.changes()).len();
            (outcome, notified)
        });

        match outcome {
            Some((EventOutcome::Applied(changes), notified)) => {
                metrics.record_applied();
                MessageOutcome::Applied {
                    changed: changes.len(),
                    notified,
                }
            }
            Some((EventOutcome::UnknownEntity, _)) => {
                metrics.record_dropped_unknown();
                MessageOutcome::UnknownEntity
            }
            None => {
                metrics.record_discarded();
                debug!(entity_id = %event.entity_id, epoch = self.epoch, "Push event after deactivation discarded");
                MessageOutcome::Discarded
            }
        }
    }

    /// Consume `messages` until `shutdown` flips, the stream ends or the
    /// activation closes
    pub async fn run(self, mut messages: PushStream, mut shutdown: watch::Receiver<bool>) {
        info!(epoch = self.epoch, "Event subscriber started");

        loop {
            let message = tokio::select! {
                message = messages.next() => message,
                _ = shutdown.changed() => {
                    debug!(epoch = self.epoch, "Event subscriber shutting down");
                    return;
                }
            };

            let message = match message {
                Some(message) => message,
                None => {
                    warn!(epoch = self.epoch, "Push stream ended");
                    return;
                }
            };

            if self.handle_message(&message) == MessageOutcome::Discarded {
                debug!(epoch = self.epoch, "Activation closed, event subscriber stopping");
                return;
            }
        }
    }
}
