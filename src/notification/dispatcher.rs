use crate::entity::{Field, FieldChange, FieldValue};
use crate::metrics::ReconcileMetrics;
use crate::notification::{Notification, NotificationConfig, SuggestedAction};
use crate::store::SnapshotDelta;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Synchronous notification hook.
///
/// Runs on the writer's thread while the write is still gated, so it must be
/// quick and must not register further callbacks.
pub type NotificationCallback = Box<dyn Fn(&Notification) + Send + Sync>;

/// Turns field changes on watched fields into notifications.
///
/// Every change yields its own notification; nothing is coalesced. Changes
/// whose old and new values are equal are ignored.
pub struct NotificationDispatcher {
    config: NotificationConfig,
    watched: HashSet<Field>,
    tx: broadcast::Sender<Notification>,
    callbacks: RwLock<Vec<NotificationCallback>>,
    metrics: ReconcileMetrics,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, metrics: ReconcileMetrics) -> Self {
        let (tx, _) = broadcast::channel(config.capacity.max(1));
        let watched = config.watched_fields.iter().copied().collect();

        Self {
            config,
            watched,
            tx,
            callbacks: RwLock::new(Vec::new()),
            metrics,
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn is_watched(&self, field: Field) -> bool {
        self.watched.contains(&field)
    }

    /// Emit a notification for one change, if its field is watched and the
    /// value actually moved.
    pub fn dispatch(&self, change: &FieldChange) -> Option<Notification> {
        if change.is_noop() || !self.is_watched(change.field()) {
            return None;
        }

        let notification = self.build(change);

        {
            let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
            for callback in callbacks.iter() {
                callback(&notification);
            }
        }

        // No subscribers is fine
        let _ = self.tx.send(notification.clone());
        self.metrics.record_notification();

        debug!(
            entity_id = %notification.entity_id,
            field = %notification.field,
            value = %notification.new_value,
            "Notification emitted"
        );

        Some(notification)
    }

    /// Dispatch each change in order
    pub fn dispatch_all(&self, changes: &[FieldChange]) -> Vec<Notification> {
        changes.iter().filter_map(|c| self.dispatch(c)).collect()
    }

    /// Dispatch field changes carried by a snapshot, when enabled
    pub fn dispatch_snapshot(&self, delta: &SnapshotDelta) -> Vec<Notification> {
        if !self.config.notify_on_snapshot {
            return Vec::new();
        }
        self.dispatch_all(&delta.changes)
    }

    /// Subscribe to the notification queue
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Register a callback invoked for every notification
    pub fn on_notification<F>(&self, callback: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        callbacks.push(Box::new(callback));
        info!(callbacks = callbacks.len(), "Notification callback registered");
    }

    fn build(&self, change: &FieldChange) -> Notification {
        let field = change.field();
        let id = change.entity_id.to_string();

        Notification {
            id: Uuid::now_v7(),
            entity_id: change.entity_id.clone(),
            field,
            new_value: change.new_value.clone(),
            previous_value: change.old_value.clone(),
            title: format!("{}{}", self.config.title_prefix, id),
            message: self.message(&change.new_value),
            display_ms: match field {
                Field::Reachable => self.config.reachability_display_ms,
                Field::Queued => self.config.queue_display_ms,
                _ => self.config.default_display_ms,
            },
            suggested_action: SuggestedAction {
                label: self.config.action_label.clone(),
                target: self.config.action_route.replace("{id}", &id),
            },
            emitted_at: Utc::now(),
        }
    }

    fn message(&self, value: &FieldValue) -> String {
        let noun = &self.config.entity_noun;
        match value {
            FieldValue::Reachable(true) => format!("{} is now reachable", noun),
            FieldValue::Reachable(false) => format!("{} is now unreachable", noun),
            FieldValue::Queued(true) => format!("{} is now in queue", noun),
            FieldValue::Queued(false) => format!("{} is no longer queued", noun),
            other => format!("{} {} changed", noun, other.field()),
        }
    }
}
