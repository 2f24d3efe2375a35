use crate::entity::{Entity, EntityId, FieldChange};
use crate::notification::{Notification, NotificationDispatcher};
use crate::store::{EntityStore, StoreChange};
use std::collections::HashSet;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::warn;


/// Update delivered to a screen
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    Changed(FieldChange),
    Notification(Notification),
    /// The whole set may have moved; re-read from the store
    Resync,
}

/// Read-only subscription for one screen.
///
/// An empty filter follows every entity.
pub struct ViewSubscription {
    filter: HashSet<EntityId>,
    changes: Receiver<StoreChange>,
    notifications: Receiver<Notification>,
    notifications_open: bool,
}

impl ViewSubscription {
    pub fn new(store: &EntityStore, dispatcher: &NotificationDispatcher) -> Self {
        Self {
            filter: HashSet::new(),
            changes: store.subscribe(),
            notifications: dispatcher.subscribe(),
            notifications_open: true,
        }
    }

    pub fn watch(&mut self, entity_id: impl Into<EntityId>) {
        self.filter.insert(entity_id.into());
    }

    pub fn unwatch(&mut self, entity_id: &EntityId) {
        self.filter.remove(entity_id);
    }

    pub fn is_watching(&self, entity_id: &EntityId) -> bool {
        self.filter.is_empty() || self.filter.contains(entity_id)
    }

    /// Current state of the watched entities
    pub fn entities(&self, store: &EntityStore) -> Vec<Entity> {
        if self.filter.is_empty() {
            return store.list();
        }
        store
            .list()
            .into_iter()
            .filter(|entity| self.filter.contains(&entity.id))
            .collect()
    }

    /// Next event for this screen. None once the store is gone.
    pub async fn next(&mut self) -> Option<ViewEvent> {
        loop {
            tokio::select! {
                change = self.changes.recv() => {
                    match change {
                        Ok(StoreChange::FieldChanged(change)) => {
                            if self.is_watching(&change.entity_id) {
                                return Some(ViewEvent::Changed(change));
                            }
                        }
                        Ok(StoreChange::Evicted { entity_id }) => {
                            if self.is_watching(&entity_id) {
                                return Some(ViewEvent::Resync);
                            }
                        }
                        Ok(StoreChange::SnapshotReplaced { .. }) | Ok(StoreChange::Cleared) => {
                            return Some(ViewEvent::Resync);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "View lagged behind store changes");
                            return Some(ViewEvent::Resync);
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
                notification = self.notifications.recv(), if self.notifications_open => {
                    match notification {
                        Ok(notification) => {
                            if self.is_watching(&notification.entity_id) {
                                return Some(ViewEvent::Notification(notification));
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "View lagged behind notifications");
                            return Some(ViewEvent::Resync);
                        }
                        Err(RecvError::Closed) => self.notifications_open = false,
                    }
                }
            }
        }
    }
}
