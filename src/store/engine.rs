use crate::entity::{Entity, EntityId, FieldChange, FieldValue, SnapshotRecord};
use crate::event::PushEvent;
use crate::metrics::ReconcileMetrics;
use crate::store::change::{ApplyOutcome, EventOutcome, SnapshotDelta, StoreChange};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub const DEFAULT_CHANGE_CAPACITY: usize = 1000;

/// Merged view of all tracked entities.
///
/// Snapshot replacement and field updates are serialized behind one lock,
/// so readers see either the whole pre-snapshot set or the whole
/// post-snapshot set, and never half of a multi-field event. The most
/// recently applied write to a field wins.
///
/// Updates naming an entity that is not in the store are dropped with a
/// warning; entities only come into existence through a snapshot.
pub struct EntityStore {
    entities: RwLock<BTreeMap<EntityId, Entity>>,

    /// Broadcast channel for store changes
    change_tx: broadcast::Sender<StoreChange>,

    /// Shared counters for the reconciliation pipeline
    pub metrics: ReconcileMetrics,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Create a store whose change channel buffers `capacity` changes per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (change_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            entities: RwLock::new(BTreeMap::new()),
            change_tx,
            metrics: ReconcileMetrics::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<EntityId, Entity>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<EntityId, Entity>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the full entity set.
    ///
    /// Entities missing from `entities` are removed. Duplicate ids keep the
    /// later record.
    pub fn upsert_snapshot(&self, entities: Vec<Entity>) -> SnapshotDelta {
        self.upsert_records(entities.into_iter().map(SnapshotRecord::from).collect())
    }

    /// Replace the full entity set from records that may leave fields
    /// unreported.
    ///
    /// An unreported field keeps its stored value when the entity survives
    /// the replace; a new entity takes the record's value as is.
    pub fn upsert_records(&self, records: Vec<SnapshotRecord>) -> SnapshotDelta {
        let now = Utc::now();

        let mut incoming = BTreeMap::new();
        for record in records {
            if let Some(previous) = incoming.insert(record.id().clone(), record) {
                warn!(
                    entity_id = %previous.id(),
                    "Snapshot contains duplicate entity, keeping the later record"
                );
            }
        }

        let mut entities = self.write();
        let next: BTreeMap<EntityId, Entity> = incoming
            .into_iter()
            .map(|(id, record)| {
                let entity = record.resolve(entities.get(&id), now);
                (id, entity)
            })
            .collect();
        let delta = SnapshotDelta::between(&entities, &next, now);
        *entities = next;
        let entity_count = entities.len();

        let _ = self.change_tx.send(StoreChange::SnapshotReplaced {
            entity_count,
            added: delta.added.clone(),
            removed: delta.removed.clone(),
        });
        drop(entities);

        info!(
            entities = entity_count,
            added = delta.added.len(),
            removed = delta.removed.len(),
            changed_fields = delta.changes.len(),
            "Applied snapshot"
        );

        delta
    }

    /// Update one field of one entity
    pub fn apply_field_update(&self, entity_id: &EntityId, value: FieldValue) -> ApplyOutcome {
        let now = Utc::now();
        let field = value.field();

        let mut entities = self.write();
        let entity = match entities.get_mut(entity_id) {
            Some(entity) => entity,
            None => {
                warn!(
                    entity_id = %entity_id,
                    field = %field,
                    "Update for unknown entity dropped"
                );
                return ApplyOutcome::UnknownEntity;
            }
        };

        match entity.set(value.clone(), now) {
            Some(old_value) => {
                let change = FieldChange {
                    entity_id: entity_id.clone(),
                    old_value,
                    new_value: value,
                    timestamp: now,
                };
                let _ = self.change_tx.send(StoreChange::FieldChanged(change.clone()));
                drop(entities);

                debug!(entity_id = %entity_id, field = %field, value = %change.new_value, "Field updated");
                ApplyOutcome::Changed(change)
            }
            None => ApplyOutcome::Unchanged,
        }
    }

    /// Apply every change of a push event as one write.
    ///
    /// Later changes to the same field within the event win.
    pub fn apply_event(&self, event: &PushEvent) -> EventOutcome {
        let now = Utc::now();

        let mut entities = self.write();
        let entity = match entities.get_mut(&event.entity_id) {
            Some(entity) => entity,
            None => {
                warn!(
                    entity_id = %event.entity_id,
                    fields = event.changes.len(),
                    "Event for unknown entity dropped"
                );
                return EventOutcome::UnknownEntity;
            }
        };

        let mut changes = Vec::new();
        for value in &event.changes {
            if let Some(old_value) = entity.set(value.clone(), now) {
                changes.push(FieldChange {
                    entity_id: event.entity_id.clone(),
                    old_value,
                    new_value: value.clone(),
                    timestamp: now,
                });
            }
        }

        for change in &changes {
            let _ = self.change_tx.send(StoreChange::FieldChanged(change.clone()));
        }
        drop(entities);

        debug!(
            entity_id = %event.entity_id,
            fields = event.changes.len(),
            changed = changes.len(),
            "Event applied"
        );

        EventOutcome::Applied(changes)
    }

    /// Get entity by ID
    pub fn get(&self, entity_id: &EntityId) -> Option<Entity> {
        self.read().get(entity_id).cloned()
    }

    /// All entities, ordered by ID
    pub fn list(&self) -> Vec<Entity> {
        self.read().values().cloned().collect()
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.read().contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove one entity on behalf of an external caller
    pub fn evict(&self, entity_id: &EntityId) -> Option<Entity> {
        let mut entities = self.write();
        let removed = entities.remove(entity_id);

        if removed.is_some() {
            let _ = self.change_tx.send(StoreChange::Evicted {
                entity_id: entity_id.clone(),
            });
            drop(entities);
            info!(entity_id = %entity_id, "Entity evicted");
        }

        removed
    }

    /// Remove every entity
    pub fn clear(&self) {
        let mut entities = self.write();
        let count = entities.len();
        entities.clear();
        let _ = self.change_tx.send(StoreChange::Cleared);
        drop(entities);

        info!(entities = count, "Store cleared");
    }

    /// Subscribe to store changes
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.change_tx.subscribe()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
