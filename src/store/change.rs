use crate::entity::{Entity, EntityId, Field, FieldChange};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Change notification broadcast to store subscribers
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreChange {
    /// One field of one entity changed value
    FieldChanged(FieldChange),

    /// The full entity set was replaced by a snapshot
    SnapshotReplaced {
        entity_count: usize,
        added: Vec<EntityId>,
        removed: Vec<EntityId>,
    },

    /// An entity was evicted by an external caller
    Evicted { entity_id: EntityId },

    /// Every entity was removed (lifecycle teardown)
    Cleared,
}

impl StoreChange {
    /// Entity this change is about, if it concerns exactly one
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            StoreChange::FieldChanged(change) => Some(&change.entity_id),
            StoreChange::Evicted { entity_id } => Some(entity_id),
            _ => None,
        }
    }
}

/// Result of a single field write
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOutcome {
    Changed(FieldChange),
    /// The entity already held this value
    Unchanged,
    /// The entity is not tracked; the write was dropped
    UnknownEntity,
}

impl ApplyOutcome {
    pub fn change(&self) -> Option<&FieldChange> {
        match self {
            ApplyOutcome::Changed(change) => Some(change),
            _ => None,
        }
    }
}

/// Result of applying a whole push event
#[derive(Clone, Debug, PartialEq)]
pub enum EventOutcome {
    /// Event merged; holds one entry per field whose value actually changed
    Applied(Vec<FieldChange>),
    /// The entity is not tracked; the event was dropped
    UnknownEntity,
}

impl EventOutcome {
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            EventOutcome::Applied(changes) => changes,
            EventOutcome::UnknownEntity => &[],
        }
    }
}

/// Difference between the entity set before and after a snapshot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotDelta {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Field changes on entities present in both sets
    pub changes: Vec<FieldChange>,
}

impl SnapshotDelta {
    pub(crate) fn between(
        before: &BTreeMap<EntityId, Entity>,
        after: &BTreeMap<EntityId, Entity>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut delta = SnapshotDelta::default();

        for (id, next) in after {
            match before.get(id) {
                Some(prev) => {
                    for field in Field::ALL {
                        let old_value = prev.value(field);
                        let new_value = next.value(field);
                        if old_value != new_value {
                            delta.changes.push(FieldChange {
                                entity_id: id.clone(),
                                old_value,
                                new_value,
                                timestamp: now,
                            });
                        }
                    }
                }
                None => delta.added.push(id.clone()),
            }
        }

        delta.removed = before
            .keys()
            .filter(|id| !after.contains_key(*id))
            .cloned()
            .collect();

        delta
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changes.is_empty()
    }
}
