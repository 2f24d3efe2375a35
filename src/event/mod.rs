use crate::entity::{EntityId, FieldValue};

mod decode;

pub use decode::{
    decode, DecodeError, AREA_ENTERED, AREA_LEFT, REACHABILITY_DATA, REACHABILITY_DISCONNECTED,
    REACHABILITY_SMS,
};

/// Incremental, field-level update for one entity.
///
/// Delivery is at-least-once and unordered; merging is per field, so
/// applying the same event twice leaves the store unchanged the second time.
#[derive(Clone, Debug, PartialEq)]
pub struct PushEvent {
    pub entity_id: EntityId,

    /// Changed fields, applied in order
    pub changes: Vec<FieldValue>,
}

impl PushEvent {
    pub fn new(entity_id: impl Into<EntityId>, changes: Vec<FieldValue>) -> Self {
        Self {
            entity_id: entity_id.into(),
            changes,
        }
    }

    /// Event carrying a single field change
    pub fn single(entity_id: impl Into<EntityId>, value: FieldValue) -> Self {
        Self::new(entity_id, vec![value])
    }
}
