// User-facing notifications for watched field transitions

pub mod config;
mod dispatcher;

pub use config::NotificationConfig;
pub use dispatcher::{NotificationCallback, NotificationDispatcher};

use crate::entity::{EntityId, Field, FieldValue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;


/// Transient notification describing one field transition
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// UUIDv7, so notifications sort by emission time
    pub id: Uuid,
    pub entity_id: EntityId,
    pub field: Field,
    pub new_value: FieldValue,
    pub previous_value: FieldValue,
    pub title: String,
    pub message: String,
    /// How long the rendering layer should keep it on screen
    pub display_ms: u64,
    pub suggested_action: SuggestedAction,
    pub emitted_at: DateTime<Utc>,
}

/// Follow-up offered with a notification.
///
/// `target` is opaque to this crate (a route in the fleet UI); the
/// rendering layer decides whether to navigate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuggestedAction {
    pub label: String,
    pub target: String,
}
