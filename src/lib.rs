// Configuration loading
pub mod config;

// Entity model and field values
pub mod entity;

// Push event model and wire decoding
pub mod event;

// Activation lifecycle and write gating
pub mod lifecycle;

// Reconciliation counters
pub mod metrics;

// Notifications for watched field transitions
pub mod notification;

// Push channel, NATS transport and event subscriber
pub mod push;

// Snapshot sources and loader
pub mod snapshot;

// Merged entity store
pub mod store;

// Per-screen read-only subscriptions
pub mod view;

pub use config::{load_config, FleetConfig};
pub use entity::{Coordinates, Entity, EntityId, Field, FieldChange, FieldValue, SnapshotRecord};
pub use event::PushEvent;
pub use lifecycle::{LifecycleController, LifecycleState};
pub use notification::{Notification, NotificationDispatcher};
pub use store::EntityStore;
pub use view::{ViewEvent, ViewSubscription};
