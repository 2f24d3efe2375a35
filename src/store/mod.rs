// Merged entity view shared by the subscriber, the loader and readers

mod change;
mod engine;

pub use change::{ApplyOutcome, EventOutcome, SnapshotDelta, StoreChange};
pub use engine::{EntityStore, DEFAULT_CHANGE_CAPACITY};
