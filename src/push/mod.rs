//! Push side of reconciliation: the message channel seam, its NATS
//! implementation, and the subscriber that merges decoded events into the
//! store.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod nats;
mod subscriber;

pub use nats::{NatsConfig, NatsPushChannel};
pub use subscriber::{EventSubscriber, MessageOutcome};


/// Raw message as delivered by the push channel
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl PushMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

pub type PushStream = BoxStream<'static, PushMessage>;

/// Source of push messages.
///
/// Each call to `subscribe` opens a fresh subscription; dropping the stream
/// unsubscribes.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self) -> Result<PushStream>;
}
