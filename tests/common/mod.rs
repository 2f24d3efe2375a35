// In-process stand-ins for the fleet API and the NATS subject

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use fleetlive::entity::Entity;
use fleetlive::push::{PushChannel, PushMessage, PushStream};
use fleetlive::snapshot::{FetchError, SnapshotSource};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Push channel fanning published messages out to every live subscription
#[derive(Default)]
pub struct MemoryChannel {
    senders: Mutex<Vec<UnboundedSender<PushMessage>>>,
    fail_subscribe: AtomicBool,
}

impl MemoryChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Deliver to every open subscription; returns how many received it
    pub fn publish(&self, subject: &str, payload: &str) -> usize {
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|tx| !tx.is_closed());
        senders
            .iter()
            .filter(|tx| tx.unbounded_send(PushMessage::new(subject, payload)).is_ok())
            .count()
    }

    pub fn subscribers(&self) -> usize {
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }
}

#[async_trait]
impl PushChannel for MemoryChannel {
    async fn subscribe(&self) -> Result<PushStream> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            bail!("push channel unavailable");
        }
        let (tx, rx) = mpsc::unbounded();
        self.senders.lock().unwrap().push(tx);
        Ok(rx.boxed())
    }
}

/// Fleet API stand-in serving a mutable truck list
#[derive(Default)]
pub struct FleetApi {
    trucks: Mutex<Vec<Entity>>,
    failing: AtomicBool,
    hold: Mutex<Option<Arc<Notify>>>,
    calls: AtomicUsize,
}

impl FleetApi {
    pub fn with_trucks(trucks: Vec<Entity>) -> Arc<Self> {
        let api = Self::default();
        *api.trucks.lock().unwrap() = trucks;
        Arc::new(api)
    }

    pub fn set_trucks(&self, trucks: Vec<Entity>) {
        *self.trucks.lock().unwrap() = trucks;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every later fetch wait until the returned handle is notified
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for FleetApi {
    async fn fetch(&self) -> Result<Vec<Entity>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status(500));
        }
        Ok(self.trucks.lock().unwrap().clone())
    }
}

pub fn truck(id: i64, reachable: bool, queued: bool) -> Entity {
    Entity::new(id, format!("+3360000{:04}", id), reachable, queued)
}

/// Poll `condition` until it holds or a second has passed
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Give spawned tasks a chance to process what is already queued
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
