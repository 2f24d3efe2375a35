// End-to-end reconciliation: snapshot + push events through the lifecycle controller

mod common;

use common::{eventually, settle, truck, FleetApi, MemoryChannel};
use fleetlive::config::FleetConfig;
use fleetlive::entity::{EntityId, Field, FieldValue};
use fleetlive::event::{AREA_ENTERED, REACHABILITY_DISCONNECTED};
use fleetlive::lifecycle::LifecycleController;
use fleetlive::view::{ViewEvent, ViewSubscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn controller(api: &Arc<FleetApi>, channel: &Arc<MemoryChannel>) -> LifecycleController {
    LifecycleController::from_config(&FleetConfig::default(), api.clone(), channel.clone())
}

#[tokio::test]
async fn test_snapshot_then_event_updates_store_and_notifies_once() {
    let api = FleetApi::with_trucks(vec![truck(1, true, false)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    let mut notifications = controller.dispatcher().subscribe();

    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.contains(&EntityId::Int(1))).await);

    channel.publish(
        "fleet.status.1",
        r#"{"entity_id": 1, "properties": {"reachable": false}}"#,
    );
    assert!(eventually(|| !store.get(&EntityId::Int(1)).unwrap().reachable).await);

    let entity = store.get(&EntityId::Int(1)).unwrap();
    assert!(!entity.queued);

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.entity_id, EntityId::Int(1));
    assert_eq!(notification.field, Field::Reachable);
    assert_eq!(notification.new_value, FieldValue::Reachable(false));
    settle().await;
    assert!(matches!(notifications.try_recv(), Err(TryRecvError::Empty)));

    controller.deactivate().await;
}

#[tokio::test]
async fn test_cloud_event_uses_subject_for_entity() {
    let api = FleetApi::with_trucks(vec![truck(3, true, false)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.contains(&EntityId::Int(3))).await);

    channel.publish(
        "fleet.status.3",
        &format!(r#"{{"type": "{}", "id": "evt-1"}}"#, AREA_ENTERED),
    );
    channel.publish(
        "fleet.status.3",
        &format!(r#"{{"type": "{}", "id": "evt-2"}}"#, REACHABILITY_DISCONNECTED),
    );

    assert!(
        eventually(|| {
            let entity = store.get(&EntityId::Int(3)).unwrap();
            entity.queued && !entity.reachable
        })
        .await
    );

    controller.deactivate().await;
}

#[tokio::test]
async fn test_client_record_updates_apply_by_id() {
    let api = FleetApi::with_trucks(vec![truck(1, true, false)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    let mut notifications = controller.dispatcher().subscribe();
    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.contains(&EntityId::Int(1))).await);

    channel.publish("reachability", r#"{"id": 1, "isReachable": false}"#);
    channel.publish("queue", r#"{"id": 1, "isQueued": true}"#);

    assert!(
        eventually(|| {
            let entity = store.get(&EntityId::Int(1)).unwrap();
            entity.queued && !entity.reachable
        })
        .await
    );
    assert_eq!(store.metrics.snapshot().events_malformed, 0);

    let first = notifications.recv().await.unwrap();
    assert_eq!(first.new_value, FieldValue::Reachable(false));
    let second = notifications.recv().await.unwrap();
    assert_eq!(second.new_value, FieldValue::Queued(true));

    controller.deactivate().await;
}

#[tokio::test]
async fn test_unknown_and_malformed_messages_are_dropped() {
    let api = FleetApi::with_trucks(vec![truck(1, true, false)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.len() == 1).await);

    channel.publish(
        "fleet.status.99",
        r#"{"entity_id": 99, "properties": {"reachable": true}}"#,
    );
    channel.publish("fleet.status.1", r#"{"entity_id": 1, "properties": {"speed": 80}}"#);
    channel.publish("fleet.status.1", "not json");

    assert!(eventually(|| store.metrics.snapshot().events_received == 3).await);
    let metrics = store.metrics.snapshot();
    assert_eq!(metrics.events_dropped_unknown, 1);
    assert_eq!(metrics.events_malformed, 2);
    assert_eq!(store.len(), 1);
    assert!(!store.contains(&EntityId::Int(99)));

    // A later snapshot brings 99 in
    api.set_trucks(vec![truck(1, true, false), truck(99, false, true)]);
    controller.refresh().await.unwrap();
    assert!(store.get(&EntityId::Int(99)).unwrap().queued);

    controller.deactivate().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_state() {
    let api = FleetApi::with_trucks(vec![truck(1, true, false), truck(2, true, true)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.len() == 2).await);

    api.set_failing(true);
    assert!(controller.refresh().await.is_err());

    assert_eq!(store.len(), 2);
    assert_eq!(store.metrics.snapshot().snapshots_failed, 1);

    controller.deactivate().await;
}

#[tokio::test]
async fn test_view_follows_one_truck() {
    let api = FleetApi::with_trucks(vec![truck(1, true, false), truck(2, true, false)]);
    let channel = MemoryChannel::new();
    let mut controller = controller(&api, &channel);
    controller.activate().await.unwrap();
    let store = Arc::clone(controller.store());
    assert!(eventually(|| store.len() == 2).await);

    let mut view = ViewSubscription::new(&store, controller.dispatcher());
    view.watch(2);

    channel.publish("fleet.status.1", r#"{"entity_id": 1, "properties": {"queued": true}}"#);
    channel.publish("fleet.status.2", r#"{"entity_id": 2, "properties": {"queued": true}}"#);

    let mut saw_change = false;
    let mut saw_notification = false;
    while !(saw_change && saw_notification) {
        let event = tokio::time::timeout(Duration::from_secs(1), view.next())
            .await
            .unwrap()
            .unwrap();
        match event {
            ViewEvent::Changed(change) => {
                assert_eq!(change.entity_id, EntityId::Int(2));
                saw_change = true;
            }
            ViewEvent::Notification(notification) => {
                assert_eq!(notification.entity_id, EntityId::Int(2));
                assert_eq!(notification.message, "Truck is now in queue");
                assert_eq!(notification.suggested_action.target, "/management/truck/2");
                saw_notification = true;
            }
            ViewEvent::Resync => {}
        }
    }

    assert_eq!(view.entities(&store).len(), 1);
    controller.deactivate().await;
}
