use super::*;
use serde_json::json;

#[test]
fn test_entity_id_from_token() {
    assert_eq!(EntityId::from_token("42"), Some(EntityId::Int(42)));
    assert_eq!(EntityId::from_token("-3"), Some(EntityId::Int(-3)));
    assert_eq!(
        EntityId::from_token("truck-7"),
        Some(EntityId::Name("truck-7".to_string()))
    );
    assert_eq!(EntityId::from_token(""), None);
}

#[test]
fn test_entity_id_wire_format() {
    let int: EntityId = serde_json::from_value(json!(5)).unwrap();
    assert_eq!(int, EntityId::Int(5));

    let name: EntityId = serde_json::from_value(json!("alpha")).unwrap();
    assert_eq!(name, EntityId::Name("alpha".to_string()));

    assert_eq!(serde_json::to_value(EntityId::Int(9)).unwrap(), json!(9));
    assert_eq!(EntityId::Int(9).to_string(), "9");
}

#[test]
fn test_entity_id_ordering_puts_integers_first() {
    let mut ids = vec![
        EntityId::from("b"),
        EntityId::Int(10),
        EntityId::from("a"),
        EntityId::Int(2),
    ];
    ids.sort();
    assert_eq!(
        ids,
        vec![
            EntityId::Int(2),
            EntityId::Int(10),
            EntityId::from("a"),
            EntityId::from("b"),
        ]
    );
}

#[test]
fn test_field_parse_accepts_api_aliases() {
    assert_eq!(Field::parse("reachable"), Some(Field::Reachable));
    assert_eq!(Field::parse("isReachable"), Some(Field::Reachable));
    assert_eq!(Field::parse("isQueued"), Some(Field::Queued));
    assert_eq!(Field::parse("coords"), Some(Field::Location));
    assert_eq!(Field::parse("phone_number"), Some(Field::PhoneNumber));
    assert_eq!(Field::parse("speed"), None);
}

#[test]
fn test_field_serde_names() {
    assert_eq!(serde_json::to_value(Field::PhoneNumber).unwrap(), json!("phoneNumber"));
    let field: Field = serde_json::from_value(json!("isQueued")).unwrap();
    assert_eq!(field, Field::Queued);
}

#[test]
fn test_set_reports_previous_value_only_on_change() {
    let mut truck = Entity::new(1, "+33600000001", true, false);
    let now = Utc::now();

    assert_eq!(truck.set(FieldValue::Reachable(true), now), None);
    assert_eq!(
        truck.set(FieldValue::Reachable(false), now),
        Some(FieldValue::Reachable(true))
    );
    assert!(!truck.reachable);

    let here = Coordinates::new(48.85, 2.35);
    assert_eq!(
        truck.set(FieldValue::Location(Some(here)), now),
        Some(FieldValue::Location(None))
    );
    assert_eq!(truck.location, Some(here));
}

#[test]
fn test_same_state_ignores_timestamp() {
    let a = Entity::new(1, "+33600000001", true, false);
    let mut b = a.clone();
    b.last_updated = a.last_updated + chrono::Duration::seconds(30);
    assert!(a.same_state(&b));

    b.queued = true;
    assert!(!a.same_state(&b));
}

#[test]
fn test_entity_serializes_camel_case() {
    let truck = Entity::new(3, "+33600000003", false, true)
        .with_location(Coordinates::new(1.5, 2.5));
    let value = serde_json::to_value(&truck).unwrap();

    assert_eq!(value["id"], json!(3));
    assert_eq!(value["phoneNumber"], json!("+33600000003"));
    assert_eq!(value["queued"], json!(true));
    assert_eq!(value["location"]["latitude"], json!(1.5));
    assert!(value.get("lastUpdated").is_some());
}

#[test]
fn test_field_value_display() {
    assert_eq!(FieldValue::Queued(true).to_string(), "true");
    assert_eq!(FieldValue::Location(None).to_string(), "unknown");
    assert_eq!(
        FieldValue::Location(Some(Coordinates::new(1.0, 2.0))).to_string(),
        "1,2"
    );
}
