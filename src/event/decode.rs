use super::PushEvent;
use crate::entity::{Coordinates, EntityId, Field, FieldValue};
use serde_json::{Map, Value};
use std::fmt;

pub const REACHABILITY_DATA: &str =
    "org.camaraproject.device-reachability-status-subscriptions.v0.reachability-data";
pub const REACHABILITY_SMS: &str =
    "org.camaraproject.device-reachability-status-subscriptions.v0.reachability-sms";
pub const REACHABILITY_DISCONNECTED: &str =
    "org.camaraproject.device-reachability-status-subscriptions.v0.reachability-disconnected";
pub const AREA_ENTERED: &str = "org.camaraproject.geofencing-subscriptions.v0.area-entered";
pub const AREA_LEFT: &str = "org.camaraproject.geofencing-subscriptions.v0.area-left";

/// Reasons a push message cannot be turned into a PushEvent
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    InvalidJson(String),
    NotAnObject,
    MissingEntityId,
    InvalidEntityId(String),
    MissingProperties,
    EmptyProperties,
    UnknownField(String),
    InvalidValue { field: Field, reason: String },
    UnsupportedEventType(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson(e) => write!(f, "payload is not valid JSON: {}", e),
            DecodeError::NotAnObject => write!(f, "payload must be a JSON object"),
            DecodeError::MissingEntityId => write!(f, "entity_id is required"),
            DecodeError::InvalidEntityId(id) => {
                write!(f, "invalid entity_id '{}': must be an integer or a non-empty string", id)
            }
            DecodeError::MissingProperties => write!(f, "properties object is required"),
            DecodeError::EmptyProperties => write!(f, "properties must name at least one field"),
            DecodeError::UnknownField(name) => write!(f, "unknown field '{}'", name),
            DecodeError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
            DecodeError::UnsupportedEventType(t) => write!(f, "unsupported event type '{}'", t),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a raw push message.
///
/// Three payload shapes are accepted:
/// - field update: `{"entity_id": 7, "properties": {"reachable": false}}`
/// - status CloudEvent: `{"type": "org.camaraproject...area-entered"}`, with
///   the entity taken from `entity_id` or else from the last subject token
///   (`fleet.status.7` -> 7)
/// - record update, as relayed to clients: `{"id": 7, "isReachable": false}`;
///   every key besides `id` must name a field
///
/// Any problem rejects the whole message; nothing is applied partially.
pub fn decode(subject: &str, payload: &[u8]) -> Result<PushEvent, DecodeError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    if object.contains_key("properties") {
        return decode_field_update(object);
    }

    if let Some(event_type) = object.get("type").and_then(Value::as_str) {
        return decode_cloud_event(subject, object, event_type);
    }

    if object.contains_key("id") {
        return decode_record_update(object);
    }

    Err(DecodeError::MissingProperties)
}

fn decode_field_update(object: &Map<String, Value>) -> Result<PushEvent, DecodeError> {
    let entity_id = entity_id_of(object)?.ok_or(DecodeError::MissingEntityId)?;

    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(DecodeError::MissingProperties)?;
    let changes = decode_fields(properties.iter())?;

    Ok(PushEvent { entity_id, changes })
}

fn decode_record_update(object: &Map<String, Value>) -> Result<PushEvent, DecodeError> {
    let entity_id = id_under(object, "id")?.ok_or(DecodeError::MissingEntityId)?;
    let changes = decode_fields(object.iter().filter(|(name, _)| name.as_str() != "id"))?;

    Ok(PushEvent { entity_id, changes })
}

fn decode_fields<'a>(
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<Vec<FieldValue>, DecodeError> {
    let changes = fields
        .map(|(name, value)| {
            let field = Field::parse(name).ok_or_else(|| DecodeError::UnknownField(name.clone()))?;
            decode_value(field, value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if changes.is_empty() {
        return Err(DecodeError::EmptyProperties);
    }
    Ok(changes)
}

fn decode_cloud_event(
    subject: &str,
    object: &Map<String, Value>,
    event_type: &str,
) -> Result<PushEvent, DecodeError> {
    let change = match event_type {
        REACHABILITY_DATA | REACHABILITY_SMS => FieldValue::Reachable(true),
        REACHABILITY_DISCONNECTED => FieldValue::Reachable(false),
        AREA_ENTERED => FieldValue::Queued(true),
        AREA_LEFT => FieldValue::Queued(false),
        other => return Err(DecodeError::UnsupportedEventType(other.to_string())),
    };

    let entity_id = match entity_id_of(object)? {
        Some(id) => id,
        None => subject
            .rsplit('.')
            .next()
            .and_then(EntityId::from_token)
            .ok_or(DecodeError::MissingEntityId)?,
    };

    Ok(PushEvent::single(entity_id, change))
}

fn entity_id_of(object: &Map<String, Value>) -> Result<Option<EntityId>, DecodeError> {
    id_under(object, "entity_id")
}

/// Read an id: JSON integers become `Int`, non-empty strings `Name`.
fn id_under(object: &Map<String, Value>, key: &str) -> Result<Option<EntityId>, DecodeError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|id| Some(EntityId::Int(id)))
            .ok_or_else(|| DecodeError::InvalidEntityId(n.to_string())),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(EntityId::Name(s.clone()))),
        Some(other) => Err(DecodeError::InvalidEntityId(other.to_string())),
    }
}

fn decode_value(field: Field, value: &Value) -> Result<FieldValue, DecodeError> {
    let invalid = |reason: &str| DecodeError::InvalidValue {
        field,
        reason: reason.to_string(),
    };

    match field {
        Field::Reachable => value
            .as_bool()
            .map(FieldValue::Reachable)
            .ok_or_else(|| invalid("expected a boolean")),
        Field::Queued => value
            .as_bool()
            .map(FieldValue::Queued)
            .ok_or_else(|| invalid("expected a boolean")),
        Field::Location => {
            if value.is_null() {
                return Ok(FieldValue::Location(None));
            }
            serde_json::from_value::<Coordinates>(value.clone())
                .map(|c| FieldValue::Location(Some(c)))
                .map_err(|e| invalid(&e.to_string()))
        }
        Field::PhoneNumber => value
            .as_str()
            .map(|s| FieldValue::PhoneNumber(s.to_string()))
            .ok_or_else(|| invalid("expected a string")),
    }
}
