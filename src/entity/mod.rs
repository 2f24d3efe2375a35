use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
mod tests;

/// Identity of a tracked entity.
///
/// The fleet API keys trucks by integer, but other sources use string keys,
/// so both are accepted. Integers order before strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Name(String),
}

impl EntityId {
    /// Parse a bare token (e.g. the last segment of a transport subject).
    ///
    /// Numeric tokens become `Int`, anything else becomes `Name`.
    /// Returns None for an empty token.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        Some(match token.parse::<i64>() {
            Ok(n) => EntityId::Int(n),
            Err(_) => EntityId::Name(token.to_string()),
        })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Name(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Name(value)
    }
}

/// Geographic position of an entity
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Observable fields of an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    #[serde(alias = "isReachable")]
    Reachable,
    #[serde(alias = "isQueued")]
    Queued,
    #[serde(alias = "coords")]
    Location,
    #[serde(alias = "phone_number")]
    PhoneNumber,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Reachable,
        Field::Queued,
        Field::Location,
        Field::PhoneNumber,
    ];

    /// Canonical wire name
    pub fn name(&self) -> &'static str {
        match self {
            Field::Reachable => "reachable",
            Field::Queued => "queued",
            Field::Location => "location",
            Field::PhoneNumber => "phoneNumber",
        }
    }

    /// Resolve a field from its canonical name or one of the fleet API aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "reachable" | "isReachable" => Some(Field::Reachable),
            "queued" | "isQueued" => Some(Field::Queued),
            "location" | "coords" => Some(Field::Location),
            "phoneNumber" | "phone_number" => Some(Field::PhoneNumber),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value for exactly one field. The variant names the field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Reachable(bool),
    Queued(bool),
    Location(Option<Coordinates>),
    PhoneNumber(String),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Reachable(_) => Field::Reachable,
            FieldValue::Queued(_) => Field::Queued,
            FieldValue::Location(_) => Field::Location,
            FieldValue::PhoneNumber(_) => Field::PhoneNumber,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Reachable(b) | FieldValue::Queued(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Reachable(b) | FieldValue::Queued(b) => write!(f, "{}", b),
            FieldValue::Location(Some(c)) => write!(f, "{},{}", c.latitude, c.longitude),
            FieldValue::Location(None) => f.write_str("unknown"),
            FieldValue::PhoneNumber(s) => f.write_str(s),
        }
    }
}

/// A fully populated tracked entity (a truck in the fleet).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,

    pub phone_number: String,

    pub reachable: bool,

    /// True while the truck waits inside the geofenced queue area
    pub queued: bool,

    /// Not carried by the list endpoint, so absent until someone reports it
    #[serde(default)]
    pub location: Option<Coordinates>,

    /// Last write to any field
    pub last_updated: DateTime<Utc>,
}

impl Entity {
    pub fn new(
        id: impl Into<EntityId>,
        phone_number: impl Into<String>,
        reachable: bool,
        queued: bool,
    ) -> Self {
        Self {
            id: id.into(),
            phone_number: phone_number.into(),
            reachable,
            queued,
            location: None,
            last_updated: Utc::now(),
        }
    }

    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    /// Current value of a field
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::Reachable => FieldValue::Reachable(self.reachable),
            Field::Queued => FieldValue::Queued(self.queued),
            Field::Location => FieldValue::Location(self.location),
            Field::PhoneNumber => FieldValue::PhoneNumber(self.phone_number.clone()),
        }
    }

    /// Write one field. Returns the previous value if the write changed it,
    /// None if the entity already held that value.
    pub(crate) fn set(&mut self, value: FieldValue, now: DateTime<Utc>) -> Option<FieldValue> {
        let previous = self.value(value.field());
        if previous == value {
            return None;
        }

        match value {
            FieldValue::Reachable(b) => self.reachable = b,
            FieldValue::Queued(b) => self.queued = b,
            FieldValue::Location(c) => self.location = c,
            FieldValue::PhoneNumber(s) => self.phone_number = s,
        }
        self.last_updated = now;

        Some(previous)
    }

    /// Field-wise equality, ignoring `last_updated`
    pub fn same_state(&self, other: &Entity) -> bool {
        self.id == other.id
            && Field::ALL
                .iter()
                .all(|field| self.value(*field) == other.value(*field))
    }
}

/// A write that changed the value of one field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub entity_id: EntityId,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
    pub timestamp: DateTime<Utc>,
}

impl FieldChange {
    pub fn field(&self) -> Field {
        self.new_value.field()
    }

    pub fn is_noop(&self) -> bool {
        self.old_value == self.new_value
    }
}

/// One row of a snapshot: a complete entity plus the fields its source did
/// not report. Unreported fields keep the value already stored for a
/// surviving entity instead of being reset.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub entity: Entity,
    pub unreported: Vec<Field>,
}

impl SnapshotRecord {
    pub fn new(entity: Entity, unreported: Vec<Field>) -> Self {
        Self { entity, unreported }
    }

    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    /// Resolve against the entity currently stored under the same id
    pub(crate) fn resolve(self, prior: Option<&Entity>, now: DateTime<Utc>) -> Entity {
        let mut entity = self.entity;
        if let Some(prior) = prior {
            for field in self.unreported {
                entity.set(prior.value(field), now);
            }
        }
        entity.last_updated = now;
        entity
    }
}

impl From<Entity> for SnapshotRecord {
    fn from(entity: Entity) -> Self {
        Self::new(entity, Vec::new())
    }
}
