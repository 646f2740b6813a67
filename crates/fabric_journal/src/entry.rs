//! Journal entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Well-known payload keys.
pub mod keys {
    /// Operation the entry asks for (`create`, `delete`, `bind`).
    pub const OPERATION: &str = "operation";
    /// Name of the virtual fabric a network maps to.
    pub const FABRIC_ID: &str = "fabric_id";
    /// Partition key assigned to a network.
    pub const PARTITION_KEY: &str = "key";
    /// Fabric a port belongs to.
    pub const NETWORK_ID: &str = "network_id";
    /// Endpoint identifier of a port (the member added to the fabric).
    pub const MEMBER: &str = "member";
}

/// Kind of resource an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A virtual fabric.
    Network,
    /// A member endpoint of a virtual fabric.
    Port,
}

impl ResourceType {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Network => "network",
            ResourceType::Port => "port",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network" => Ok(ResourceType::Network),
            "port" => Ok(ResourceType::Port),
            other => Err(format!("unknown resource type '{other}'")),
        }
    }
}

/// Processing state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Waiting for the next pass to process it individually.
    Pending,
    /// Waiting to be included in the next port batch.
    Waiting,
    /// The last attempt failed; terminal until superseded.
    Failed,
    /// Reconciled with the fabric; terminal until superseded.
    Completed,
}

impl EntryState {
    /// All states, in declaration order.
    pub const ALL: [EntryState; 4] = [
        EntryState::Pending,
        EntryState::Waiting,
        EntryState::Failed,
        EntryState::Completed,
    ];

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Pending => "pending",
            EntryState::Waiting => "waiting",
            EntryState::Failed => "failed",
            EntryState::Completed => "completed",
        }
    }

    /// Returns true if a pass still has work to do for this state.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, EntryState::Pending | EntryState::Waiting)
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown entry state '{s}'"))
    }
}

/// Operation requested by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create the resource.
    Create,
    /// Delete the resource.
    Delete,
    /// Bind a port into its fabric.
    Bind,
}

impl Operation {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Bind => "bind",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "bind" => Ok(Operation::Bind),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

/// Structured payload of an entry.
///
/// The journal treats the payload as opaque apart from the `operation` key.
/// Resource-specific attributes (see [`keys`]) are read by the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Creates a payload carrying the given operation.
    pub fn new(operation: Operation) -> Self {
        Self::default().with(keys::OPERATION, operation.as_str())
    }

    /// Adds an attribute, returning the payload.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets an attribute in place.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Returns the requested operation.
    ///
    /// `None` when the key is absent, `Some(Err(raw))` when it is present but
    /// does not name a known operation.
    pub fn operation(&self) -> Option<Result<Operation, String>> {
        self.0.get(keys::OPERATION).map(|value| match value {
            Value::String(s) => s.parse(),
            other => Err(format!("operation is not a string: {other}")),
        })
    }

    /// Returns a raw attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a non-empty string attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns an unsigned integer attribute, accepting numeric strings.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Unique key of an entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    /// Resource identifier.
    pub resource_uuid: String,
    /// Resource type.
    pub resource_type: ResourceType,
}

impl EntryKey {
    /// Creates a key.
    pub fn new(resource_uuid: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            resource_uuid: resource_uuid.into(),
            resource_type,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_uuid)
    }
}

/// A durable record of one desired operation against one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Resource identifier.
    pub resource_uuid: String,
    /// Resource type.
    pub resource_type: ResourceType,
    /// Incremented on every update. Advisory only.
    pub revision_number: u64,
    /// Operation and resource attributes.
    pub data: Payload,
    /// Processing state.
    pub state: EntryState,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// When the entry was last changed.
    pub updated_at: DateTime<Utc>,
    /// Diagnostic from the last failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl JournalEntry {
    /// Creates a fresh entry at revision 0.
    pub fn new(
        resource_uuid: impl Into<String>,
        resource_type: ResourceType,
        data: Payload,
        state: EntryState,
    ) -> Self {
        let now = Utc::now();
        Self {
            resource_uuid: resource_uuid.into(),
            resource_type,
            revision_number: 0,
            data,
            state,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Returns the unique key of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.resource_uuid.clone(), self.resource_type)
    }

    /// Returns the requested operation. See [`Payload::operation`].
    pub fn operation(&self) -> Option<Result<Operation, String>> {
        self.data.operation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_round_trips_through_str() {
        for state in EntryState::ALL {
            assert_eq!(state.as_str().parse::<EntryState>().unwrap(), state);
        }
        assert!("done".parse::<EntryState>().is_err());
    }

    #[test]
    fn outstanding_states() {
        assert!(EntryState::Pending.is_outstanding());
        assert!(EntryState::Waiting.is_outstanding());
        assert!(!EntryState::Failed.is_outstanding());
        assert!(!EntryState::Completed.is_outstanding());
    }

    #[test]
    fn payload_operation() {
        let payload = Payload::new(Operation::Bind);
        assert_eq!(payload.operation(), Some(Ok(Operation::Bind)));

        assert_eq!(Payload::default().operation(), None);

        let unknown = Payload::default().with(keys::OPERATION, "explode");
        assert!(matches!(unknown.operation(), Some(Err(_))));

        let not_a_string = Payload::default().with(keys::OPERATION, 7);
        assert!(matches!(not_a_string.operation(), Some(Err(_))));
    }

    #[test]
    fn payload_accessors() {
        let payload = Payload::new(Operation::Create)
            .with(keys::FABRIC_ID, "net1")
            .with(keys::PARTITION_KEY, 10)
            .with("label", "")
            .with("numeric", "42");

        assert_eq!(payload.get_str(keys::FABRIC_ID), Some("net1"));
        assert_eq!(payload.get_u64(keys::PARTITION_KEY), Some(10));
        assert_eq!(payload.get_u64("numeric"), Some(42));
        assert_eq!(payload.get_str("label"), None);
        assert_eq!(payload.get_str("missing"), None);
    }

    #[test]
    fn payload_serializes_as_plain_object() {
        let payload = Payload::new(Operation::Delete).with(keys::FABRIC_ID, "net1");
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"operation": "delete", "fabric_id": "net1"}));
    }

    #[test]
    fn entry_key_display() {
        let entry = JournalEntry::new("p1", ResourceType::Port, Payload::default(), EntryState::Waiting);
        assert_eq!(entry.key().to_string(), "port/p1");
        assert_eq!(entry.revision_number, 0);
        assert_eq!(entry.created_at, entry.updated_at);
    }
}
