//! Envelope - one batch of telemetry handed to the transport layer
//!
//! The routing layer never mutates an envelope. It only reads the primary
//! event to decide which destination receives the whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Envelope header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeHeaders {
    /// Event ID of the primary event (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// DSN the client addressed the envelope to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    /// Client-side send timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Item type tag
///
/// Unknown tags are kept verbatim so they survive a round trip through the
/// transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    Event,
    Transaction,
    Session,
    Sessions,
    Attachment,
    ClientReport,
    Other(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Event => "event",
            Self::Transaction => "transaction",
            Self::Session => "session",
            Self::Sessions => "sessions",
            Self::Attachment => "attachment",
            Self::ClientReport => "client_report",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ItemType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "event" => Self::Event,
            "transaction" => Self::Transaction,
            "session" => Self::Session,
            "sessions" => Self::Sessions,
            "attachment" => Self::Attachment,
            "client_report" => Self::ClientReport,
            _ => Self::Other(s),
        }
    }
}

impl From<ItemType> for String {
    fn from(t: ItemType) -> Self {
        match t {
            ItemType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single envelope item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item type
    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// Item payload (opaque to the transport layer)
    #[serde(default)]
    pub payload: Value,
}

impl Item {
    /// Create an item with the given type and payload
    pub fn new(item_type: ItemType, payload: Value) -> Self {
        Self { item_type, payload }
    }

    /// Create an `event` item
    pub fn event(payload: Value) -> Self {
        Self::new(ItemType::Event, payload)
    }

    /// Create a `transaction` item
    pub fn transaction(payload: Value) -> Self {
        Self::new(ItemType::Transaction, payload)
    }

    /// Create a `session` item
    pub fn session(payload: Value) -> Self {
        Self::new(ItemType::Session, payload)
    }

    /// Event payload, if this is an `event` item carrying a JSON object
    fn as_event(&self) -> Option<&Value> {
        (self.item_type == ItemType::Event && self.payload.is_object()).then_some(&self.payload)
    }
}

/// Telemetry envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope header
    #[serde(default)]
    pub headers: EnvelopeHeaders,

    /// Ordered items
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Envelope {
    /// Create an envelope from items with an empty header
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            headers: EnvelopeHeaders::default(),
            items,
        }
    }

    /// The representative event of the batch.
    ///
    /// Exactly one `event` item with an object payload must be present;
    /// zero or several mean the envelope has no primary event.
    pub fn primary_event(&self) -> Option<&Value> {
        let mut events = self.items.iter().filter_map(Item::as_event);
        let first = events.next()?;
        match events.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Classification of the primary event
    pub fn classification(&self) -> EventClassification {
        EventClassification::of(self.primary_event())
    }

    /// Item types in order, for logging
    pub fn item_types(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.item_type.as_str()).collect()
    }
}

/// Classification tag derived from the primary event's `type` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClassification {
    /// `"type": "error"`
    Error,
    /// Any other string type
    Other(String),
    /// No primary event, or no string `type` on it
    Unclassified,
}

impl EventClassification {
    /// Sentinel type value that marks an error event
    pub const ERROR_TYPE: &'static str = "error";

    /// Classify an optional primary event
    pub fn of(event: Option<&Value>) -> Self {
        match event.and_then(|e| e.get("type")).and_then(Value::as_str) {
            Some(Self::ERROR_TYPE) => Self::Error,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unclassified,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => Self::ERROR_TYPE,
            Self::Other(other) => other,
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for EventClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
