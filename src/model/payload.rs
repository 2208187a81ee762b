//! Payload: the structured data embedded in a ticket's designated field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Jobs keyed by job identifier.
pub type JobMap = BTreeMap<String, Job>;

/// The decoded contents of a ticket's designated field.
///
/// Recreated on every read and fully rewritten on every write.
/// Nothing outside `updated`/`items`/`jobs` survives a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Last write time as stored on the ticket, or a sentinel when unavailable.
    pub timestamp: String,

    /// Ordered, schema-free item records.
    ///
    /// `None` when the field stores `"items": null`. Appending to that is refused;
    /// callers initialise it with an explicit (possibly empty) list first.
    pub items: Option<Vec<Value>>,

    /// Jobs keyed by job identifier.
    pub jobs: JobMap,
}

impl Payload {
    /// Write-time reported for a ticket whose field is absent or empty.
    pub const NOT_AVAILABLE: &'static str = "not available";

    /// Write-time reported when the field has data but no stored write-time.
    pub const UNKNOWN: &'static str = "unknown, 'timestamp' not stored on ticket";

    /// The payload of a ticket that has never been written.
    pub fn empty() -> Self {
        Self {
            timestamp: Self::NOT_AVAILABLE.to_string(),
            items: Some(Vec::new()),
            jobs: JobMap::new(),
        }
    }
}

/// A unit of work associated with an item.
///
/// Stored as a JSON object with `description` and `item`. Other writers may add
/// sub-fields or store non-string values; those are kept as found, so rewriting
/// a payload never changes a job nobody touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job(Map<String, Value>);

impl Job {
    pub fn new(description: impl Into<String>, item: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("description".to_string(), Value::String(description.into()));
        fields.insert("item".to_string(), Value::String(item.into()));
        Self(fields)
    }

    /// The description, when stored as a string.
    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    /// Reference to the item this job works on, when stored as a string.
    pub fn item(&self) -> Option<&str> {
        self.0.get("item").and_then(Value::as_str)
    }

    /// Any sub-field, as stored.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Acknowledgment of a completed mutation: the payload exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub key: String,
    pub payload: Payload,
}
