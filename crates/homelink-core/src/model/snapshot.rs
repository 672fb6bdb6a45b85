// ── Entity snapshots ──
//
// Field sets are device-type-specific (a switch has is_on/brightness, a
// motion detector has motion_detected/sensitivity), so snapshots stay as
// open string-keyed field maps with typed accessors layered on top.
// A snapshot is always partial-safe: any field may be absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The set of known field values for one entity at a point in time.
///
/// Merging overlays only the fields present in an incoming update; fields
/// absent from the update keep their previously known value. That policy
/// lives in the store -- this type is just the field map plus accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySnapshot {
    fields: Map<String, Value>,
}

impl EntitySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A boolean field, e.g. `is_on` or `motion_detected`.
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    /// A numeric field, e.g. `power_consumption` or `sensitivity`.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    /// An integer field, e.g. `brightness`.
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    /// A string field, e.g. `location` or `mode`.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Overlay one field. Returns `true` if the stored value changed.
    pub(crate) fn set(&mut self, field: String, value: Value) -> bool {
        if self.fields.get(&field) == Some(&value) {
            return false;
        }
        self.fields.insert(field, value);
        true
    }

    /// Iterate over all known fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for EntitySnapshot {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
