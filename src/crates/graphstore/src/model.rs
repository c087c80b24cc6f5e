//! Property graph data model
//!
//! Values are a closed enum rather than raw JSON so the on-disk payload can
//! use bincode (which needs a non-self-describing format).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A node or relationship property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// List-valued attributes (e.g. multi-valued custom profile fields)
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Text content, if textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value for row output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Int(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::json!(f),
            PropertyValue::Text(s) => serde_json::Value::String(s.clone()),
            PropertyValue::List(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
        }
    }

    /// Build from a JSON value (sync payloads arrive as JSON)
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Int(i)
                } else {
                    PropertyValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => PropertyValue::Text(s.clone()),
            serde_json::Value::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_json).collect())
            }
            serde_json::Value::Object(_) => PropertyValue::Text(value.to_string()),
        }
    }

    /// Ordering used by ORDER BY: null first, then by type, then by value
    pub fn compare(&self, other: &PropertyValue) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Text(a), Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

fn rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Null => 0,
        PropertyValue::Bool(_) => 1,
        PropertyValue::Int(_) | PropertyValue::Float(_) => 2,
        PropertyValue::Text(_) => 3,
        PropertyValue::List(_) => 4,
    }
}

/// A graph node
///
/// The external id doubles as the node key; properties are sorted so that
/// iteration (and therefore query output) is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable external id, unique per label within a version
    pub external_id: String,

    /// Property map
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    /// Create a node with the given external id
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Set a property (builder form)
    pub fn with(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Set a text property (builder form)
    pub fn with_text(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, PropertyValue::Text(value.into()))
    }

    /// Look up a property; `id` resolves to the external id
    pub fn property(&self, key: &str) -> PropertyValue {
        if key == "id" {
            return PropertyValue::Text(self.external_id.clone());
        }
        self.properties.get(key).cloned().unwrap_or(PropertyValue::Null)
    }
}

/// Node counts per label, used for promotion validation and sync progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub people: u64,
    pub teams: u64,
    pub applications: u64,
    pub factors: u64,
}

impl LabelCounts {
    /// Whether every label has at least one node
    pub fn all_positive(&self) -> bool {
        self.people > 0 && self.teams > 0 && self.applications > 0 && self.factors > 0
    }
}
