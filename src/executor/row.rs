use serde_json::{Map, Value};

/// One retrieved record, keyed by row key (`alias`, `link.attribute` or `attribute`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Map<String, Value>);

impl Row {
    pub fn new() -> Self { Self(Map::new()) }
    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }
    /// Missing keys read as null, the way the platform omits empty columns.
    pub fn value(&self, key: &str) -> Value { self.0.get(key).cloned().unwrap_or(Value::Null) }
    pub fn insert(&mut self, key: &str, value: Value) { self.0.insert(key.to_string(), value); }
    pub fn into_value(self) -> Value { Value::Object(self.0) }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}
