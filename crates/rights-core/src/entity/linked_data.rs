//! Linked-data (JSON-LD) documents

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default `@context` for emitted documents
pub const DEFAULT_CONTEXT: &str = "https://schema.org/";

/// Keys owned by the entity model; descriptive fields may not set them
pub const RESERVED_KEYS: [&str; 5] = ["@context", "@type", "@id", "source", "currentHolder"];

/// A JSON-LD document with an explicit `@id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkedDataDocument(Map<String, Value>);

impl LinkedDataDocument {
    pub(crate) fn new(context: &str, type_name: &str, id: &str) -> Self {
        let mut doc = Map::new();
        doc.insert("@context".into(), Value::String(context.to_string()));
        doc.insert("@type".into(), Value::String(type_name.to_string()));
        doc.insert("@id".into(), Value::String(id.to_string()));
        Self(doc)
    }

    /// Copy descriptive fields, skipping any `reserved` key
    pub(crate) fn with_fields(mut self, fields: &Map<String, Value>, reserved: &[&str]) -> Self {
        for (key, value) in fields {
            if !reserved.contains(&key.as_str()) {
                self.0.insert(key.clone(), value.clone());
            }
        }
        self
    }

    pub(crate) fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("@id").and_then(Value::as_str)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.0.get("@type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// First reserved key present in `fields`, if any
pub(crate) fn find_reserved<'a>(fields: &Map<String, Value>, reserved: &[&'a str]) -> Option<&'a str> {
    reserved.iter().copied().find(|key| fields.contains_key(*key))
}
