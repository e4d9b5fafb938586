//! Entity discriminator and shape predicates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of rights entity stored under a persist id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Derived right, always has a `source`
    Right,
    /// Root authorship entity, never has a `source`
    Copyright,
}

impl EntityKind {
    /// Order in which `resolve` tries the kinds. Each kind is tried once.
    pub const RESOLUTION_ORDER: [EntityKind; 2] = [EntityKind::Right, EntityKind::Copyright];

    /// Linked-data `@type` of this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityKind::Right => "Right",
            EntityKind::Copyright => "Copyright",
        }
    }

    /// Check that a stored body has this kind's required shape
    pub fn check_shape(&self, body: &Map<String, Value>) -> Result<(), String> {
        match self {
            EntityKind::Right => match body.get("source") {
                Some(Value::String(source)) if !source.is_empty() => Ok(()),
                Some(_) => Err("`source` must be a non-empty string".to_string()),
                None => Err("missing required field `source`".to_string()),
            },
            EntityKind::Copyright => {
                if body.contains_key("source") {
                    Err("a Copyright has no `source`".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
