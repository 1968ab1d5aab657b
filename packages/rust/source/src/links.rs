//! Link resolution against the `includes` block of an entries response.
//!
//! A link looks like `{"sys": {"type": "Link", "linkType": "Asset", "id": "..."}}`
//! and may appear at any depth of `fields`, including inside locale maps.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Linked objects may link further; resolution stops at this depth.
const MAX_LINK_DEPTH: usize = 3;

/// The `includes` block of a collection response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Includes {
    #[serde(rename = "Asset", default)]
    pub assets: Vec<Value>,
    #[serde(rename = "Entry", default)]
    pub entries: Vec<Value>,
}

/// Included objects keyed by `(linkType, id)`.
pub(crate) struct LinkIndex {
    by_key: HashMap<(String, String), Value>,
}

impl LinkIndex {
    pub(crate) fn new(includes: &Includes) -> Self {
        let mut by_key = HashMap::new();
        let tagged = includes
            .assets
            .iter()
            .map(|v| ("Asset", v))
            .chain(includes.entries.iter().map(|v| ("Entry", v)));

        for (link_type, value) in tagged {
            if let Some(id) = value.pointer("/sys/id").and_then(Value::as_str) {
                by_key.insert((link_type.to_string(), id.to_string()), value.clone());
            }
        }

        Self { by_key }
    }

    /// Replace every resolvable link inside `value`. Unresolvable links stay.
    pub(crate) fn resolve(&self, value: &mut Value) {
        self.resolve_at(value, 0);
    }

    fn resolve_at(&self, value: &mut Value, depth: usize) {
        if let Some(key) = link_key(value) {
            match self.by_key.get(&key) {
                Some(target) if depth < MAX_LINK_DEPTH => {
                    let mut target = target.clone();
                    if let Some(fields) = target.get_mut("fields") {
                        self.resolve_at(fields, depth + 1);
                    }
                    *value = target;
                }
                Some(_) => debug!(link_type = %key.0, id = %key.1, "link depth exceeded"),
                None => debug!(link_type = %key.0, id = %key.1, "unresolved link"),
            }
            return;
        }

        match value {
            Value::Object(map) => {
                for child in map.values_mut() {
                    self.resolve_at(child, depth);
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.resolve_at(child, depth);
                }
            }
            _ => {}
        }
    }
}

/// `(linkType, id)` if `value` is a link object.
fn link_key(value: &Value) -> Option<(String, String)> {
    let sys = value.get("sys")?;
    if sys.get("type")?.as_str()? != "Link" {
        return None;
    }
    let link_type = sys.get("linkType")?.as_str()?;
    let id = sys.get("id")?.as_str()?;
    Some((link_type.to_string(), id.to_string()))
}
