//! Merging of operator-declared flavor configuration into an instance spec.
//!
//! Init: host content first, then flavor lines, joined with `\n`, no dedup.
//! Tags: key-wise union, flavor values overwrite instance values.

use crate::error::{FlavorError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Property key that receives the node certificate bundle path.
pub const SSL_PROPERTY: &str = "SSL";

pub fn merge_init(instance_init: &str, flavor_init: &[String]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(flavor_init.len() + 1);
    if !instance_init.is_empty() {
        lines.push(instance_init);
    }
    lines.extend(flavor_init.iter().map(String::as_str));
    lines.join("\n")
}

/// The map is only created when there is at least one flavor tag.
pub fn merge_tags(
    instance_tags: &mut Option<BTreeMap<String, String>>,
    flavor_tags: &BTreeMap<String, String>,
) {
    if flavor_tags.is_empty() {
        return;
    }
    let tags = instance_tags.get_or_insert_with(BTreeMap::new);
    for (key, value) in flavor_tags {
        tags.insert(key.clone(), value.clone());
    }
}

/// Sets `properties["SSL"]` to the bundle path. Absent or `null` properties
/// are treated as an empty object; anything other than an object is rejected.
pub fn inject_ssl_property(properties: Option<Value>, bundle: &Path) -> Result<Value> {
    let mut map: Map<String, Value> = match properties {
        None | Some(Value::Null) => Map::new(),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            FlavorError::serialization(format!("instance properties are not an object: {}", e))
        })?,
    };

    let path = bundle.to_str().ok_or_else(|| {
        FlavorError::serialization(format!(
            "bundle path {} is not valid UTF-8",
            bundle.display()
        ))
    })?;
    map.insert(SSL_PROPERTY.to_string(), Value::String(path.to_string()));

    Ok(Value::Object(map))
}
