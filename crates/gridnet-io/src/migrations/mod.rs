//! Version migration chain.
//!
//! Every historical document layout has a single-step converter to the next
//! one. [`migrate`] reads the `version` key (absent means 0) and applies the
//! converters in order until the document reaches [`CURRENT_VERSION`].
//! Documents newer than the current version are rejected.
//!
//! Converters never fail silently: structural problems are errors, while lossy
//! or heuristic rewrites are reported through [`Diagnostics`].

mod v0;
mod v1;
mod v2;

use gridnet_core::{Diagnostics, GridError, GridResult};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::schema::CURRENT_VERSION;

/// Diagnostics category used by every converter.
pub const MIGRATION_CATEGORY: &str = "migration";

/// Bring a document of any supported version to the current version.
///
/// A current-version document is returned unchanged, so migrating twice is
/// the same as migrating once.
pub fn migrate(data: Value, diagnostics: &mut Diagnostics) -> GridResult<Value> {
    let mut version = document_version(&data)?;
    let mut data = data;
    while version < CURRENT_VERSION {
        let document = object(&data, "document")?;
        data = match version {
            0 => v0::to_v1(document, diagnostics)?,
            1 => v1::to_v2(document)?,
            _ => v2::to_v3(document, diagnostics)?,
        };
        debug!(from = version, to = version + 1, "document migrated");
        version += 1;
    }
    Ok(data)
}

/// The version a document declares; documents without one are version 0.
pub fn document_version(data: &Value) -> GridResult<u32> {
    let unsupported = |found: String| GridError::UnsupportedVersion {
        found,
        current: CURRENT_VERSION,
    };
    match data.get("version") {
        None => Ok(0),
        Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) if v <= CURRENT_VERSION => Ok(v),
            _ => Err(unsupported(value.to_string())),
        },
    }
}

pub(crate) fn object<'a>(value: &'a Value, what: &str) -> GridResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| GridError::BadDocument(format!("The {what} must be a JSON object.")))
}

/// Objects of the list stored under `key`; a missing key is an empty list.
pub(crate) fn list<'a>(
    document: &'a Map<String, Value>,
    key: &str,
) -> GridResult<Vec<&'a Map<String, Value>>> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| object(item, &format!("entries of '{key}'")))
            .collect(),
        Some(_) => Err(GridError::BadDocument(format!("'{key}' must be a list."))),
    }
}

pub(crate) fn required<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    what: &str,
) -> GridResult<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| GridError::BadDocument(format!("The {what} has no '{key}'.")))
}

pub(crate) fn string<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    what: &str,
) -> GridResult<&'a str> {
    required(object, key, what)?
        .as_str()
        .ok_or_else(|| GridError::BadDocument(format!("'{key}' of the {what} must be a string.")))
}

pub(crate) fn number(object: &Map<String, Value>, key: &str, what: &str) -> GridResult<f64> {
    required(object, key, what)?
        .as_f64()
        .ok_or_else(|| GridError::BadDocument(format!("'{key}' of the {what} must be a number.")))
}

/// Normalize a complex value to its `[re, im]` pair; a bare number is real.
pub(crate) fn complex(value: &Value, what: &str) -> GridResult<Value> {
    let bad = || GridError::BadDocument(format!("The {what} must be a complex [re, im] pair."));
    match value {
        Value::Number(n) => Ok(json!([n.as_f64().ok_or_else(bad)?, 0.0])),
        Value::Array(parts) if parts.len() == 2 && parts.iter().all(Value::is_number) => {
            Ok(value.clone())
        }
        _ => Err(bad()),
    }
}

/// Id as plain text, for messages and derived names.
pub(crate) fn label(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Copy `object` with some keys renamed and others dropped, keeping key order.
pub(crate) fn with_keys(
    object: &Map<String, Value>,
    renames: &[(&str, &str)],
    dropped: &[&str],
) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| !dropped.contains(&key.as_str()))
        .map(|(key, value)| {
            let key = renames
                .iter()
                .find(|(from, _)| *from == key.as_str())
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| key.clone());
            (key, value.clone())
        })
        .collect()
}

/// Copy `keys` of `from` that are present into `to`.
pub(crate) fn copy_keys(from: &Map<String, Value>, to: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(value) = from.get(*key) {
            to.insert(key.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_read_from_the_document() {
        assert_eq!(document_version(&json!({})).unwrap(), 0);
        assert_eq!(document_version(&json!({"version": 2})).unwrap(), 2);

        let err = document_version(&json!({"version": 4})).unwrap_err();
        assert_eq!(err.kind(), gridnet_core::ErrorKind::UnsupportedVersion);
        assert!(document_version(&json!({"version": "3"})).is_err());
        assert!(document_version(&json!({"version": -1})).is_err());
    }

    #[test]
    fn complex_values_accept_pairs_and_reals() {
        assert_eq!(complex(&json!(2.5), "power").unwrap(), json!([2.5, 0.0]));
        assert_eq!(complex(&json!([1, 2]), "power").unwrap(), json!([1, 2]));
        assert!(complex(&json!("1+2j"), "power").is_err());
    }

    #[test]
    fn renamed_keys_keep_their_position() {
        let object = json!({"uhv": 20000, "ulv": 400, "type": "Dyn11", "sn": 1})
            .as_object()
            .cloned()
            .unwrap();
        let renamed = with_keys(&object, &[("uhv", "up"), ("ulv", "us"), ("type", "vg")], &["sn"]);
        let keys: Vec<&str> = renamed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["up", "us", "vg"]);
    }
}
