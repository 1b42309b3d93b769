//! JSON file interface.
//!
//! Files are read at any supported version and migrated on the fly; they are
//! always written at the current version. Output is pretty-printed with four
//! spaces and every two-element array is folded onto one line, so complex
//! values read as `[re, im]`.

use std::fs;
use std::path::Path;

use gridnet_core::{Diagnostics, GridError, GridResult, Network};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use tracing::info;

use crate::{migrate, network_from_dict, to_dict};

/// Result of reading a network document.
#[derive(Debug)]
pub struct ImportResult {
    pub network: Network,
    /// Notices raised while migrating the document
    pub diagnostics: Diagnostics,
}

static PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s+(.*),\s+(.*)\s+]").expect("pair pattern is a valid regex"));

/// Pretty JSON text with two-element arrays on one line.
pub fn to_pretty_json(value: &Value) -> GridResult<String> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    let text = String::from_utf8(buffer)
        .map_err(|e| GridError::BadDocument(format!("The serialized document is not UTF-8: {e}")))?;
    Ok(PAIR.replace_all(&text, "[${1}, ${2}]").into_owned())
}

/// Read a JSON file without interpreting it.
pub fn read_document(path: impl AsRef<Path>) -> GridResult<Value> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&text)?;
    Ok(data)
}

/// Read a document of any supported version and bring it to the current one.
pub fn migrate_json(path: impl AsRef<Path>) -> GridResult<(Value, Diagnostics)> {
    let path = path.as_ref();
    let mut diagnostics = Diagnostics::new();
    let data = migrate(read_document(path)?, &mut diagnostics)?;
    info!(path = %path.display(), warnings = diagnostics.warning_count(), "document migrated");
    Ok((data, diagnostics))
}

/// Build a network from a document value of any supported version.
pub fn from_value(data: Value) -> GridResult<ImportResult> {
    let mut diagnostics = Diagnostics::new();
    let data = migrate(data, &mut diagnostics)?;
    let network = network_from_dict(&data)?;
    Ok(ImportResult {
        network,
        diagnostics,
    })
}

/// Load a network from a JSON file.
pub fn from_json(path: impl AsRef<Path>) -> GridResult<ImportResult> {
    let path = path.as_ref();
    let result = from_value(read_document(path)?)?;
    info!(
        path = %path.display(),
        elements = result.network.graph().len(),
        warnings = result.diagnostics.warning_count(),
        "network loaded"
    );
    Ok(result)
}

/// Current-version JSON text of a network.
pub fn to_json_string(network: &Network, include_results: bool) -> GridResult<String> {
    to_pretty_json(&to_dict(network, include_results)?)
}

/// Write a network to a JSON file at the current version.
pub fn to_json(network: &Network, path: impl AsRef<Path>, include_results: bool) -> GridResult<()> {
    let path = path.as_ref();
    fs::write(path, to_json_string(network, include_results)?)?;
    info!(path = %path.display(), include_results, "network written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_are_folded_onto_one_line() {
        let text = to_pretty_json(&json!({"voltages": [[230.0, 0.0], [-115.0, -199.18584287042088]]}))
            .unwrap();
        assert!(text.contains("[230.0, 0.0]"));
        assert!(text.contains("[-115.0, -199.18584287042088]"));
        assert!(text.starts_with("{\n    \"voltages\": ["));
    }

    #[test]
    fn longer_arrays_keep_one_item_per_line() {
        let text = to_pretty_json(&json!({"sections": [1.0, 2.0, 3.0]})).unwrap();
        assert!(text.contains("[\n        1.0,\n        2.0,\n        3.0\n    ]"));
    }
}
