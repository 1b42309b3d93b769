//! Version 1 -> 2.
//!
//! The unified `branches` list is split by its `type` tag, the parameter
//! tables get their current names and the multiphase flag appears.

use gridnet_core::{GridError, GridResult};
use serde_json::{json, Map, Value};

use super::{label, list, required, string, with_keys};

pub(super) fn to_v2(data: &Map<String, Value>) -> GridResult<Value> {
    let mut lines = Vec::new();
    let mut transformers = Vec::new();
    let mut switches = Vec::new();

    for branch in list(data, "branches")? {
        let id = required(branch, "id", "branch")?;
        let what = format!("branch {}", label(id));
        match string(branch, "type", &what)? {
            "line" => lines.push(Value::Object(with_keys(
                branch,
                &[("phases1", "phases")],
                &["type", "phases2", "tap"],
            ))),
            "transformer" => transformers.push(Value::Object(with_keys(
                branch,
                &[],
                &["type", "length", "ground", "max_current"],
            ))),
            "switch" => switches.push(Value::Object(with_keys(
                branch,
                &[("phases1", "phases")],
                &["type", "phases2", "params_id", "length", "ground", "tap", "max_current"],
            ))),
            other => {
                return Err(GridError::BadBranchType(format!(
                    "Unknown branch type {other:?} for the {what}, expected 'line', 'transformer' or 'switch'."
                )))
            }
        }
    }

    let lines_params = list(data, "line_types")?
        .into_iter()
        .map(|params| Value::Object(params.clone()))
        .collect();
    let transformers_params = list(data, "transformer_types")?
        .into_iter()
        .map(|params| {
            Value::Object(with_keys(
                params,
                &[("uhv", "up"), ("ulv", "us"), ("type", "vg")],
                &[],
            ))
        })
        .collect();

    let carried = |key: &str| data.get(key).cloned().unwrap_or_else(|| json!([]));
    let mut document = Map::new();
    document.insert("version".into(), json!(2));
    document.insert("is_multiphase".into(), json!(true));
    document.insert("grounds".into(), carried("grounds"));
    document.insert("potential_refs".into(), carried("potential_refs"));
    document.insert("buses".into(), carried("buses"));
    document.insert("lines".into(), Value::Array(lines));
    document.insert("transformers".into(), Value::Array(transformers));
    document.insert("switches".into(), Value::Array(switches));
    document.insert("loads".into(), carried("loads"));
    document.insert("sources".into(), carried("sources"));
    document.insert("lines_params".into(), Value::Array(lines_params));
    document.insert(
        "transformers_params".into(),
        Value::Array(transformers_params),
    );
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn branches_are_split_by_type() {
        let v1 = json!({
            "version": 1,
            "grounds": [], "potential_refs": [], "buses": [], "loads": [], "sources": [],
            "branches": [
                {"id": "l", "type": "line", "bus1": "a", "bus2": "b", "phases1": "abcn", "phases2": "abcn", "params_id": "lp", "length": 1.5, "ground": "g"},
                {"id": "t", "type": "transformer", "bus1": "a", "bus2": "c", "phases1": "abc", "phases2": "abcn", "params_id": "tp", "tap": 1.0},
                {"id": "s", "type": "switch", "bus1": "b", "bus2": "d", "phases1": "abc", "phases2": "abc"}
            ],
            "line_types": [{"id": "lp", "z_line": [[[1.0]], [[0.0]]], "ampacity": 500}],
            "transformer_types": [{"id": "tp", "sn": 1.0, "uhv": 20000.0, "ulv": 400.0, "i0": 0.0, "p0": 0.0, "psc": 0.0, "vsc": 0.04, "type": "Dyn11"}]
        });
        let v2 = to_v2(v1.as_object().unwrap()).unwrap();
        assert_eq!(v2["version"], 2);
        assert_eq!(v2["is_multiphase"], true);
        assert_eq!(
            v2["lines"][0],
            json!({"id": "l", "bus1": "a", "bus2": "b", "phases": "abcn", "params_id": "lp", "length": 1.5, "ground": "g"})
        );
        assert_eq!(v2["transformers"][0]["phases2"], "abcn");
        assert_eq!(
            v2["switches"][0],
            json!({"id": "s", "bus1": "b", "bus2": "d", "phases": "abc"})
        );
        assert_eq!(v2["lines_params"][0]["ampacity"], 500);
        let tp = &v2["transformers_params"][0];
        assert_eq!((tp["up"].as_f64(), tp["us"].as_f64()), (Some(20000.0), Some(400.0)));
        assert_eq!(tp["vg"], "Dyn11");
        assert!(tp.get("uhv").is_none());
    }

    #[test]
    fn unknown_branch_type_fails() {
        let v1 = json!({"version": 1, "branches": [{"id": 7, "type": "fuse"}]});
        let err = to_v2(v1.as_object().unwrap()).unwrap_err();
        assert_eq!(err.kind(), gridnet_core::ErrorKind::BadBranchType);
        assert!(err.to_string().contains("branch 7"));
    }
}
