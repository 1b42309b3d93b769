//! Version 0 -> 1.
//!
//! Version 0 documents have no grounds, no potential references and no
//! voltage sources: slack buses carry the source voltages and phases are
//! implied by type tags. This step makes all of that explicit.

use std::collections::{HashMap, HashSet};

use gridnet_core::{Diagnostics, GridError, GridResult, VectorGroup};
use serde_json::{json, Map, Value};

use super::{
    complex, copy_keys, label, list, number, required, string, with_keys, MIGRATION_CATEGORY,
};

const GROUND_ID: &str = "ground";
const POTENTIAL_REF_ID: &str = "pref";

struct LineTypeInfo {
    dimension: usize,
    has_shunt: bool,
}

pub(super) fn to_v1(data: &Map<String, Value>, diagnostics: &mut Diagnostics) -> GridResult<Value> {
    let mut ground_buses: Vec<Value> = Vec::new();
    let mut potential_refs = vec![json!({"id": POTENTIAL_REF_ID, "ground": GROUND_ID})];
    let mut pref_ids: HashSet<String> = HashSet::from([POTENTIAL_REF_ID.to_string()]);
    let mut buses = Vec::new();
    let mut sources = Vec::new();
    // bus id (as JSON text) -> has a neutral
    let mut bus_neutral: HashMap<String, bool> = HashMap::new();

    for bus in list(data, "buses")? {
        let id = required(bus, "id", "bus")?;
        let what = format!("bus {}", label(id));
        let bus_type = string(bus, "type", &what)?;
        let phases = match bus_type {
            "slack" | "bus_neutral" => "abcn",
            "bus" => "abc",
            other => {
                return Err(GridError::BadDocument(format!(
                    "Unknown type {other:?} for the {what}, expected 'slack', 'bus' or 'bus_neutral'."
                )))
            }
        };
        bus_neutral.insert(id.to_string(), phases.ends_with('n'));

        let mut converted = Map::new();
        converted.insert("id".into(), id.clone());
        converted.insert("phases".into(), json!(phases));
        copy_keys(bus, &mut converted, &["geometry"]);
        buses.push(Value::Object(converted));

        if bus_type == "slack" {
            let voltages = super::object(required(bus, "voltages", &what)?, "slack voltages")?;
            let voltages = ["va", "vb", "vc"]
                .iter()
                .map(|k| complex(required(voltages, k, &what)?, &format!("{k} of the {what}")))
                .collect::<GridResult<Vec<_>>>()?;
            sources.push(json!({
                "id": id,
                "bus": id,
                "phases": "abcn",
                "voltages": voltages,
            }));
            ground_buses.push(json!({"id": id, "phase": "n"}));
        }
    }

    let mut line_types_info: HashMap<String, LineTypeInfo> = HashMap::new();
    let mut line_types = Vec::new();
    for line_type in list(data, "line_types")? {
        let name = required(line_type, "name", "line type")?;
        let what = format!("line type {}", label(name));
        let z_line = matrix(required(line_type, "z", &what)?, &format!("z of the {what}"))?;
        let y_shunt = line_type
            .get("y")
            .map(|y| matrix(y, &format!("y of the {what}")))
            .transpose()?;
        line_types_info.insert(
            name.to_string(),
            LineTypeInfo {
                dimension: z_line.1,
                has_shunt: y_shunt.is_some(),
            },
        );

        let mut converted = Map::new();
        converted.insert("id".into(), name.clone());
        converted.insert("z_line".into(), z_line.0);
        if let Some((y_shunt, _)) = y_shunt {
            converted.insert("y_shunt".into(), y_shunt);
        }
        if let Some(max_current) = line_type.get("max_current") {
            converted.insert("ampacity".into(), max_current.clone());
        }
        line_types.push(Value::Object(converted));
    }

    let mut vector_groups: HashMap<String, VectorGroup> = HashMap::new();
    let mut transformer_types = Vec::new();
    for transformer_type in list(data, "transformer_types")? {
        let name = required(transformer_type, "name", "transformer type")?;
        let what = format!("transformer type {}", label(name));
        for key in ["sn", "uhv", "ulv", "i0", "p0", "psc", "vsc"] {
            number(transformer_type, key, &what)?;
        }
        let vg = VectorGroup::parse(string(transformer_type, "type", &what)?)?;
        vector_groups.insert(name.to_string(), vg);
        transformer_types.push(Value::Object(with_keys(
            transformer_type,
            &[("name", "id")],
            &[],
        )));
    }

    let mut branches = Vec::new();
    let mut needs_ground_for_shunts = false;
    for branch in list(data, "branches")? {
        let id = required(branch, "id", "branch")?;
        let what = format!("branch {}", label(id));
        let bus1 = required(branch, "bus1", &what)?;
        let bus2 = required(branch, "bus2", &what)?;
        let branch_type = string(branch, "type", &what)?;

        let mut converted = Map::new();
        converted.insert("id".into(), id.clone());
        converted.insert("type".into(), json!(branch_type));
        converted.insert("bus1".into(), bus1.clone());
        converted.insert("bus2".into(), bus2.clone());
        match branch_type {
            "line" => {
                let type_name = required(branch, "type_name", &what)?;
                let info = line_types_info.get(&type_name.to_string()).ok_or_else(|| {
                    GridError::UnknownElement(format!(
                        "The line type {} used by the {what} does not exist.",
                        label(type_name)
                    ))
                })?;
                let phases = if info.dimension == 4 { "abcn" } else { "abc" };
                converted.insert("phases1".into(), json!(phases));
                converted.insert("phases2".into(), json!(phases));
                converted.insert("params_id".into(), type_name.clone());
                converted.insert("length".into(), json!(number(branch, "length", &what)?));
                if info.has_shunt {
                    converted.insert("ground".into(), json!(GROUND_ID));
                    needs_ground_for_shunts = true;
                }
            }
            "transformer" => {
                let type_name = required(branch, "type_name", &what)?;
                let vg = vector_groups.get(&type_name.to_string()).ok_or_else(|| {
                    GridError::UnknownElement(format!(
                        "The transformer type {} used by the {what} does not exist.",
                        label(type_name)
                    ))
                })?;
                let neutral = |yes: bool| if yes { "abcn" } else { "abc" };
                converted.insert("phases1".into(), json!(neutral(vg.hv_has_neutral_point())));
                converted.insert("phases2".into(), json!(neutral(vg.lv_has_neutral_point())));
                converted.insert("params_id".into(), type_name.clone());
                converted.insert(
                    "tap".into(),
                    branch.get("tap").cloned().unwrap_or_else(|| json!(1.0)),
                );

                let bus2_neutral = bus_neutral.get(&bus2.to_string()).copied().unwrap_or(false);
                if vg.lv_has_neutral_point() && bus2_neutral {
                    let connection = json!({"id": bus2, "phase": "n"});
                    if !ground_buses.contains(&connection) {
                        ground_buses.push(connection);
                    }
                } else {
                    let pref_id = unique_id(&format!("pref_{}", label(id)), &pref_ids);
                    diagnostics.add_warning_with_entity(
                        MIGRATION_CATEGORY,
                        format!(
                            "The secondary side of the transformer {} has no neutral connected to the ground; the potential reference {pref_id:?} was added on its bus {}.",
                            label(id),
                            label(bus2)
                        ),
                        label(id),
                    );
                    pref_ids.insert(pref_id.clone());
                    potential_refs.push(json!({"id": pref_id, "bus": bus2}));
                }
            }
            "switch" => {
                let has_neutral = |bus: &Value| bus_neutral.get(&bus.to_string()).copied().unwrap_or(false);
                let phases = if has_neutral(bus1) && has_neutral(bus2) {
                    "abcn"
                } else {
                    "abc"
                };
                converted.insert("phases1".into(), json!(phases));
                converted.insert("phases2".into(), json!(phases));
            }
            other => {
                return Err(GridError::BadBranchType(format!(
                    "Unknown branch type {other:?} for the {what}, expected 'line', 'transformer' or 'switch'."
                )))
            }
        }
        copy_keys(branch, &mut converted, &["geometry"]);
        branches.push(Value::Object(converted));
    }

    let loads = list(data, "loads")?
        .into_iter()
        .map(convert_load)
        .collect::<GridResult<Vec<_>>>()?;

    if ground_buses.is_empty() && !needs_ground_for_shunts {
        diagnostics.add_warning(
            MIGRATION_CATEGORY,
            "The document has no slack bus; the implicit ground is not connected to any bus.",
        );
    }
    diagnostics.add_info(
        MIGRATION_CATEGORY,
        format!(
            "The ground {GROUND_ID:?} and its potential reference {POTENTIAL_REF_ID:?} were added to the network."
        ),
    );

    let mut document = Map::new();
    document.insert("version".into(), json!(1));
    document.insert(
        "grounds".into(),
        json!([{"id": GROUND_ID, "buses": ground_buses}]),
    );
    document.insert("potential_refs".into(), Value::Array(potential_refs));
    document.insert("buses".into(), Value::Array(buses));
    document.insert("branches".into(), Value::Array(branches));
    document.insert("loads".into(), Value::Array(loads));
    document.insert("sources".into(), Value::Array(sources));
    document.insert("line_types".into(), Value::Array(line_types));
    document.insert("transformer_types".into(), Value::Array(transformer_types));
    Ok(Value::Object(document))
}

/// Old load `function` tags to phases and load representation.
fn convert_load(load: &Map<String, Value>) -> GridResult<Value> {
    let id = required(load, "id", "load")?;
    let what = format!("load {}", label(id));
    let function = string(load, "function", &what)?;
    let bad_function = || {
        GridError::BadLoadType(format!(
            "Unknown function {function:?} for the {what}, expected 'flexible' or one of y|d followed by _pq, _i or _z."
        ))
    };

    let (phases, kind) = if function == "flexible" {
        ("abcn", "power")
    } else {
        let connection = function.get(..1).unwrap_or_default();
        let rest = function.get(1..).unwrap_or_default();
        let (rest, neutral) = match rest.strip_suffix("_neutral") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let kind = match rest {
            "_pq" => "power",
            "_i" => "current",
            "_z" => "impedance",
            _ => return Err(bad_function()),
        };
        let phases = match (connection, neutral) {
            ("y", true) => "abcn",
            ("y", false) | ("d", false) => "abc",
            _ => return Err(bad_function()),
        };
        (phases, kind)
    };

    let (values_key, components) = match kind {
        "power" => ("powers", ["sa", "sb", "sc"]),
        "current" => ("currents", ["ia", "ib", "ic"]),
        _ => ("impedances", ["za", "zb", "zc"]),
    };
    let values = super::object(required(load, values_key, &what)?, &format!("{values_key} of the {what}"))?;
    let values = components
        .iter()
        .map(|k| complex(required(values, k, &what)?, &format!("{k} of the {what}")))
        .collect::<GridResult<Vec<_>>>()?;

    let mut converted = Map::new();
    converted.insert("id".into(), id.clone());
    converted.insert("bus".into(), required(load, "bus", &what)?.clone());
    converted.insert("phases".into(), json!(phases));
    converted.insert("type".into(), json!(kind));
    converted.insert(values_key.into(), Value::Array(values));
    if function == "flexible" {
        if let Some(parameters) = load.get("parameters") {
            converted.insert("flexible_params".into(), parameters.clone());
        }
    }
    Ok(Value::Object(converted))
}

/// `{re, im}` matrix to the `[re, im]` form, with its dimension.
fn matrix(value: &Value, what: &str) -> GridResult<(Value, usize)> {
    let parts = super::object(value, what)?;
    let re = required(parts, "re", what)?;
    let im = required(parts, "im", what)?;
    let dimension = square_dimension(re)
        .filter(|n| square_dimension(im) == Some(*n))
        .ok_or_else(|| {
            GridError::BadDocument(format!(
                "The {what} must have square real and imaginary parts of the same size."
            ))
        })?;
    Ok((json!([re, im]), dimension))
}

fn square_dimension(value: &Value) -> Option<usize> {
    let rows = value.as_array()?;
    rows.iter()
        .all(|row| {
            row.as_array()
                .is_some_and(|r| r.len() == rows.len() && r.iter().all(Value::is_number))
        })
        .then_some(rows.len())
}

/// `base`, or `base_0`, `base_1`, ... if taken.
pub(super) fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (0..)
        .map(|k| format!("{base}_{k}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(value: Value) -> GridResult<Value> {
        let mut diagnostics = Diagnostics::new();
        to_v1(value.as_object().unwrap(), &mut diagnostics)
    }

    #[test]
    fn load_functions_map_to_phases_and_kinds() {
        let load = |function: &str| {
            json!({
                "id": "l", "bus": "b", "function": function,
                "powers": {"sa": [1.0, 0.5], "sb": 2.0, "sc": [3.0, 0.0]},
                "currents": {"ia": 1.0, "ib": 1.0, "ic": 1.0},
                "impedances": {"za": 1.0, "zb": 1.0, "zc": 1.0}
            })
        };
        let y = convert_load(load("y_pq_neutral").as_object().unwrap()).unwrap();
        assert_eq!(y["phases"], "abcn");
        assert_eq!(y["type"], "power");
        assert_eq!(y["powers"], json!([[1.0, 0.5], [2.0, 0.0], [3.0, 0.0]]));

        let d = convert_load(load("d_i").as_object().unwrap()).unwrap();
        assert_eq!(d["phases"], "abc");
        assert_eq!(d["type"], "current");
        assert!(d.get("powers").is_none());

        let err = convert_load(load("d_z_neutral").as_object().unwrap()).unwrap_err();
        assert_eq!(err.kind(), gridnet_core::ErrorKind::BadLoadType);
        assert!(convert_load(load("x_pq").as_object().unwrap()).is_err());
    }

    #[test]
    fn unknown_branch_type_is_rejected() {
        let err = convert(json!({
            "buses": [{"id": "a", "type": "bus"}, {"id": "b", "type": "bus"}],
            "branches": [{"id": "x", "type": "fuse", "bus1": "a", "bus2": "b"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind(), gridnet_core::ErrorKind::BadBranchType);
    }

    #[test]
    fn delta_secondary_gets_its_own_reference() {
        let converted = convert(json!({
            "buses": [
                {"id": "mv", "type": "slack", "voltages": {"va": 11547.0, "vb": [-5773.5, -10000.0], "vc": [-5773.5, 10000.0]}},
                {"id": "lv", "type": "bus_neutral"}
            ],
            "branches": [
                {"id": "tr", "type": "transformer", "bus1": "mv", "bus2": "lv", "type_name": "t160", "tap": 1.025}
            ],
            "transformer_types": [
                {"name": "t160", "sn": 160000.0, "uhv": 20000.0, "ulv": 400.0, "i0": 0.023, "p0": 460.0, "psc": 2350.0, "vsc": 0.04, "type": "Yd11"}
            ]
        }))
        .unwrap();
        let prefs = converted["potential_refs"].as_array().unwrap();
        assert_eq!(prefs.len(), 2);
        assert_eq!(prefs[1], json!({"id": "pref_tr", "bus": "lv"}));
        assert_eq!(converted["branches"][0]["phases1"], "abcn");
        assert_eq!(converted["branches"][0]["phases2"], "abc");
        assert_eq!(converted["branches"][0]["tap"], 1.025);
        assert_eq!(converted["transformer_types"][0]["id"], "t160");
    }

    #[test]
    fn unique_ids_get_a_numeric_suffix() {
        let taken = HashSet::from(["p".to_string(), "p_0".to_string()]);
        assert_eq!(unique_id("q", &taken), "q");
        assert_eq!(unique_id("p", &taken), "p_1");
    }
}
