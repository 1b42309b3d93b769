//! Version 2 -> 3.
//!
//! - phase strings become canonical and per-phase values follow the new order
//! - line parameter matrices are spread over the fixed `a, b, c, n` slots, so a
//!   parameter id now implies one phase layout; ids shared by lines with
//!   different phases are split and renamed
//! - scalar conductor metadata becomes per-slot lists
//! - `max_current` / `max_power` become `max_loading` ratios
//! - bus voltage limits become ratios of the nominal voltage

use std::collections::HashSet;

use gridnet_core::{
    parameters::pad_to_slots, Diagnostics, GridError, GridResult, Phase, Phases, SLOT_COUNT,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::{label, list, number, required, string, with_keys, MIGRATION_CATEGORY};
use crate::schema::complex_matrix;

/// Scalar metadata of v2 line parameters and their per-slot v3 names.
const BROADCAST_FIELDS: [(&str, &str); 4] = [
    ("ampacity", "ampacities"),
    ("material", "materials"),
    ("insulator", "insulators"),
    ("section", "sections"),
];

/// A phase string and its canonical form.
struct NormalizedPhases {
    raw: String,
    phases: Phases,
    /// For each canonical position, the index of that phase in `raw`
    order: Vec<usize>,
}

impl NormalizedPhases {
    fn is_reordered(&self) -> bool {
        self.order.iter().enumerate().any(|(i, &o)| i != o)
    }

    /// For each canonical live phase, its index among the live phases of `raw`.
    fn live_order(&self) -> Vec<usize> {
        let raw_live: Vec<char> = self.raw.chars().filter(|c| *c != 'n').collect();
        self.phases
            .iter()
            .filter(|p| *p != Phase::N)
            .filter_map(|p| raw_live.iter().position(|c| *c == p.as_char()))
            .collect()
    }

    /// Slot of every raw phase, in raw order.
    fn raw_slots(&self) -> Vec<usize> {
        self.raw
            .chars()
            .filter_map(Phase::from_char)
            .map(|p| p.slot())
            .collect()
    }
}

/// Canonicalize the phase string stored under `key`, in place.
fn normalize_field(
    object: &mut Map<String, Value>,
    key: &str,
    what: &str,
) -> GridResult<NormalizedPhases> {
    let raw = string(object, key, what)?.to_string();
    let (phases, order) = Phases::normalize(&raw)?;
    object.insert(key.to_string(), json!(phases.to_string()));
    Ok(NormalizedPhases { raw, phases, order })
}

fn permute(values: &[Value], order: &[usize]) -> Option<Vec<Value>> {
    order.iter().map(|&i| values.get(i).cloned()).collect()
}

/// Reorder per-phase values after their phases were canonicalized.
///
/// Per-conductor values (one per phase, neutral included) always follow the
/// new order. Phase-to-neutral values (one per live phase) follow it when a
/// neutral is present. Phase-to-phase values have no unambiguous new order and
/// are kept as they are.
fn reorder(
    object: &mut Map<String, Value>,
    key: &str,
    phases: &NormalizedPhases,
    per_conductor: bool,
    what: &str,
    diagnostics: &mut Diagnostics,
) {
    if !phases.is_reordered() {
        return;
    }
    let Some(values) = object.get(key).and_then(Value::as_array) else {
        return;
    };
    let reordered = if per_conductor && values.len() == phases.raw.len() {
        permute(values, &phases.order)
    } else if phases.phases.has_neutral() && values.len() == phases.phases.live_count() {
        permute(values, &phases.live_order())
    } else {
        None
    };
    match reordered {
        Some(reordered) => {
            object.insert(key.to_string(), Value::Array(reordered));
        }
        None => diagnostics.add_warning_with_entity(
            MIGRATION_CATEGORY,
            format!(
                "The phases {:?} of the {what} were renamed {:?}; its '{key}' were kept in their original order.",
                phases.raw, phases.phases.to_string()
            ),
            what.to_string(),
        ),
    }
}

/// Phase layout inferred from the size of an unused parameter matrix.
/// Conductor slots assumed for an unused parameter matrix of this dimension.
///
/// A 1x1 matrix has no recognized phase set of its own; it is kept on the
/// `a` slot.
fn layout_for_dimension(dimension: usize) -> Option<(&'static str, Vec<usize>)> {
    match dimension {
        4 => Some(("abcn", vec![0, 1, 2, 3])),
        3 => Some(("abc", vec![0, 1, 2])),
        2 => Some(("an", vec![0, 3])),
        1 => Some(("a", vec![0])),
        _ => None,
    }
}

fn matrix_dimension(value: &Value) -> usize {
    value
        .get(0)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

/// Spread a `[re, im]` matrix given in `slots` order over the 4-slot layout.
fn pad_matrix(value: &Value, slots: &[usize], what: &str) -> GridResult<Value> {
    let (re, im): (Vec<Vec<f64>>, Vec<Vec<f64>>) = serde_json::from_value(value.clone())
        .map_err(|e| GridError::BadDocument(format!("The {what} is not a [re, im] matrix: {e}")))?;
    let matrix = complex_matrix::join(re, im).map_err(|e| GridError::BadDocument(format!("The {what}: {e}")))?;
    if matrix.len() != slots.len() || matrix.iter().any(|row| row.len() != slots.len()) {
        return Err(GridError::BadDocument(format!(
            "The {what} is {n}x{n} but it is used with {} phases.",
            slots.len(),
            n = matrix.len()
        )));
    }
    let padded = pad_to_slots(&matrix, slots);
    Ok(json!(complex_matrix::split(&padded)))
}

/// Current-version line parameters for one phase layout.
fn convert_line_parameters(
    params: &Map<String, Value>,
    id: Value,
    slots: &[usize],
) -> GridResult<Value> {
    let what = format!("line parameters {}", label(&id));
    let mut converted = Map::new();
    converted.insert("id".into(), id);
    converted.insert(
        "z_line".into(),
        pad_matrix(required(params, "z_line", &what)?, slots, &format!("z_line of the {what}"))?,
    );
    if let Some(y_shunt) = params.get("y_shunt").filter(|y| !y.is_null()) {
        converted.insert(
            "y_shunt".into(),
            pad_matrix(y_shunt, slots, &format!("y_shunt of the {what}"))?,
        );
    }
    if let Some(line_type) = params.get("line_type") {
        converted.insert("line_type".into(), line_type.clone());
    }
    for (scalar, per_slot) in BROADCAST_FIELDS {
        match params.get(scalar) {
            Some(Value::Null) | None => {}
            Some(value) => {
                converted.insert(per_slot.into(), json!(vec![value.clone(); SLOT_COUNT]));
            }
        }
    }
    Ok(Value::Object(converted))
}

pub(super) fn to_v3(data: &Map<String, Value>, diagnostics: &mut Diagnostics) -> GridResult<Value> {
    // Parameter tables, keyed by the JSON text of their id
    let mut lines_params: IndexMap<String, &Map<String, Value>> = IndexMap::new();
    for params in list(data, "lines_params")? {
        let id = required(params, "id", "line parameters")?;
        lines_params.insert(id.to_string(), params);
    }
    let mut transformers_params: IndexMap<String, &Map<String, Value>> = IndexMap::new();
    for params in list(data, "transformers_params")? {
        let id = required(params, "id", "transformer parameters")?;
        transformers_params.insert(id.to_string(), params);
    }

    // Lines: canonical phases, grouped per parameter id and phase set. The
    // first raw ordering of a set decides how its matrix rows are read.
    let mut lines = Vec::new();
    let mut usages: IndexMap<String, IndexMap<String, Vec<usize>>> = IndexMap::new();
    for line in list(data, "lines")? {
        let id = required(line, "id", "line")?;
        let what = format!("line {}", label(id));
        let params_key = required(line, "params_id", &what)?.to_string();
        let params = lines_params.get(&params_key).ok_or_else(|| {
            GridError::UnknownElement(format!(
                "The line parameters {params_key} used by the {what} are not in the document."
            ))
        })?;

        let mut converted = with_keys(line, &[], &["max_current"]);
        let phases = normalize_field(&mut converted, "phases", &what)?;
        usages
            .entry(params_key.clone())
            .or_default()
            .entry(phases.phases.to_string())
            .or_insert_with(|| phases.raw_slots());

        let ampacity = params.get("ampacity").and_then(Value::as_f64);
        let max_loading = match (line.get("max_current").and_then(Value::as_f64), ampacity) {
            (Some(max_current), Some(ampacity)) if ampacity > 0.0 => max_current / ampacity,
            (Some(_), _) => {
                diagnostics.add_warning_with_entity(
                    MIGRATION_CATEGORY,
                    format!(
                        "The {what} has a maximum current but its parameters {params_key} have no ampacity; its maximum loading was set to 1."
                    ),
                    label(id),
                );
                1.0
            }
            (None, _) => 1.0,
        };
        converted.insert("max_loading".into(), json!(max_loading));
        lines.push((converted, params_key, phases.phases.to_string()));
    }

    // Split parameters shared by several phase layouts
    let mut taken: HashSet<String> = lines_params
        .values()
        .filter_map(|p| p.get("id"))
        .map(label)
        .collect();
    let mut new_ids: IndexMap<(String, String), Value> = IndexMap::new();
    for (params_key, sets) in &usages {
        if sets.len() < 2 {
            continue;
        }
        let id = lines_params
            .get(params_key)
            .and_then(|p| p.get("id"))
            .map(label)
            .unwrap_or_else(|| params_key.clone());
        let mut minted = Vec::new();
        for phases in sets.keys() {
            let new_id = super::v0::unique_id(&format!("{id}_{phases}"), &taken);
            taken.insert(new_id.clone());
            minted.push(new_id.clone());
            new_ids.insert((params_key.clone(), phases.clone()), json!(new_id));
        }
        diagnostics.add_warning_with_entity(
            MIGRATION_CATEGORY,
            format!(
                "The line parameters {id:?} are used by lines with different phases; they were duplicated as {}.",
                minted
                    .iter()
                    .map(|m| format!("{m:?}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            id,
        );
    }

    let lines: Vec<Value> = lines
        .into_iter()
        .map(|(mut line, params_key, phases)| {
            if let Some(new_id) = new_ids.get(&(params_key, phases)) {
                line.insert("params_id".into(), new_id.clone());
            }
            Value::Object(line)
        })
        .collect();

    let mut lines_params_out = Vec::new();
    for (params_key, params) in &lines_params {
        let id = required(params, "id", "line parameters")?;
        match usages.get(params_key) {
            Some(sets) => {
                for (phases, slots) in sets {
                    let id = new_ids
                        .get(&(params_key.clone(), phases.clone()))
                        .cloned()
                        .unwrap_or_else(|| id.clone());
                    lines_params_out.push(convert_line_parameters(params, id, slots)?);
                }
            }
            None => {
                let dimension = matrix_dimension(required(params, "z_line", "line parameters")?);
                let (phases, slots) = layout_for_dimension(dimension).ok_or_else(|| {
                    GridError::BadDocument(format!(
                        "The line parameters {} are unused and their {dimension}x{dimension} matrix has no known phase layout.",
                        label(id)
                    ))
                })?;
                diagnostics.add_warning_with_entity(
                    MIGRATION_CATEGORY,
                    format!(
                        "The line parameters {} are not used by any line; phases {phases:?} were assumed from their {dimension}x{dimension} matrix.",
                        label(id)
                    ),
                    label(id),
                );
                lines_params_out.push(convert_line_parameters(params, id.clone(), &slots)?);
            }
        }
    }

    let mut transformers = Vec::new();
    for transformer in list(data, "transformers")? {
        let id = required(transformer, "id", "transformer")?;
        let what = format!("transformer {}", label(id));
        let mut converted = with_keys(transformer, &[], &["max_power"]);
        normalize_field(&mut converted, "phases1", &what)?;
        normalize_field(&mut converted, "phases2", &what)?;
        let max_loading = match transformer.get("max_power").and_then(Value::as_f64) {
            Some(max_power) => {
                let params_key = required(transformer, "params_id", &what)?.to_string();
                let params = transformers_params.get(&params_key).ok_or_else(|| {
                    GridError::UnknownElement(format!(
                        "The transformer parameters {params_key} used by the {what} are not in the document."
                    ))
                })?;
                max_power / number(params, "sn", &format!("transformer parameters {params_key}"))?
            }
            None => 1.0,
        };
        converted.insert("max_loading".into(), json!(max_loading));
        transformers.push(Value::Object(converted));
    }

    let mut switches = Vec::new();
    for switch in list(data, "switches")? {
        let id = required(switch, "id", "switch")?;
        let what = format!("switch {}", label(id));
        let mut converted = with_keys(switch, &[], &[]);
        normalize_field(&mut converted, "phases", &what)?;
        if !converted.contains_key("closed") {
            converted.insert("closed".into(), json!(true));
        }
        switches.push(Value::Object(converted));
    }

    let mut buses = Vec::new();
    for bus in list(data, "buses")? {
        let id = required(bus, "id", "bus")?;
        let what = format!("bus {}", label(id));
        let mut converted = with_keys(bus, &[], &["min_voltage", "max_voltage"]);
        let phases = normalize_field(&mut converted, "phases", &what)?;
        reorder(&mut converted, "initial_potentials", &phases, true, &what, diagnostics);

        let limits = [
            ("min_voltage", "min_voltage_level"),
            ("max_voltage", "max_voltage_level"),
        ];
        let nominal = bus.get("nominal_voltage").and_then(Value::as_f64);
        for (volts_key, level_key) in limits {
            let Some(volts) = bus.get(volts_key).and_then(Value::as_f64) else {
                continue;
            };
            match nominal {
                Some(nominal) if nominal > 0.0 => {
                    converted.insert(level_key.into(), json!(volts / nominal));
                }
                _ => diagnostics.add_warning_with_entity(
                    MIGRATION_CATEGORY,
                    format!(
                        "The {what} has a '{volts_key}' but no nominal voltage; the limit was dropped."
                    ),
                    label(id),
                ),
            }
        }
        buses.push(Value::Object(converted));
    }

    let mut loads = Vec::new();
    for load in list(data, "loads")? {
        let id = required(load, "id", "load")?;
        let what = format!("load {}", label(id));
        let mut converted = with_keys(load, &[], &[]);
        let phases = normalize_field(&mut converted, "phases", &what)?;
        for key in ["powers", "currents", "impedances", "flexible_params"] {
            if converted.contains_key(key) {
                reorder(&mut converted, key, &phases, false, &what, diagnostics);
            }
        }
        loads.push(Value::Object(converted));
    }

    let mut sources = Vec::new();
    for source in list(data, "sources")? {
        let id = required(source, "id", "source")?;
        let what = format!("source {}", label(id));
        let mut converted = with_keys(source, &[], &[]);
        let phases = normalize_field(&mut converted, "phases", &what)?;
        reorder(&mut converted, "voltages", &phases, false, &what, diagnostics);
        sources.push(Value::Object(converted));
    }

    let carried = |key: &str| data.get(key).cloned().unwrap_or_else(|| json!([]));
    let mut document = Map::new();
    document.insert("version".into(), json!(3));
    document.insert("is_multiphase".into(), json!(true));
    document.insert("grounds".into(), carried("grounds"));
    document.insert("potential_refs".into(), carried("potential_refs"));
    document.insert("buses".into(), Value::Array(buses));
    document.insert("lines".into(), Value::Array(lines));
    document.insert("transformers".into(), Value::Array(transformers));
    document.insert("switches".into(), Value::Array(switches));
    document.insert("loads".into(), Value::Array(loads));
    document.insert("sources".into(), Value::Array(sources));
    document.insert("lines_params".into(), Value::Array(lines_params_out));
    document.insert("transformers_params".into(), carried("transformers_params"));
    if let Some(short_circuits) = data.get("short_circuits") {
        document.insert("short_circuits".into(), short_circuits.clone());
    }
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalized(raw: &str) -> NormalizedPhases {
        let (phases, order) = Phases::normalize(raw).unwrap();
        NormalizedPhases {
            raw: raw.to_string(),
            phases,
            order,
        }
    }

    #[test]
    fn live_values_follow_the_canonical_order() {
        let phases = normalized("cabn");
        assert_eq!(phases.phases.to_string(), "abcn");
        assert_eq!(phases.live_order(), vec![1, 2, 0]);

        let mut load = json!({"powers": ["c", "a", "b"]}).as_object().cloned().unwrap();
        let mut diagnostics = Diagnostics::new();
        reorder(&mut load, "powers", &phases, false, "load 1", &mut diagnostics);
        assert_eq!(load["powers"], json!(["a", "b", "c"]));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn delta_values_are_kept_with_a_warning() {
        let phases = normalized("ba");
        let mut load = json!({"powers": [[1.0, 0.0]]}).as_object().cloned().unwrap();
        let mut diagnostics = Diagnostics::new();
        reorder(&mut load, "powers", &phases, false, "load 1", &mut diagnostics);
        assert_eq!(load["powers"], json!([[1.0, 0.0]]));
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn matrices_are_padded_in_raw_order() {
        // 2x2 matrix on phases "na": row 0 is n, row 1 is a
        let matrix = json!([[[1.0, 2.0], [3.0, 4.0]], [[0.0, 0.0], [0.0, 0.0]]]);
        let padded = pad_matrix(&matrix, &normalized("na").raw_slots(), "z").unwrap();
        assert_eq!(padded[0][3][3], 1.0);
        assert_eq!(padded[0][0][0], 4.0);
        assert_eq!(padded[0][3][0], 2.0);
        assert_eq!(padded[0][1][1], 0.0);

        let err = pad_matrix(&matrix, &[0, 1, 2], "z").unwrap_err();
        assert_eq!(err.kind(), gridnet_core::ErrorKind::BadDocument);
    }

    #[test]
    fn metadata_is_broadcast_to_every_slot() {
        let params = json!({
            "id": "lp", "z_line": [[[1.0]], [[0.5]]],
            "ampacity": 150.0, "material": "AL", "line_type": "underground"
        });
        let converted =
            convert_line_parameters(params.as_object().unwrap(), json!("lp"), &[0]).unwrap();
        assert_eq!(converted["ampacities"], json!([150.0, 150.0, 150.0, 150.0]));
        assert_eq!(converted["materials"], json!(["AL", "AL", "AL", "AL"]));
        assert_eq!(converted["line_type"], "underground");
        assert!(converted.get("ampacity").is_none());
        assert!(converted.get("y_shunt").is_none());
        assert_eq!(converted["z_line"][1][0], json!([0.5, 0.0, 0.0, 0.0]));
    }
}
