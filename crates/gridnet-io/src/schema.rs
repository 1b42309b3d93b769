//! Serde shapes of the current document version.
//!
//! Complex scalars travel as `[re, im]` pairs (num-complex's serde form) and
//! complex matrices as `[re_matrix, im_matrix]`. Cross references between
//! elements are bare ids.

use gridnet_core::{
    ComplexMatrix, ElementId, ElementResults, FlexibleParameter, LineType, Phase, Phases,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version written by the encoder and required by the decoder.
pub const CURRENT_VERSION: u32 = 3;

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub version: u32,
    #[serde(default = "default_true")]
    pub is_multiphase: bool,
    #[serde(default)]
    pub grounds: Vec<GroundData>,
    #[serde(default)]
    pub potential_refs: Vec<PotentialRefData>,
    #[serde(default)]
    pub buses: Vec<BusData>,
    #[serde(default)]
    pub lines: Vec<LineData>,
    #[serde(default)]
    pub transformers: Vec<TransformerData>,
    #[serde(default)]
    pub switches: Vec<SwitchData>,
    #[serde(default)]
    pub loads: Vec<LoadData>,
    #[serde(default)]
    pub sources: Vec<SourceData>,
    #[serde(default)]
    pub lines_params: Vec<LineParametersData>,
    #[serde(default)]
    pub transformers_params: Vec<TransformerParametersData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_circuits: Vec<ShortCircuitData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundConnectionData {
    pub id: ElementId,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundData {
    pub id: ElementId,
    #[serde(default)]
    pub buses: Vec<GroundConnectionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<GroundResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialRefData {
    pub id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PotentialRefResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusData {
    pub id: ElementId,
    pub phases: Phases,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_voltage_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_voltage_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_potentials: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BusResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineData {
    pub id: ElementId,
    pub bus1: ElementId,
    pub bus2: ElementId,
    pub phases: Phases,
    pub length: f64,
    pub params_id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground: Option<ElementId>,
    #[serde(default = "default_one")]
    pub max_loading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BranchResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerData {
    pub id: ElementId,
    pub bus1: ElementId,
    pub bus2: ElementId,
    pub phases1: Phases,
    pub phases2: Phases,
    #[serde(default = "default_one")]
    pub tap: f64,
    pub params_id: ElementId,
    #[serde(default = "default_one")]
    pub max_loading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BranchResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchData {
    pub id: ElementId,
    pub bus1: ElementId,
    pub bus2: ElementId,
    pub phases: Phases,
    #[serde(default = "default_true")]
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BranchResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadData {
    pub id: ElementId,
    pub bus: ElementId,
    pub phases: Phases,
    /// `power`, `current` or `impedance`
    #[serde(rename = "type")]
    pub load_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powers: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currents: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impedances: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flexible_params: Option<Vec<FlexibleParameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<LoadResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceData {
    pub id: ElementId,
    pub bus: ElementId,
    pub phases: Phases,
    pub voltages: Vec<Complex64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<SourceResultsData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineParametersData {
    pub id: ElementId,
    #[serde(with = "complex_matrix")]
    pub z_line: ComplexMatrix,
    #[serde(
        default,
        with = "option_complex_matrix",
        skip_serializing_if = "Option::is_none"
    )]
    pub y_shunt: Option<ComplexMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_type: Option<LineType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ampacities: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulators: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerParametersData {
    pub id: ElementId,
    pub vg: String,
    pub sn: f64,
    pub up: f64,
    pub us: f64,
    pub i0: f64,
    pub p0: f64,
    pub psc: f64,
    pub vsc: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCircuitSpec {
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub ground: Option<ElementId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCircuitData {
    pub bus_id: ElementId,
    pub short_circuit: ShortCircuitSpec,
}

// Result blocks. The solver response uses the same shapes, keyed by `id`.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusResultsData {
    pub potentials: Vec<Complex64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchResultsData {
    pub currents1: Vec<Complex64>,
    pub currents2: Vec<Complex64>,
    pub potentials1: Vec<Complex64>,
    pub potentials2: Vec<Complex64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResultsData {
    pub currents: Vec<Complex64>,
    pub potentials: Vec<Complex64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powers: Option<Vec<Complex64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResultsData {
    pub currents: Vec<Complex64>,
    pub potentials: Vec<Complex64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundResultsData {
    pub potential: Complex64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialRefResultsData {
    pub current: Complex64,
}

impl From<BusResultsData> for ElementResults {
    fn from(r: BusResultsData) -> Self {
        ElementResults::Bus {
            potentials: r.potentials,
        }
    }
}

impl From<BranchResultsData> for ElementResults {
    fn from(r: BranchResultsData) -> Self {
        ElementResults::Branch {
            currents1: r.currents1,
            currents2: r.currents2,
            potentials1: r.potentials1,
            potentials2: r.potentials2,
        }
    }
}

impl From<LoadResultsData> for ElementResults {
    fn from(r: LoadResultsData) -> Self {
        ElementResults::Load {
            currents: r.currents,
            potentials: r.potentials,
            powers: r.powers,
        }
    }
}

impl From<SourceResultsData> for ElementResults {
    fn from(r: SourceResultsData) -> Self {
        ElementResults::Source {
            currents: r.currents,
            potentials: r.potentials,
        }
    }
}

impl From<GroundResultsData> for ElementResults {
    fn from(r: GroundResultsData) -> Self {
        ElementResults::Ground {
            potential: r.potential,
        }
    }
}

impl From<PotentialRefResultsData> for ElementResults {
    fn from(r: PotentialRefResultsData) -> Self {
        ElementResults::PotentialRef { current: r.current }
    }
}

pub(crate) fn bus_results(results: &Option<ElementResults>) -> Option<BusResultsData> {
    match results {
        Some(ElementResults::Bus { potentials }) => Some(BusResultsData {
            potentials: potentials.clone(),
        }),
        _ => None,
    }
}

pub(crate) fn branch_results(results: &Option<ElementResults>) -> Option<BranchResultsData> {
    match results {
        Some(ElementResults::Branch {
            currents1,
            currents2,
            potentials1,
            potentials2,
        }) => Some(BranchResultsData {
            currents1: currents1.clone(),
            currents2: currents2.clone(),
            potentials1: potentials1.clone(),
            potentials2: potentials2.clone(),
        }),
        _ => None,
    }
}

pub(crate) fn load_results(results: &Option<ElementResults>) -> Option<LoadResultsData> {
    match results {
        Some(ElementResults::Load {
            currents,
            potentials,
            powers,
        }) => Some(LoadResultsData {
            currents: currents.clone(),
            potentials: potentials.clone(),
            powers: powers.clone(),
        }),
        _ => None,
    }
}

pub(crate) fn source_results(results: &Option<ElementResults>) -> Option<SourceResultsData> {
    match results {
        Some(ElementResults::Source {
            currents,
            potentials,
        }) => Some(SourceResultsData {
            currents: currents.clone(),
            potentials: potentials.clone(),
        }),
        _ => None,
    }
}

pub(crate) fn ground_results(results: &Option<ElementResults>) -> Option<GroundResultsData> {
    match results {
        Some(ElementResults::Ground { potential }) => Some(GroundResultsData {
            potential: *potential,
        }),
        _ => None,
    }
}

pub(crate) fn potential_ref_results(
    results: &Option<ElementResults>,
) -> Option<PotentialRefResultsData> {
    match results {
        Some(ElementResults::PotentialRef { current }) => {
            Some(PotentialRefResultsData { current: *current })
        }
        _ => None,
    }
}

/// `[re_matrix, im_matrix]` encoding of a complex matrix.
pub mod complex_matrix {
    use gridnet_core::ComplexMatrix;
    use num_complex::Complex64;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    type Parts = (Vec<Vec<f64>>, Vec<Vec<f64>>);

    pub fn split(matrix: &ComplexMatrix) -> Parts {
        let re = matrix
            .iter()
            .map(|row| row.iter().map(|v| v.re).collect())
            .collect();
        let im = matrix
            .iter()
            .map(|row| row.iter().map(|v| v.im).collect())
            .collect();
        (re, im)
    }

    pub fn join(re: Vec<Vec<f64>>, im: Vec<Vec<f64>>) -> Result<ComplexMatrix, String> {
        if re.len() != im.len() || re.iter().zip(&im).any(|(r, i)| r.len() != i.len()) {
            return Err("the real and imaginary parts of a matrix must have the same shape".into());
        }
        Ok(re
            .into_iter()
            .zip(im)
            .map(|(r, i)| r.into_iter().zip(i).map(|(r, i)| Complex64::new(r, i)).collect())
            .collect())
    }

    pub fn serialize<S: Serializer>(matrix: &ComplexMatrix, serializer: S) -> Result<S::Ok, S::Error> {
        split(matrix).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ComplexMatrix, D::Error> {
        let (re, im) = <Parts as Deserialize>::deserialize(deserializer)?;
        join(re, im).map_err(D::Error::custom)
    }
}

pub mod option_complex_matrix {
    use gridnet_core::ComplexMatrix;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::complex_matrix;

    pub fn serialize<S: Serializer>(
        matrix: &Option<ComplexMatrix>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match matrix {
            Some(m) => complex_matrix::serialize(m, serializer),
            None => serializer.serialize_none(),
        }
    }

    #[allow(clippy::type_complexity)]
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ComplexMatrix>, D::Error> {
        let parts: Option<(Vec<Vec<f64>>, Vec<Vec<f64>>)> = Option::deserialize(deserializer)?;
        parts
            .map(|(re, im)| complex_matrix::join(re, im))
            .transpose()
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complex_values_are_pairs() {
        let data = SourceData {
            id: "src".into(),
            bus: "sb".into(),
            phases: Phases::abcn(),
            voltages: vec![Complex64::new(230.0, 0.0)],
            results: None,
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["voltages"], json!([[230.0, 0.0]]));
        assert!(value.get("results").is_none());
    }

    #[test]
    fn matrices_are_real_and_imaginary_parts() {
        let value = json!({
            "id": "lp",
            "z_line": [[[1.0, 2.0], [3.0, 4.0]], [[0.1, 0.2], [0.3, 0.4]]]
        });
        let params: LineParametersData = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(params.z_line[1][0], Complex64::new(3.0, 0.3));
        assert!(params.y_shunt.is_none());
        assert_eq!(serde_json::to_value(&params).unwrap(), value);

        let bad = json!({"id": "lp", "z_line": [[[1.0]], [[0.1, 0.2]]]});
        assert!(serde_json::from_value::<LineParametersData>(bad).is_err());
    }

    #[test]
    fn defaults_apply_to_optional_fields() {
        let switch: SwitchData = serde_json::from_value(json!({
            "id": "sw", "bus1": "a", "bus2": 2, "phases": "abc"
        }))
        .unwrap();
        assert!(switch.closed);
        assert_eq!(switch.bus2, ElementId::Int(2));

        let line: LineData = serde_json::from_value(json!({
            "id": 1, "bus1": "a", "bus2": "b", "phases": "abcn", "length": 0.5, "params_id": "lp"
        }))
        .unwrap();
        assert_eq!(line.max_loading, 1.0);
    }
}
