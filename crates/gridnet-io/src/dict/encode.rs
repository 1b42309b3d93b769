//! Network -> current-version document.

use std::sync::Arc;

use gridnet_core::{
    BranchKind, ElementCategory, ElementId, ElementIndex, ElementKind, GridError, GridResult,
    LineParameters, LoadKind, Network, ParameterCategory, TransformerParameters,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::schema::{
    branch_results, bus_results, ground_results, load_results, potential_ref_results,
    source_results, BusData, GroundConnectionData, GroundData, LineData, LineParametersData,
    LoadData, NetworkDocument, PotentialRefData, ShortCircuitData, ShortCircuitSpec, SourceData,
    SwitchData, TransformerData, TransformerParametersData, CURRENT_VERSION,
};

/// Serialize `network` as a current-version document.
///
/// Shared parameters are emitted once per id, sorted by id. Two different
/// parameter objects under the same id fail with `DuplicateParameterId`.
pub fn to_dict(network: &Network, include_results: bool) -> GridResult<Value> {
    let document = to_document(network, include_results)?;
    Ok(serde_json::to_value(document)?)
}

/// Keeps `results` only when they were requested.
fn gate<T>(include: bool, results: Option<T>) -> Option<T> {
    if include {
        results
    } else {
        None
    }
}

/// Typed form of [`to_dict`].
pub fn to_document(network: &Network, include_results: bool) -> GridResult<NetworkDocument> {
    let graph = network.graph();
    let id_of = |index: ElementIndex| -> GridResult<ElementId> {
        graph.get(index).map(|e| e.id.clone()).ok_or_else(|| {
            GridError::UnknownElement(format!(
                "The element #{} is referenced but not stored in the network.",
                index.index()
            ))
        })
    };

    let mut document = NetworkDocument {
        version: CURRENT_VERSION,
        is_multiphase: true,
        grounds: Vec::new(),
        potential_refs: Vec::new(),
        buses: Vec::new(),
        lines: Vec::new(),
        transformers: Vec::new(),
        switches: Vec::new(),
        loads: Vec::new(),
        sources: Vec::new(),
        lines_params: Vec::new(),
        transformers_params: Vec::new(),
        short_circuits: Vec::new(),
    };

    for element in network.elements(ElementCategory::Ground) {
        let Some(ground) = element.as_ground() else {
            continue;
        };
        let buses = ground
            .connections
            .iter()
            .map(|c| {
                Ok(GroundConnectionData {
                    id: id_of(c.bus)?,
                    phase: c.phase,
                })
            })
            .collect::<GridResult<Vec<_>>>()?;
        document.grounds.push(GroundData {
            id: element.id.clone(),
            buses,
            results: gate(include_results, ground_results(&element.results)),
        });
    }

    for element in network.elements(ElementCategory::PotentialRef) {
        let Some(pref) = element.as_potential_ref() else {
            continue;
        };
        let target = id_of(pref.element)?;
        let on_ground = graph.category(pref.element) == Some(ElementCategory::Ground);
        document.potential_refs.push(PotentialRefData {
            id: element.id.clone(),
            bus: (!on_ground).then(|| target.clone()),
            ground: on_ground.then_some(target),
            phases: pref
                .phases
                .as_ref()
                .map(|p| p.iter().map(|phase| phase.as_char()).collect()),
            results: gate(include_results, potential_ref_results(&element.results)),
        });
    }

    for element in network.elements(ElementCategory::Bus) {
        let Some(bus) = element.as_bus() else {
            continue;
        };
        document.buses.push(BusData {
            id: element.id.clone(),
            phases: bus.phases.clone(),
            geometry: bus.geometry.clone(),
            nominal_voltage: bus.nominal_voltage,
            min_voltage_level: bus.min_voltage_level,
            max_voltage_level: bus.max_voltage_level,
            initial_potentials: bus.initial_potentials.clone(),
            results: gate(include_results, bus_results(&element.results)),
        });
        for short_circuit in &bus.short_circuits {
            document.short_circuits.push(ShortCircuitData {
                bus_id: element.id.clone(),
                short_circuit: ShortCircuitSpec {
                    phases: short_circuit.phases.clone(),
                    ground: short_circuit.ground.map(&id_of).transpose()?,
                },
            });
        }
    }

    let mut lines_params: IndexMap<ElementId, Arc<LineParameters>> = IndexMap::new();
    let mut transformers_params: IndexMap<ElementId, Arc<TransformerParameters>> = IndexMap::new();

    for element in network.elements(ElementCategory::Branch) {
        let Some(branch) = element.as_branch() else {
            continue;
        };
        let bus1 = id_of(branch.bus1)?;
        let bus2 = id_of(branch.bus2)?;
        let branch_data = gate(include_results, branch_results(&element.results));
        match &branch.kind {
            BranchKind::Line(line) => {
                register(
                    &mut lines_params,
                    &line.parameters,
                    &line.parameters.id,
                    ParameterCategory::Line,
                )?;
                document.lines.push(LineData {
                    id: element.id.clone(),
                    bus1,
                    bus2,
                    phases: branch.phases1.clone(),
                    length: line.length,
                    params_id: line.parameters.id.clone(),
                    ground: line.ground.map(&id_of).transpose()?,
                    max_loading: line.max_loading,
                    geometry: branch.geometry.clone(),
                    results: branch_data,
                });
            }
            BranchKind::Transformer(transformer) => {
                register(
                    &mut transformers_params,
                    &transformer.parameters,
                    &transformer.parameters.id,
                    ParameterCategory::Transformer,
                )?;
                document.transformers.push(TransformerData {
                    id: element.id.clone(),
                    bus1,
                    bus2,
                    phases1: branch.phases1.clone(),
                    phases2: branch.phases2.clone(),
                    tap: transformer.tap,
                    params_id: transformer.parameters.id.clone(),
                    max_loading: transformer.max_loading,
                    geometry: branch.geometry.clone(),
                    results: branch_data,
                });
            }
            BranchKind::Switch(switch) => document.switches.push(SwitchData {
                id: element.id.clone(),
                bus1,
                bus2,
                phases: branch.phases1.clone(),
                closed: switch.closed,
                geometry: branch.geometry.clone(),
                results: branch_data,
            }),
        }
    }

    for element in network.elements(ElementCategory::Load) {
        let Some(load) = element.as_load() else {
            continue;
        };
        let mut data = LoadData {
            id: element.id.clone(),
            bus: id_of(load.bus)?,
            phases: load.phases.clone(),
            load_type: load.kind.tag().to_string(),
            powers: None,
            currents: None,
            impedances: None,
            flexible_params: None,
            results: gate(include_results, load_results(&element.results)),
        };
        match &load.kind {
            LoadKind::Power {
                powers,
                flexible_params,
            } => {
                data.powers = Some(powers.clone());
                data.flexible_params = flexible_params.clone();
            }
            LoadKind::Current { currents } => data.currents = Some(currents.clone()),
            LoadKind::Impedance { impedances } => data.impedances = Some(impedances.clone()),
        }
        document.loads.push(data);
    }

    for element in network.elements(ElementCategory::Source) {
        let ElementKind::Source(source) = &element.kind else {
            continue;
        };
        document.sources.push(SourceData {
            id: element.id.clone(),
            bus: id_of(source.bus)?,
            phases: source.phases.clone(),
            voltages: source.voltages.clone(),
            results: gate(include_results, source_results(&element.results)),
        });
    }

    lines_params.sort_keys();
    transformers_params.sort_keys();
    document.lines_params = lines_params
        .values()
        .map(|p| line_parameters_data(p))
        .collect();
    document.transformers_params = transformers_params
        .values()
        .map(|p| TransformerParametersData {
            id: p.id.clone(),
            vg: p.vg.clone(),
            sn: p.sn,
            up: p.up,
            us: p.us,
            i0: p.i0,
            p0: p.p0,
            psc: p.psc,
            vsc: p.vsc,
        })
        .collect();

    debug!(
        buses = document.buses.len(),
        lines = document.lines.len(),
        lines_params = document.lines_params.len(),
        "network encoded"
    );
    Ok(document)
}

/// Keep one parameter object per id; same id with other content is an error.
fn register<P: PartialEq>(
    seen: &mut IndexMap<ElementId, Arc<P>>,
    params: &Arc<P>,
    id: &ElementId,
    category: ParameterCategory,
) -> GridResult<()> {
    match seen.get(id) {
        Some(existing) if Arc::ptr_eq(existing, params) || **existing == **params => Ok(()),
        Some(_) => Err(GridError::DuplicateParameterId {
            id: id.to_string(),
            category,
        }),
        None => {
            seen.insert(id.clone(), Arc::clone(params));
            Ok(())
        }
    }
}

fn line_parameters_data(p: &LineParameters) -> LineParametersData {
    LineParametersData {
        id: p.id.clone(),
        z_line: p.z_line.clone(),
        y_shunt: p.y_shunt.clone(),
        line_type: p.line_type,
        ampacities: p.ampacities.map(|a| a.to_vec()),
        materials: p.materials.as_ref().map(|m| m.to_vec()),
        insulators: p.insulators.as_ref().map(|m| m.to_vec()),
        sections: p.sections.map(|s| s.to_vec()),
    }
}
