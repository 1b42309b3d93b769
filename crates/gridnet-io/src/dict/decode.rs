//! Current-version document -> element arena.
//!
//! Elements are rebuilt in dependency order: parameters, buses, loads and
//! sources, grounds, potential references, branches, then short circuits.
//! A `DocumentBuilder` keeps the id maps used to resolve cross references.

use std::collections::HashMap;
use std::sync::Arc;

use gridnet_core::{
    Branch, BranchKind, Bus, Element, ElementCategory, ElementCollections, ElementGraph,
    ElementId, ElementIndex, ElementKind, ElementResults, GridError, GridResult, Line,
    LineParameters, Load, LoadKind, Network, ParameterCategory, Phase, PotentialRef,
    ShortCircuit, Transformer, TransformerParameters, SLOT_COUNT,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::schema::{
    BusData, GroundData, LineData, LineParametersData, LoadData, NetworkDocument,
    PotentialRefData, ShortCircuitData, SourceData, SwitchData, TransformerData,
    TransformerParametersData, CURRENT_VERSION,
};

/// Rebuild the element arena and the declared collections of a document.
///
/// The document must already be at the current version; run it through
/// [`crate::migrate`] first when it may be older.
pub fn from_dict(data: &Value) -> GridResult<(ElementGraph, ElementCollections)> {
    let document = parse_document(data)?;
    from_document(&document)
}

/// Rebuild a validated [`Network`] from a current-version document.
pub fn network_from_dict(data: &Value) -> GridResult<Network> {
    let (graph, collections) = from_dict(data)?;
    Network::from_collections(graph, collections)
}

fn parse_document(data: &Value) -> GridResult<NetworkDocument> {
    let version = data.get("version").and_then(Value::as_u64);
    if version != Some(u64::from(CURRENT_VERSION)) {
        return Err(GridError::UnsupportedVersion {
            found: data
                .get("version")
                .map(Value::to_string)
                .unwrap_or_else(|| "0".to_string()),
            current: CURRENT_VERSION,
        });
    }
    let document: NetworkDocument = serde_json::from_value(data.clone())?;
    if !document.is_multiphase {
        return Err(GridError::BadDocument(
            "Only multiphase networks can be read, 'is_multiphase' must be true.".to_string(),
        ));
    }
    Ok(document)
}

/// Typed form of [`from_dict`].
pub fn from_document(document: &NetworkDocument) -> GridResult<(ElementGraph, ElementCollections)> {
    let mut builder = DocumentBuilder::default();
    for params in &document.lines_params {
        builder.add_line_parameters(params)?;
    }
    for params in &document.transformers_params {
        builder.add_transformer_parameters(params)?;
    }
    for bus in &document.buses {
        builder.add_bus(bus)?;
    }
    for load in &document.loads {
        builder.add_load(load)?;
    }
    for source in &document.sources {
        builder.add_source(source)?;
    }
    for ground in &document.grounds {
        builder.add_ground(ground)?;
    }
    for pref in &document.potential_refs {
        builder.add_potential_ref(pref)?;
    }
    for line in &document.lines {
        builder.add_line(line)?;
    }
    for transformer in &document.transformers {
        builder.add_transformer(transformer)?;
    }
    for switch in &document.switches {
        builder.add_switch(switch)?;
    }
    for short_circuit in &document.short_circuits {
        builder.add_short_circuit(short_circuit)?;
    }
    debug!(
        elements = builder.graph.len(),
        links = builder.graph.link_count(),
        "document decoded"
    );
    Ok(builder.finish())
}

#[derive(Default)]
struct DocumentBuilder {
    graph: ElementGraph,
    ids: HashMap<ElementCategory, IndexMap<ElementId, ElementIndex>>,
    lines_params: HashMap<ElementId, Arc<LineParameters>>,
    transformers_params: HashMap<ElementId, Arc<TransformerParameters>>,
}

impl DocumentBuilder {
    fn finish(self) -> (ElementGraph, ElementCollections) {
        let DocumentBuilder {
            graph, mut ids, ..
        } = self;
        let mut take = |category| ids.remove(&category).unwrap_or_default().into();
        let collections = ElementCollections {
            buses: take(ElementCategory::Bus),
            branches: take(ElementCategory::Branch),
            loads: take(ElementCategory::Load),
            sources: take(ElementCategory::Source),
            grounds: take(ElementCategory::Ground),
            potential_refs: take(ElementCategory::PotentialRef),
        };
        (graph, collections)
    }

    fn store(&mut self, element: Element) -> GridResult<ElementIndex> {
        let category = element.category();
        let id = element.id.clone();
        if self
            .ids
            .get(&category)
            .is_some_and(|ids| ids.contains_key(&id))
        {
            return Err(GridError::DuplicateId(format!(
                "The {category} id {id} is used more than once in the document."
            )));
        }
        let index = self.graph.insert(element)?;
        self.ids.entry(category).or_default().insert(id, index);
        Ok(index)
    }

    fn resolve(
        &self,
        category: ElementCategory,
        id: &ElementId,
        user: &str,
    ) -> GridResult<ElementIndex> {
        self.ids
            .get(&category)
            .and_then(|ids| ids.get(id))
            .copied()
            .ok_or_else(|| {
                GridError::UnknownElement(format!(
                    "The {category} {id} referenced by {user} is not in the document."
                ))
            })
    }

    fn add_line_parameters(&mut self, data: &LineParametersData) -> GridResult<()> {
        let what = format!("line parameters {}", data.id);
        let params = LineParameters {
            id: data.id.clone(),
            z_line: data.z_line.clone(),
            y_shunt: data.y_shunt.clone(),
            line_type: data.line_type,
            ampacities: slots(&data.ampacities, "ampacities", &what)?,
            materials: slots(&data.materials, "materials", &what)?,
            insulators: slots(&data.insulators, "insulators", &what)?,
            sections: slots(&data.sections, "sections", &what)?,
        };
        params.check_shape()?;
        if self.lines_params.contains_key(&params.id) {
            return Err(GridError::DuplicateParameterId {
                id: params.id.to_string(),
                category: ParameterCategory::Line,
            });
        }
        self.lines_params.insert(params.id.clone(), Arc::new(params));
        Ok(())
    }

    fn add_transformer_parameters(&mut self, data: &TransformerParametersData) -> GridResult<()> {
        let params = TransformerParameters {
            id: data.id.clone(),
            vg: data.vg.clone(),
            sn: data.sn,
            up: data.up,
            us: data.us,
            i0: data.i0,
            p0: data.p0,
            psc: data.psc,
            vsc: data.vsc,
        };
        params.vector_group()?;
        if self.transformers_params.contains_key(&params.id) {
            return Err(GridError::DuplicateParameterId {
                id: params.id.to_string(),
                category: ParameterCategory::Transformer,
            });
        }
        self.transformers_params
            .insert(params.id.clone(), Arc::new(params));
        Ok(())
    }

    fn add_bus(&mut self, data: &BusData) -> GridResult<()> {
        let bus = Bus {
            geometry: data.geometry.clone(),
            nominal_voltage: data.nominal_voltage,
            min_voltage_level: data.min_voltage_level,
            max_voltage_level: data.max_voltage_level,
            initial_potentials: data.initial_potentials.clone(),
            ..Bus::new(data.phases.clone())
        };
        let mut element = Element::bus(data.id.clone(), bus);
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_load(&mut self, data: &LoadData) -> GridResult<()> {
        let user = format!("the load {}", data.id);
        let bus = self.resolve(ElementCategory::Bus, &data.bus, &user)?;
        let values = |field: &Option<Vec<_>>, name: &str| {
            field.clone().ok_or_else(|| {
                GridError::BadDocument(format!(
                    "The {} load {} has no '{name}'.",
                    data.load_type, data.id
                ))
            })
        };
        let kind = match data.load_type.as_str() {
            "power" => LoadKind::Power {
                powers: values(&data.powers, "powers")?,
                flexible_params: data.flexible_params.clone(),
            },
            "current" => LoadKind::Current {
                currents: values(&data.currents, "currents")?,
            },
            "impedance" => LoadKind::Impedance {
                impedances: values(&data.impedances, "impedances")?,
            },
            other => {
                return Err(GridError::BadLoadType(format!(
                    "Unknown load type {other:?} for the load {}, expected 'power', 'current' or 'impedance'.",
                    data.id
                )))
            }
        };
        if data.flexible_params.is_some() && !matches!(kind, LoadKind::Power { .. }) {
            return Err(GridError::BadLoadType(format!(
                "Only power loads can be flexible, the load {} is a {} load.",
                data.id, data.load_type
            )));
        }
        let load = Load {
            bus,
            phases: data.phases.clone(),
            kind,
        };
        let mut element = Element::load(data.id.clone(), load);
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_source(&mut self, data: &SourceData) -> GridResult<()> {
        let user = format!("the voltage source {}", data.id);
        let bus = self.resolve(ElementCategory::Bus, &data.bus, &user)?;
        let mut element = Element::source(
            data.id.clone(),
            bus,
            data.phases.clone(),
            data.voltages.clone(),
        );
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_ground(&mut self, data: &GroundData) -> GridResult<()> {
        let user = format!("the ground {}", data.id);
        let connections = data
            .buses
            .iter()
            .map(|c| Ok((self.resolve(ElementCategory::Bus, &c.id, &user)?, c.phase)))
            .collect::<GridResult<Vec<_>>>()?;
        let mut element = Element::ground(data.id.clone());
        element.results = data.results.clone().map(ElementResults::from);
        let ground = self.store(element)?;
        for (bus, phase) in connections {
            self.graph.connect_ground(ground, bus, phase)?;
        }
        Ok(())
    }

    fn add_potential_ref(&mut self, data: &PotentialRefData) -> GridResult<()> {
        let user = format!("the potential reference {}", data.id);
        let target = match (&data.bus, &data.ground) {
            (Some(bus), None) => self.resolve(ElementCategory::Bus, bus, &user)?,
            (None, Some(ground)) => self.resolve(ElementCategory::Ground, ground, &user)?,
            _ => {
                return Err(GridError::InvalidPotentialRef(format!(
                    "The potential reference {} must be attached to either a bus or a ground.",
                    data.id
                )))
            }
        };
        let phases = data
            .phases
            .as_deref()
            .map(|s| {
                s.chars()
                    .map(|c| {
                        Phase::from_char(c).ok_or_else(|| {
                            GridError::BadPhase(format!(
                                "Phase {c:?} of the potential reference {} is not a valid phase.",
                                data.id
                            ))
                        })
                    })
                    .collect::<GridResult<Vec<_>>>()
            })
            .transpose()?;
        let pref = PotentialRef {
            element: target,
            phases,
        };
        let mut element = Element::new(data.id.clone(), ElementKind::PotentialRef(pref));
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_line(&mut self, data: &LineData) -> GridResult<()> {
        let user = format!("the line {}", data.id);
        let bus1 = self.resolve(ElementCategory::Bus, &data.bus1, &user)?;
        let bus2 = self.resolve(ElementCategory::Bus, &data.bus2, &user)?;
        let parameters = self
            .lines_params
            .get(&data.params_id)
            .cloned()
            .ok_or_else(|| {
                GridError::UnknownElement(format!(
                    "The line parameters {} used by {user} are not in the document.",
                    data.params_id
                ))
            })?;
        let ground = data
            .ground
            .as_ref()
            .map(|g| self.resolve(ElementCategory::Ground, g, &user))
            .transpose()?;
        let line = Line {
            ground,
            max_loading: data.max_loading,
            ..Line::new(parameters, data.length)
        };
        let mut branch = Branch::line(bus1, bus2, data.phases.clone(), line);
        branch.geometry = data.geometry.clone();
        let mut element = Element::branch(data.id.clone(), branch);
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_transformer(&mut self, data: &TransformerData) -> GridResult<()> {
        let user = format!("the transformer {}", data.id);
        let bus1 = self.resolve(ElementCategory::Bus, &data.bus1, &user)?;
        let bus2 = self.resolve(ElementCategory::Bus, &data.bus2, &user)?;
        let parameters = self
            .transformers_params
            .get(&data.params_id)
            .cloned()
            .ok_or_else(|| {
                GridError::UnknownElement(format!(
                    "The transformer parameters {} used by {user} are not in the document.",
                    data.params_id
                ))
            })?;
        let transformer = Transformer {
            parameters,
            tap: data.tap,
            max_loading: data.max_loading,
        };
        let mut branch = Branch::transformer(
            bus1,
            bus2,
            data.phases1.clone(),
            data.phases2.clone(),
            transformer,
        );
        branch.geometry = data.geometry.clone();
        let mut element = Element::branch(data.id.clone(), branch);
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_switch(&mut self, data: &SwitchData) -> GridResult<()> {
        let user = format!("the switch {}", data.id);
        let bus1 = self.resolve(ElementCategory::Bus, &data.bus1, &user)?;
        let bus2 = self.resolve(ElementCategory::Bus, &data.bus2, &user)?;
        let mut branch = Branch::switch(bus1, bus2, data.phases.clone());
        branch.geometry = data.geometry.clone();
        if let BranchKind::Switch(switch) = &mut branch.kind {
            switch.closed = data.closed;
        }
        let mut element = Element::branch(data.id.clone(), branch);
        element.results = data.results.clone().map(ElementResults::from);
        self.store(element)?;
        Ok(())
    }

    fn add_short_circuit(&mut self, data: &ShortCircuitData) -> GridResult<()> {
        let user = format!("the short circuit on the bus {}", data.bus_id);
        let bus = self.resolve(ElementCategory::Bus, &data.bus_id, &user)?;
        let ground = data
            .short_circuit
            .ground
            .as_ref()
            .map(|g| self.resolve(ElementCategory::Ground, g, &user))
            .transpose()?;
        self.graph.add_short_circuit(
            bus,
            ShortCircuit {
                phases: data.short_circuit.phases.clone(),
                ground,
            },
        )
    }
}

/// Per-slot metadata must have exactly one entry per `a, b, c, n` slot.
fn slots<T: Clone>(
    values: &Option<Vec<T>>,
    field: &str,
    what: &str,
) -> GridResult<Option<[T; SLOT_COUNT]>> {
    values
        .as_ref()
        .map(|v| {
            <[T; SLOT_COUNT]>::try_from(v.clone()).map_err(|v: Vec<T>| {
                GridError::BadDocument(format!(
                    "The '{field}' of the {what} must have {SLOT_COUNT} entries, got {}.",
                    v.len()
                ))
            })
        })
        .transpose()
}
