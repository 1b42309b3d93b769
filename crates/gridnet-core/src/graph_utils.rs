//! The element arena and its "touches" relation.
//!
//! Every element of a network is a node of an undirected `StableGraph`; an edge
//! means the two elements touch (a branch and its buses, a load and its bus, a
//! ground and the buses it shorts, a potential reference and its target).
//! Indices stay valid across removals, so elements can keep referring to each
//! other by [`ElementIndex`] without owning anything.

use std::collections::{HashSet, VecDeque};

use anyhow::{anyhow, Result};
use petgraph::stable_graph::StableUnGraph;

use crate::{
    BranchKind, Element, ElementCategory, ElementIndex, ElementKind, GridError, GridResult,
    GroundConnection, LoadKind, Phase, Phases, ShortCircuit,
};

#[derive(Debug, Clone, Default)]
pub struct ElementGraph {
    graph: StableUnGraph<Element, ()>,
}

impl ElementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element` and link it with every element it references.
    ///
    /// Referenced indices must already be in the arena and be of the category
    /// the reference expects. The element phases must exist on its buses and
    /// its per-phase values must match those phases.
    pub fn insert(&mut self, element: Element) -> GridResult<ElementIndex> {
        let references = element.references();
        for (target, allowed) in &references {
            self.expect_category(*target, allowed, &element)?;
        }
        self.check_consistency(&element)?;
        let index = self.graph.add_node(element);
        for (target, _) in references {
            self.connect(index, target);
        }
        Ok(index)
    }

    /// Link `a` and `b`. Linking twice, or an element with itself, is a no-op.
    pub fn connect(&mut self, a: ElementIndex, b: ElementIndex) {
        if a == b || !self.graph.contains_node(a) || !self.graph.contains_node(b) {
            return;
        }
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Drop every link of `index`. Does nothing on an isolated element.
    pub fn disconnect_all(&mut self, index: ElementIndex) {
        let neighbors: Vec<ElementIndex> = self.graph.neighbors(index).collect();
        for neighbor in neighbors {
            while let Some(edge) = self.graph.find_edge(index, neighbor) {
                self.graph.remove_edge(edge);
            }
        }
    }

    /// Remove an element and all its links from the arena.
    pub fn remove(&mut self, index: ElementIndex) -> Option<Element> {
        self.graph.remove_node(index)
    }

    /// Short a bus phase to a ground.
    pub fn connect_ground(
        &mut self,
        ground: ElementIndex,
        bus: ElementIndex,
        phase: Phase,
    ) -> GridResult<()> {
        let bus_phases = match self.get(bus).and_then(Element::as_bus) {
            Some(b) => b.phases.clone(),
            None => return Err(self.wrong_category(bus, ElementCategory::Bus)),
        };
        if !bus_phases.contains(phase) {
            return Err(GridError::BadPhase(format!(
                "Phase '{phase}' is not present on the bus {}, available phases are '{bus_phases}'.",
                self.describe(bus)
            )));
        }
        if self.category(ground) != Some(ElementCategory::Ground) {
            return Err(self.wrong_category(ground, ElementCategory::Ground));
        }
        if let Some(ElementKind::Ground(g)) = self.graph.node_weight_mut(ground).map(|e| &mut e.kind) {
            g.connections.push(GroundConnection { bus, phase });
        }
        self.connect(ground, bus);
        Ok(())
    }

    /// Attach a short circuit to a bus, linking the bus to its ground if any.
    pub fn add_short_circuit(
        &mut self,
        bus: ElementIndex,
        short_circuit: ShortCircuit,
    ) -> GridResult<()> {
        let ground = short_circuit.ground;
        if let Some(ground) = ground {
            if self.category(ground) != Some(ElementCategory::Ground) {
                return Err(self.wrong_category(ground, ElementCategory::Ground));
            }
        }
        let bus_phases = match self.get(bus).and_then(Element::as_bus) {
            Some(b) => b.phases.clone(),
            None => return Err(self.wrong_category(bus, ElementCategory::Bus)),
        };
        if let Some(missing) = short_circuit
            .phases
            .iter()
            .find(|p| !bus_phases.contains(**p))
        {
            return Err(GridError::BadPhase(format!(
                "Phase '{missing}' of the short circuit is not present on the bus {}, available phases are '{bus_phases}'.",
                self.describe(bus)
            )));
        }
        if let Some(ElementKind::Bus(b)) = self.graph.node_weight_mut(bus).map(|e| &mut e.kind) {
            b.short_circuits.push(short_circuit);
        }
        if let Some(ground) = ground {
            self.connect(bus, ground);
        }
        Ok(())
    }

    pub fn get(&self, index: ElementIndex) -> Option<&Element> {
        self.graph.node_weight(index)
    }

    pub(crate) fn get_mut(&mut self, index: ElementIndex) -> Option<&mut Element> {
        self.graph.node_weight_mut(index)
    }

    pub fn category(&self, index: ElementIndex) -> Option<ElementCategory> {
        self.get(index).map(Element::category)
    }

    pub fn contains(&self, index: ElementIndex) -> bool {
        self.graph.contains_node(index)
    }

    pub fn neighbors(&self, index: ElementIndex) -> impl Iterator<Item = ElementIndex> + '_ {
        self.graph.neighbors(index)
    }

    pub fn indices(&self) -> impl Iterator<Item = ElementIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Breadth-first reachability from `seed`.
    ///
    /// Elements matching `is_boundary` are part of the result but their own
    /// links are not followed (the seed is always expanded). The seed comes
    /// first, the rest in discovery order.
    pub fn reachable_from<F>(&self, seed: ElementIndex, is_boundary: F) -> Vec<ElementIndex>
    where
        F: Fn(&Element) -> bool,
    {
        if !self.contains(seed) {
            return Vec::new();
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut members = Vec::new();
        visited.insert(seed);
        queue.push_back(seed);
        while let Some(node) = queue.pop_front() {
            members.push(node);
            if node != seed && self.graph.node_weight(node).is_some_and(&is_boundary) {
                continue;
            }
            for neighbor in self.graph.neighbors(node) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members
    }

    /// Partition elements into galvanically connected groups.
    ///
    /// Transformers bound the groups: they belong to the group on each of their
    /// sides and never start one. Seeds are tried in the order given.
    pub fn galvanic_components<I>(&self, seeds: I) -> Vec<Vec<ElementIndex>>
    where
        I: IntoIterator<Item = ElementIndex>,
    {
        let mut assigned = HashSet::new();
        let mut components = Vec::new();
        for seed in seeds {
            let Some(element) = self.get(seed) else {
                continue;
            };
            if element.is_transformer() || assigned.contains(&seed) {
                continue;
            }
            let members = self.reachable_from(seed, Element::is_transformer);
            for &member in &members {
                if self.get(member).is_some_and(|e| !e.is_transformer()) {
                    assigned.insert(member);
                }
            }
            components.push(members);
        }
        components
    }

    /// `Bus 'b1'`, or the raw index for a dangling handle.
    pub fn describe(&self, index: ElementIndex) -> String {
        self.get(index)
            .map(Element::describe)
            .unwrap_or_else(|| format!("#{}", index.index()))
    }

    fn expect_category(
        &self,
        target: ElementIndex,
        allowed: &[ElementCategory],
        referrer: &Element,
    ) -> GridResult<()> {
        match self.get(target) {
            Some(e) if allowed.contains(&e.category()) => Ok(()),
            Some(e) => Err(GridError::UnknownElement(format!(
                "{} refers to {} which is not a {}.",
                referrer.describe(),
                e.describe(),
                allowed
                    .iter()
                    .map(ElementCategory::as_str)
                    .collect::<Vec<_>>()
                    .join(" or ")
            ))),
            None => Err(GridError::UnknownElement(format!(
                "{} refers to the element #{} which does not exist.",
                referrer.describe(),
                target.index()
            ))),
        }
    }

    fn check_consistency(&self, element: &Element) -> GridResult<()> {
        match &element.kind {
            ElementKind::Bus(bus) => {
                if let Some(potentials) = &bus.initial_potentials {
                    expect_size(element, "initial potentials", potentials.len(), bus.phases.len())?;
                }
            }
            ElementKind::Branch(branch) => {
                self.expect_phases_on(element, &branch.phases1, branch.bus1)?;
                self.expect_phases_on(element, &branch.phases2, branch.bus2)?;
                if let BranchKind::Line(line) = &branch.kind {
                    if !(line.length.is_finite() && line.length > 0.0) {
                        return Err(GridError::BadLength(format!(
                            "The length of {} must be strictly positive, got {}.",
                            element.describe(),
                            line.length
                        )));
                    }
                }
            }
            ElementKind::Load(load) => {
                self.expect_phases_on(element, &load.phases, load.bus)?;
                let what = match load.kind {
                    LoadKind::Power { .. } => "powers",
                    LoadKind::Current { .. } => "currents",
                    LoadKind::Impedance { .. } => "impedances",
                };
                let expected = load.phases.value_count();
                expect_size(element, what, load.kind.values().len(), expected)?;
                if let LoadKind::Power {
                    flexible_params: Some(params),
                    ..
                } = &load.kind
                {
                    expect_size(element, "flexible parameters", params.len(), expected)?;
                }
            }
            ElementKind::Source(source) => {
                self.expect_phases_on(element, &source.phases, source.bus)?;
                expect_size(
                    element,
                    "voltages",
                    source.voltages.len(),
                    source.phases.value_count(),
                )?;
            }
            ElementKind::Ground(_) | ElementKind::PotentialRef(_) => {}
        }
        Ok(())
    }

    fn expect_phases_on(
        &self,
        element: &Element,
        phases: &Phases,
        bus: ElementIndex,
    ) -> GridResult<()> {
        match self.get(bus).and_then(Element::as_bus) {
            Some(b) if phases.is_subset_of(&b.phases) => Ok(()),
            Some(b) => Err(GridError::BadPhase(format!(
                "Phases '{phases}' of {} are not all present on {}, available phases are '{}'.",
                element.describe(),
                self.describe(bus),
                b.phases
            ))),
            None => Err(self.wrong_category(bus, ElementCategory::Bus)),
        }
    }

    fn wrong_category(&self, index: ElementIndex, expected: ElementCategory) -> GridError {
        GridError::UnknownElement(format!(
            "The element {} is not a {expected}.",
            self.describe(index)
        ))
    }
}

fn expect_size(element: &Element, what: &str, found: usize, expected: usize) -> GridResult<()> {
    if found == expected {
        return Ok(());
    }
    Err(GridError::BadSize(format!(
        "Incorrect number of {what} for {}: {found} instead of {expected}.",
        element.describe()
    )))
}

/// Degree and size figures of an element graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    pub element_count: usize,
    pub link_count: usize,
    pub galvanic_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
}

pub fn graph_stats(graph: &ElementGraph) -> GraphStats {
    let degrees: Vec<usize> = graph
        .indices()
        .map(|node| graph.neighbors(node).count())
        .collect();
    let element_count = degrees.len();
    let avg_degree = if element_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / element_count as f64
    };
    GraphStats {
        element_count,
        link_count: graph.link_count(),
        galvanic_components: graph.galvanic_components(graph.indices()).len(),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        avg_degree,
        max_degree: degrees.iter().copied().max().unwrap_or(0),
    }
}

/// Export the element graph; `graphviz` and `dot` are the known formats.
pub fn export_graph(graph: &ElementGraph, format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(graph)),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(graph: &ElementGraph) -> String {
    let mut buffer = String::new();
    buffer.push_str("graph gridnet {\n");
    for node in graph.indices() {
        let Some(element) = graph.get(node) else {
            continue;
        };
        let shape = match element.category() {
            ElementCategory::Bus => "box",
            ElementCategory::Branch => "diamond",
            ElementCategory::Ground | ElementCategory::PotentialRef => "triangle",
            ElementCategory::Load | ElementCategory::Source => "ellipse",
        };
        buffer.push_str(&format!(
            "  n{} [label=\"{}\", shape={shape}];\n",
            node.index(),
            sanitize_label(&element.describe())
        ));
    }
    for edge in graph.graph.edge_indices() {
        if let Some((a, b)) = graph.graph.edge_endpoints(edge) {
            buffer.push_str(&format!("  n{} -- n{};\n", a.index(), b.index()));
        }
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}
