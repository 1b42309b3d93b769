//! Network elements.
//!
//! Elements live in an [`crate::ElementGraph`] arena and refer to each other
//! through [`ElementIndex`] handles, never by ownership. The "touches"
//! relation between them is the arena's edge set.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FlexibleParameter, LineParameters, Phase, Phases, TransformerParameters};

/// Stable handle of an element inside its arena.
pub type ElementIndex = petgraph::stable_graph::NodeIndex;

/// Element identifier, unique within its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    Int(i64),
    Str(String),
}

impl ElementId {
    /// The id without quoting, for building derived names.
    pub fn label(&self) -> String {
        match self {
            ElementId::Int(n) => n.to_string(),
            ElementId::Str(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementId::Int(n) => write!(f, "{n}"),
            ElementId::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        ElementId::Str(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        ElementId::Str(s)
    }
}

impl From<i64> for ElementId {
    fn from(n: i64) -> Self {
        ElementId::Int(n)
    }
}

impl From<i32> for ElementId {
    fn from(n: i32) -> Self {
        ElementId::Int(n.into())
    }
}

/// Identity of a [`crate::Network`]; stamped on every element it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkHandle(u64);

static NEXT_NETWORK_HANDLE: AtomicU64 = AtomicU64::new(1);

impl NetworkHandle {
    pub(crate) fn next() -> Self {
        NetworkHandle(NEXT_NETWORK_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The six element collections a network is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Bus,
    Branch,
    Load,
    Source,
    Ground,
    PotentialRef,
}

impl ElementCategory {
    pub const ALL: [ElementCategory; 6] = [
        ElementCategory::Bus,
        ElementCategory::Branch,
        ElementCategory::Load,
        ElementCategory::Source,
        ElementCategory::Ground,
        ElementCategory::PotentialRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementCategory::Bus => "bus",
            ElementCategory::Branch => "branch",
            ElementCategory::Load => "load",
            ElementCategory::Source => "source",
            ElementCategory::Ground => "ground",
            ElementCategory::PotentialRef => "potential ref",
        }
    }
}

impl std::fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bolted fault on some phases of a bus, optionally to a ground.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuit {
    pub phases: Vec<Phase>,
    pub ground: Option<ElementIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub phases: Phases,
    /// GeoJSON geometry, carried as is
    pub geometry: Option<Value>,
    /// Phase-to-phase nominal voltage (V)
    pub nominal_voltage: Option<f64>,
    /// Lower voltage bound as a ratio of the nominal voltage
    pub min_voltage_level: Option<f64>,
    /// Upper voltage bound as a ratio of the nominal voltage
    pub max_voltage_level: Option<f64>,
    pub initial_potentials: Option<Vec<Complex64>>,
    pub short_circuits: Vec<ShortCircuit>,
}

impl Bus {
    pub fn new(phases: Phases) -> Self {
        Self {
            phases,
            geometry: None,
            nominal_voltage: None,
            min_voltage_level: None,
            max_voltage_level: None,
            initial_potentials: None,
            short_circuits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub parameters: Arc<LineParameters>,
    /// Length (km), strictly positive
    pub length: f64,
    /// Return path of the shunt admittance
    pub ground: Option<ElementIndex>,
    pub max_loading: f64,
}

impl Line {
    pub fn new(parameters: Arc<LineParameters>, length: f64) -> Self {
        Self {
            parameters,
            length,
            ground: None,
            max_loading: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub parameters: Arc<TransformerParameters>,
    pub tap: f64,
    pub max_loading: f64,
}

impl Transformer {
    pub fn new(parameters: Arc<TransformerParameters>) -> Self {
        Self {
            parameters,
            tap: 1.0,
            max_loading: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub closed: bool,
}

impl Default for Switch {
    fn default() -> Self {
        Self { closed: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchKind {
    Line(Line),
    Transformer(Transformer),
    Switch(Switch),
}

impl BranchKind {
    /// Discriminator used in documents.
    pub fn tag(&self) -> &'static str {
        match self {
            BranchKind::Line(_) => "line",
            BranchKind::Transformer(_) => "transformer",
            BranchKind::Switch(_) => "switch",
        }
    }
}

/// An edge-like element joining two buses.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub bus1: ElementIndex,
    pub bus2: ElementIndex,
    pub phases1: Phases,
    /// Differs from `phases1` only for transformers
    pub phases2: Phases,
    pub geometry: Option<Value>,
    pub kind: BranchKind,
}

impl Branch {
    pub fn line(bus1: ElementIndex, bus2: ElementIndex, phases: Phases, line: Line) -> Self {
        Self {
            bus1,
            bus2,
            phases1: phases.clone(),
            phases2: phases,
            geometry: None,
            kind: BranchKind::Line(line),
        }
    }

    pub fn transformer(
        bus1: ElementIndex,
        bus2: ElementIndex,
        phases1: Phases,
        phases2: Phases,
        transformer: Transformer,
    ) -> Self {
        Self {
            bus1,
            bus2,
            phases1,
            phases2,
            geometry: None,
            kind: BranchKind::Transformer(transformer),
        }
    }

    pub fn switch(bus1: ElementIndex, bus2: ElementIndex, phases: Phases) -> Self {
        Self {
            bus1,
            bus2,
            phases1: phases.clone(),
            phases2: phases,
            geometry: None,
            kind: BranchKind::Switch(Switch::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadKind {
    Power {
        powers: Vec<Complex64>,
        flexible_params: Option<Vec<FlexibleParameter>>,
    },
    Current {
        currents: Vec<Complex64>,
    },
    Impedance {
        impedances: Vec<Complex64>,
    },
}

impl LoadKind {
    /// Discriminator used in documents.
    pub fn tag(&self) -> &'static str {
        match self {
            LoadKind::Power { .. } => "power",
            LoadKind::Current { .. } => "current",
            LoadKind::Impedance { .. } => "impedance",
        }
    }

    pub fn values(&self) -> &[Complex64] {
        match self {
            LoadKind::Power { powers, .. } => powers,
            LoadKind::Current { currents } => currents,
            LoadKind::Impedance { impedances } => impedances,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub bus: ElementIndex,
    pub phases: Phases,
    pub kind: LoadKind,
}

impl Load {
    pub fn power(bus: ElementIndex, phases: Phases, powers: Vec<Complex64>) -> Self {
        Self {
            bus,
            phases,
            kind: LoadKind::Power {
                powers,
                flexible_params: None,
            },
        }
    }

    pub fn current(bus: ElementIndex, phases: Phases, currents: Vec<Complex64>) -> Self {
        Self {
            bus,
            phases,
            kind: LoadKind::Current { currents },
        }
    }

    pub fn impedance(bus: ElementIndex, phases: Phases, impedances: Vec<Complex64>) -> Self {
        Self {
            bus,
            phases,
            kind: LoadKind::Impedance { impedances },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoltageSource {
    pub bus: ElementIndex,
    pub phases: Phases,
    pub voltages: Vec<Complex64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundConnection {
    pub bus: ElementIndex,
    pub phase: Phase,
}

/// Common zero-potential node shared by the bus phases it is connected to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ground {
    pub connections: Vec<GroundConnection>,
}

/// Pins the potential of a bus or a ground.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialRef {
    pub element: ElementIndex,
    pub phases: Option<Vec<Phase>>,
}

impl PotentialRef {
    pub fn new(element: ElementIndex) -> Self {
        Self {
            element,
            phases: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Bus(Bus),
    Branch(Branch),
    Load(Load),
    Source(VoltageSource),
    Ground(Ground),
    PotentialRef(PotentialRef),
}

/// Load flow results attached to an element after a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementResults {
    Bus {
        potentials: Vec<Complex64>,
    },
    Branch {
        currents1: Vec<Complex64>,
        currents2: Vec<Complex64>,
        potentials1: Vec<Complex64>,
        potentials2: Vec<Complex64>,
    },
    Load {
        currents: Vec<Complex64>,
        potentials: Vec<Complex64>,
        /// Actual powers of flexible loads after control
        powers: Option<Vec<Complex64>>,
    },
    Source {
        currents: Vec<Complex64>,
        potentials: Vec<Complex64>,
    },
    Ground {
        potential: Complex64,
    },
    PotentialRef {
        current: Complex64,
    },
}

/// A node of the element arena.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub results: Option<ElementResults>,
    owner: Option<NetworkHandle>,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            results: None,
            owner: None,
        }
    }

    pub fn bus(id: impl Into<ElementId>, bus: Bus) -> Self {
        Self::new(id, ElementKind::Bus(bus))
    }

    pub fn branch(id: impl Into<ElementId>, branch: Branch) -> Self {
        Self::new(id, ElementKind::Branch(branch))
    }

    pub fn load(id: impl Into<ElementId>, load: Load) -> Self {
        Self::new(id, ElementKind::Load(load))
    }

    pub fn source(
        id: impl Into<ElementId>,
        bus: ElementIndex,
        phases: Phases,
        voltages: Vec<Complex64>,
    ) -> Self {
        Self::new(
            id,
            ElementKind::Source(VoltageSource {
                bus,
                phases,
                voltages,
            }),
        )
    }

    pub fn ground(id: impl Into<ElementId>) -> Self {
        Self::new(id, ElementKind::Ground(Ground::default()))
    }

    pub fn potential_ref(id: impl Into<ElementId>, element: ElementIndex) -> Self {
        Self::new(id, ElementKind::PotentialRef(PotentialRef::new(element)))
    }

    pub fn category(&self) -> ElementCategory {
        match &self.kind {
            ElementKind::Bus(_) => ElementCategory::Bus,
            ElementKind::Branch(_) => ElementCategory::Branch,
            ElementKind::Load(_) => ElementCategory::Load,
            ElementKind::Source(_) => ElementCategory::Source,
            ElementKind::Ground(_) => ElementCategory::Ground,
            ElementKind::PotentialRef(_) => ElementCategory::PotentialRef,
        }
    }

    /// Concrete type name used in messages.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::Bus(_) => "Bus",
            ElementKind::Branch(b) => match b.kind {
                BranchKind::Line(_) => "Line",
                BranchKind::Transformer(_) => "Transformer",
                BranchKind::Switch(_) => "Switch",
            },
            ElementKind::Load(l) => match l.kind {
                LoadKind::Power { .. } => "PowerLoad",
                LoadKind::Current { .. } => "CurrentLoad",
                LoadKind::Impedance { .. } => "ImpedanceLoad",
            },
            ElementKind::Source(_) => "VoltageSource",
            ElementKind::Ground(_) => "Ground",
            ElementKind::PotentialRef(_) => "PotentialRef",
        }
    }

    /// `Bus 'b1'` style label.
    pub fn describe(&self) -> String {
        format!("{} {}", self.type_name(), self.id)
    }

    pub fn owner(&self) -> Option<NetworkHandle> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NetworkHandle>) {
        self.owner = owner;
    }

    /// Transformers galvanically isolate their two sides.
    pub fn is_transformer(&self) -> bool {
        matches!(
            &self.kind,
            ElementKind::Branch(Branch {
                kind: BranchKind::Transformer(_),
                ..
            })
        )
    }

    /// Elements this one points to, with the category each must have.
    pub fn references(&self) -> Vec<(ElementIndex, &'static [ElementCategory])> {
        const BUS: &[ElementCategory] = &[ElementCategory::Bus];
        const GROUND: &[ElementCategory] = &[ElementCategory::Ground];
        const BUS_OR_GROUND: &[ElementCategory] = &[ElementCategory::Bus, ElementCategory::Ground];
        match &self.kind {
            ElementKind::Bus(bus) => bus
                .short_circuits
                .iter()
                .filter_map(|sc| sc.ground.map(|g| (g, GROUND)))
                .collect(),
            ElementKind::Branch(branch) => {
                let mut refs = vec![(branch.bus1, BUS), (branch.bus2, BUS)];
                if let BranchKind::Line(Line {
                    ground: Some(g), ..
                }) = &branch.kind
                {
                    refs.push((*g, GROUND));
                }
                refs
            }
            ElementKind::Load(load) => vec![(load.bus, BUS)],
            ElementKind::Source(source) => vec![(source.bus, BUS)],
            ElementKind::Ground(ground) => ground.connections.iter().map(|c| (c.bus, BUS)).collect(),
            ElementKind::PotentialRef(pref) => vec![(pref.element, BUS_OR_GROUND)],
        }
    }

    pub fn as_bus(&self) -> Option<&Bus> {
        match &self.kind {
            ElementKind::Bus(bus) => Some(bus),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match &self.kind {
            ElementKind::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn as_load(&self) -> Option<&Load> {
        match &self.kind {
            ElementKind::Load(load) => Some(load),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&VoltageSource> {
        match &self.kind {
            ElementKind::Source(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_ground(&self) -> Option<&Ground> {
        match &self.kind {
            ElementKind::Ground(ground) => Some(ground),
            _ => None,
        }
    }

    pub fn as_potential_ref(&self) -> Option<&PotentialRef> {
        match &self.kind {
            ElementKind::PotentialRef(pref) => Some(pref),
            _ => None,
        }
    }
}
