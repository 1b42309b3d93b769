//! # gridnet-core: Distribution Network Model
//!
//! Typed elements of a multiphase distribution network and the validation gate
//! that decides whether a network can be handed to a load flow solver.
//!
//! ## Design
//!
//! Elements live in an arena ([`ElementGraph`], a petgraph `StableUnGraph`):
//! - **Nodes**: buses, branches (lines, transformers, switches), loads,
//!   voltage sources, grounds and potential references
//! - **Edges**: the "touches" relation (a branch touches its two buses, a load
//!   its bus, a ground the buses it shorts, a potential reference its target)
//!
//! Elements point at each other through [`ElementIndex`] handles, so cycles such
//! as bus ↔ branch ↔ bus never involve ownership.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridnet_core::*;
//! use num_complex::Complex64;
//!
//! let mut graph = ElementGraph::new();
//! let source_bus = graph.insert(Element::bus("sb", Bus::new(Phases::abcn())))?;
//! let load_bus = graph.insert(Element::bus("lb", Bus::new(Phases::abcn())))?;
//! let switch = graph.insert(Element::branch(
//!     "sw",
//!     Branch::switch(source_bus, load_bus, Phases::abcn()),
//! ))?;
//! let source = graph.insert(Element::source(
//!     "src",
//!     source_bus,
//!     Phases::abcn(),
//!     vec![Complex64::new(230.0, 0.0); 3],
//! ))?;
//! let ground = graph.insert(Element::ground("gnd"))?;
//! graph.connect_ground(ground, source_bus, Phase::N)?;
//! let pref = graph.insert(Element::potential_ref("pref", ground))?;
//!
//! let network = Network::from_collections(
//!     graph,
//!     ElementCollections {
//!         buses: vec![source_bus, load_bus].into(),
//!         branches: vec![switch].into(),
//!         sources: vec![source].into(),
//!         grounds: vec![ground].into(),
//!         potential_refs: vec![pref].into(),
//!         ..Default::default()
//!     },
//! )?;
//! assert!(network.is_valid());
//! # Ok::<(), GridError>(())
//! ```
//!
//! ## Modules
//!
//! - [`elements`] - Element kinds, identifiers and result blocks
//! - [`graph_utils`] - The arena, reachability and galvanic components
//! - [`validator`] - Closure, source and potential reference checks
//! - [`network`] - The network facade
//! - [`diagnostics`] - Non-fatal notices raised by conversions
//!
//! ## Integration with gridnet-io
//!
//! The gridnet-io crate reads and writes networks as versioned JSON documents
//! and migrates older document layouts to the current one.

pub mod diagnostics;
pub mod elements;
pub mod error;
pub mod flexible;
pub mod graph_utils;
pub mod network;
pub mod parameters;
pub mod phases;
pub mod validator;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use elements::{
    Branch, BranchKind, Bus, Element, ElementCategory, ElementId, ElementIndex, ElementKind,
    ElementResults, Ground, GroundConnection, Line, Load, LoadKind, NetworkHandle, PotentialRef,
    ShortCircuit, Switch, Transformer, VoltageSource,
};
pub use error::{ErrorKind, GridError, GridResult, ParameterCategory};
pub use flexible::{Control, FlexibleParameter, Projection, ProjectionType};
pub use graph_utils::{export_graph, graph_stats, ElementGraph, GraphStats};
pub use network::{ComponentSummary, ElementCollection, ElementCollections, Network, NetworkStats};
pub use parameters::{
    ComplexMatrix, LineParameters, LineType, TransformerParameters, VectorGroup, SLOT_COUNT,
};
pub use phases::{Phase, Phases, RECOGNIZED_PHASES};
