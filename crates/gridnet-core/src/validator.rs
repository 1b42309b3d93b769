//! Network validity gate.
//!
//! A network is solvable only when the declared elements form a closed set,
//! hold at least one voltage source and pin exactly one potential per
//! galvanically isolated component. The check is always run in full; a single
//! added or removed element can merge or split components.

use std::collections::HashSet;

use tracing::debug;

use crate::{ElementCategory, ElementGraph, ElementIndex, GridError, GridResult, NetworkHandle};

/// Run every check on `members`, then stamp them with `handle`.
///
/// `constructed` tells whether the network already exists (element added
/// afterwards) or is being built, which changes the remedy suggested when an
/// element touches something outside the network.
pub fn check(
    graph: &mut ElementGraph,
    members: &[ElementIndex],
    handle: NetworkHandle,
    constructed: bool,
) -> GridResult<()> {
    debug!(
        elements = members.len(),
        constructed, "validating network"
    );
    check_closure(graph, members, constructed)?;
    check_sources(graph, members)?;
    check_ref(graph, members)?;
    claim_ownership(graph, members, handle)
}

/// Every element touched by a member must itself be a member.
fn check_closure(
    graph: &ElementGraph,
    members: &[ElementIndex],
    constructed: bool,
) -> GridResult<()> {
    let known: HashSet<ElementIndex> = members.iter().copied().collect();
    for &member in members {
        for neighbor in graph.neighbors(member) {
            if known.contains(&neighbor) {
                continue;
            }
            let msg = if constructed {
                format!(
                    "{} is connected to {} which is not in the network. Add it with add_element first.",
                    graph.describe(member),
                    graph.describe(neighbor)
                )
            } else {
                format!(
                    "{} is connected to {} which was not passed to the network constructor.",
                    graph.describe(member),
                    graph.describe(neighbor)
                )
            };
            return Err(GridError::UnknownElement(msg));
        }
    }
    Ok(())
}

fn check_sources(graph: &ElementGraph, members: &[ElementIndex]) -> GridResult<()> {
    let has_source = members
        .iter()
        .any(|&m| graph.category(m) == Some(ElementCategory::Source));
    if has_source {
        Ok(())
    } else {
        Err(GridError::NoVoltageSource(
            "There is no voltage source provided in the network, you must provide at least one."
                .to_string(),
        ))
    }
}

/// Exactly one potential reference per galvanic component.
pub fn check_ref(graph: &ElementGraph, members: &[ElementIndex]) -> GridResult<()> {
    let components = graph.galvanic_components(members.iter().copied());
    debug!(components = components.len(), "checking potential references");
    for component in components {
        let count = component
            .iter()
            .filter(|&&e| graph.category(e) == Some(ElementCategory::PotentialRef))
            .count();
        let element = graph.describe(component[0]);
        match count {
            1 => {}
            0 => return Err(GridError::NoPotentialReference { element }),
            count => return Err(GridError::SeveralPotentialReferences { element, count }),
        }
    }
    Ok(())
}

/// Stamp `handle` on every member, refusing elements owned by another network.
///
/// All members are checked before any is stamped so a refused network leaves
/// ownership untouched.
fn claim_ownership(
    graph: &mut ElementGraph,
    members: &[ElementIndex],
    handle: NetworkHandle,
) -> GridResult<()> {
    for &member in members {
        if let Some(owner) = graph.get(member).and_then(|e| e.owner()) {
            if owner != handle {
                return Err(GridError::MultipleNetworks(format!(
                    "{} is already assigned to another network.",
                    graph.describe(member)
                )));
            }
        }
    }
    for &member in members {
        if let Some(element) = graph.get_mut(member) {
            element.set_owner(Some(handle));
        }
    }
    Ok(())
}
