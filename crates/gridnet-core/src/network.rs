//! The network facade.
//!
//! A [`Network`] owns an [`ElementGraph`] and the per-category membership of
//! its elements. It is usable only once [`crate::validator::check`] passes;
//! every later mutation reruns the check and flags the network invalid until
//! it passes again.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    graph_utils::{export_graph, graph_stats, GraphStats},
    validator, Element, ElementCategory, ElementGraph, ElementId, ElementIndex, ElementResults,
    GridError, GridResult, NetworkHandle,
};

/// Elements of one category, as a plain list or keyed by id.
#[derive(Debug, Clone)]
pub enum ElementCollection {
    List(Vec<ElementIndex>),
    Map(IndexMap<ElementId, ElementIndex>),
}

impl Default for ElementCollection {
    fn default() -> Self {
        ElementCollection::List(Vec::new())
    }
}

impl From<Vec<ElementIndex>> for ElementCollection {
    fn from(list: Vec<ElementIndex>) -> Self {
        ElementCollection::List(list)
    }
}

impl From<IndexMap<ElementId, ElementIndex>> for ElementCollection {
    fn from(map: IndexMap<ElementId, ElementIndex>) -> Self {
        ElementCollection::Map(map)
    }
}

/// The six declared collections a network is built from.
#[derive(Debug, Clone, Default)]
pub struct ElementCollections {
    pub buses: ElementCollection,
    pub branches: ElementCollection,
    pub loads: ElementCollection,
    pub sources: ElementCollection,
    pub grounds: ElementCollection,
    pub potential_refs: ElementCollection,
}

impl ElementCollections {
    fn into_categories(self) -> [(ElementCategory, ElementCollection); 6] {
        [
            (ElementCategory::Bus, self.buses),
            (ElementCategory::Branch, self.branches),
            (ElementCategory::Load, self.loads),
            (ElementCategory::Source, self.sources),
            (ElementCategory::Ground, self.grounds),
            (ElementCategory::PotentialRef, self.potential_refs),
        ]
    }
}

type Members = IndexMap<ElementCategory, IndexMap<ElementId, ElementIndex>>;

fn empty_members() -> Members {
    ElementCategory::ALL
        .iter()
        .map(|c| (*c, IndexMap::new()))
        .collect()
}

/// Element counts per category plus graph figures.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub buses: usize,
    pub branches: usize,
    pub loads: usize,
    pub sources: usize,
    pub grounds: usize,
    pub potential_refs: usize,
    pub links: usize,
    pub galvanic_components: usize,
    pub max_degree: usize,
}

/// One galvanically isolated part of the network.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub component_id: usize,
    /// Labels of the member elements, transformers on the border included
    pub elements: Vec<String>,
    pub potential_refs: usize,
}

#[derive(Debug)]
pub struct Network {
    handle: NetworkHandle,
    graph: ElementGraph,
    members: Members,
    valid: bool,
}

impl Network {
    /// Build a network from declared collections.
    ///
    /// Arena elements that are neither declared nor touched by a declared
    /// element are dropped. Touched but undeclared elements make the build fail.
    pub fn from_collections(
        graph: ElementGraph,
        collections: ElementCollections,
    ) -> GridResult<Self> {
        let mut members = empty_members();
        for (category, collection) in collections.into_categories() {
            let entries: Vec<(Option<ElementId>, ElementIndex)> = match collection {
                ElementCollection::List(list) => list.into_iter().map(|i| (None, i)).collect(),
                ElementCollection::Map(map) => {
                    map.into_iter().map(|(k, i)| (Some(k), i)).collect()
                }
            };
            for (key, index) in entries {
                let element = graph.get(index).ok_or_else(|| {
                    GridError::UnknownElement(format!(
                        "The element #{} listed among the {category} elements does not exist.",
                        index.index()
                    ))
                })?;
                if element.category() != category {
                    return Err(GridError::UnknownElement(format!(
                        "{} was listed among the {category} elements.",
                        element.describe()
                    )));
                }
                if let Some(key) = key {
                    if key != element.id {
                        return Err(GridError::BadElementId(format!(
                            "{} was stored under the key {key}, the key must be the element id.",
                            element.describe()
                        )));
                    }
                }
                insert_member(&mut members, category, element.id.clone(), index)?;
            }
        }
        Self::build(graph, members)
    }

    /// Build a network from every element reachable from `seed`.
    pub fn from_element(graph: ElementGraph, seed: ElementIndex) -> GridResult<Self> {
        if !graph.contains(seed) {
            return Err(GridError::UnknownElement(format!(
                "The seed element #{} does not exist.",
                seed.index()
            )));
        }
        let mut members = empty_members();
        for index in graph.reachable_from(seed, |_| false) {
            if let Some(element) = graph.get(index) {
                insert_member(&mut members, element.category(), element.id.clone(), index)?;
            }
        }
        Self::build(graph, members)
    }

    fn build(mut graph: ElementGraph, members: Members) -> GridResult<Self> {
        let declared: HashSet<ElementIndex> = members
            .values()
            .flat_map(|m| m.values().copied())
            .collect();
        let stray: Vec<ElementIndex> = graph
            .indices()
            .filter(|i| !declared.contains(i))
            .filter(|i| !graph.neighbors(*i).any(|n| declared.contains(&n)))
            .collect();
        if !stray.is_empty() {
            debug!(count = stray.len(), "dropping undeclared elements");
        }
        for index in stray {
            graph.remove(index);
        }
        let mut network = Network {
            handle: NetworkHandle::next(),
            graph,
            members,
            valid: false,
        };
        let members = network.member_indices();
        validator::check(&mut network.graph, &members, network.handle, false)?;
        network.valid = true;
        info!(
            handle = network.handle.value(),
            elements = members.len(),
            "network built"
        );
        Ok(network)
    }

    pub fn handle(&self) -> NetworkHandle {
        self.handle
    }

    /// Whether the last validation pass succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn graph(&self) -> &ElementGraph {
        &self.graph
    }

    /// Direct access to the arena. Any use invalidates the network and its
    /// results until [`Network::check`] passes again.
    pub fn graph_mut(&mut self) -> &mut ElementGraph {
        self.mark_changed();
        &mut self.graph
    }

    pub fn element(&self, index: ElementIndex) -> Option<&Element> {
        self.graph.get(index)
    }

    pub fn find(&self, category: ElementCategory, id: &ElementId) -> Option<ElementIndex> {
        self.members.get(&category).and_then(|m| m.get(id)).copied()
    }

    pub fn get(&self, category: ElementCategory, id: &ElementId) -> Option<&Element> {
        self.find(category, id).and_then(|i| self.graph.get(i))
    }

    /// Member indices of one category in insertion order.
    pub fn indices(&self, category: ElementCategory) -> impl Iterator<Item = ElementIndex> + '_ {
        self.members
            .get(&category)
            .into_iter()
            .flat_map(|m| m.values().copied())
    }

    pub fn elements(&self, category: ElementCategory) -> impl Iterator<Item = &Element> + '_ {
        self.indices(category).filter_map(|i| self.graph.get(i))
    }

    pub fn len(&self, category: ElementCategory) -> usize {
        self.members.get(&category).map_or(0, IndexMap::len)
    }

    fn member_indices(&self) -> Vec<ElementIndex> {
        self.members
            .values()
            .flat_map(|m| m.values().copied())
            .collect()
    }

    /// Rerun the full validation.
    pub fn check(&mut self) -> GridResult<()> {
        let members = self.member_indices();
        let result = validator::check(&mut self.graph, &members, self.handle, true);
        self.valid = result.is_ok();
        result
    }

    /// Insert a new element into the network and revalidate.
    ///
    /// The element is kept even if validation fails; the network then stays
    /// invalid until it is fixed.
    pub fn add_element(&mut self, element: Element) -> GridResult<ElementIndex> {
        if element.owner().is_some_and(|owner| owner != self.handle) {
            return Err(GridError::MultipleNetworks(format!(
                "{} is already assigned to another network.",
                element.describe()
            )));
        }
        let category = element.category();
        if self.find(category, &element.id).is_some() {
            return Err(duplicate_id(category, &element.id));
        }
        let id = element.id.clone();
        let index = self.graph.insert(element)?;
        insert_member(&mut self.members, category, id, index)?;
        self.mark_changed();
        debug!(element = %self.graph.describe(index), "element added");
        self.check()?;
        Ok(index)
    }

    /// Take an element out of the network and revalidate.
    ///
    /// Elements still referenced by others (a bus with a load, a ground used by
    /// a line) cannot be removed.
    pub fn remove_element(
        &mut self,
        category: ElementCategory,
        id: &ElementId,
    ) -> GridResult<Element> {
        let index = self.find(category, id).ok_or_else(|| {
            GridError::UnknownElement(format!("There is no {category} with the id {id} in the network."))
        })?;
        let users: Vec<String> = self
            .graph
            .neighbors(index)
            .filter(|&n| {
                self.graph
                    .get(n)
                    .is_some_and(|e| e.references().iter().any(|(r, _)| *r == index))
            })
            .map(|n| self.graph.describe(n))
            .collect();
        if !users.is_empty() {
            return Err(GridError::ElementInUse(format!(
                "{} is still used by {}; remove them first.",
                self.graph.describe(index),
                users.join(", ")
            )));
        }
        self.graph.disconnect_all(index);
        let mut element = self.graph.remove(index).ok_or_else(|| {
            GridError::UnknownElement(format!("There is no {category} with the id {id} in the network."))
        })?;
        if let Some(m) = self.members.get_mut(&category) {
            m.shift_remove(id);
        }
        element.set_owner(None);
        element.results = None;
        self.mark_changed();
        debug!(element = %element.describe(), "element removed");
        self.check()?;
        Ok(element)
    }

    fn mark_changed(&mut self) {
        self.valid = false;
        self.clear_results();
    }

    /// Attach solver results to an element.
    pub fn set_results(
        &mut self,
        category: ElementCategory,
        id: &ElementId,
        results: ElementResults,
    ) -> GridResult<()> {
        let index = self.find(category, id).ok_or_else(|| {
            GridError::UnknownElement(format!(
                "The results refer to the {category} {id} which is not in the network."
            ))
        })?;
        if let Some(element) = self.graph.get_mut(index) {
            element.results = Some(results);
        }
        Ok(())
    }

    pub fn clear_results(&mut self) {
        let indices = self.member_indices();
        for index in indices {
            if let Some(element) = self.graph.get_mut(index) {
                element.results = None;
            }
        }
    }

    /// Whether every member element carries results.
    pub fn has_results(&self) -> bool {
        let indices = self.member_indices();
        !indices.is_empty()
            && indices
                .iter()
                .all(|&i| self.graph.get(i).is_some_and(|e| e.results.is_some()))
    }

    pub fn stats(&self) -> NetworkStats {
        let GraphStats {
            link_count,
            max_degree,
            ..
        } = graph_stats(&self.graph);
        NetworkStats {
            buses: self.len(ElementCategory::Bus),
            branches: self.len(ElementCategory::Branch),
            loads: self.len(ElementCategory::Load),
            sources: self.len(ElementCategory::Source),
            grounds: self.len(ElementCategory::Ground),
            potential_refs: self.len(ElementCategory::PotentialRef),
            links: link_count,
            galvanic_components: self.components().len(),
            max_degree,
        }
    }

    /// Galvanic components, in the order their first member was declared.
    pub fn components(&self) -> Vec<ComponentSummary> {
        self.graph
            .galvanic_components(self.member_indices())
            .into_iter()
            .enumerate()
            .map(|(component_id, members)| ComponentSummary {
                component_id,
                potential_refs: members
                    .iter()
                    .filter(|&&m| self.graph.category(m) == Some(ElementCategory::PotentialRef))
                    .count(),
                elements: members.iter().map(|&m| self.graph.describe(m)).collect(),
            })
            .collect()
    }

    /// Graphviz rendering of the element graph.
    pub fn to_dot(&self) -> String {
        export_graph(&self.graph, "dot").unwrap_or_default()
    }
}

fn insert_member(
    members: &mut Members,
    category: ElementCategory,
    id: ElementId,
    index: ElementIndex,
) -> GridResult<()> {
    let by_id = members.entry(category).or_default();
    if by_id.contains_key(&id) {
        return Err(duplicate_id(category, &id));
    }
    by_id.insert(id, index);
    Ok(())
}

fn duplicate_id(category: ElementCategory, id: &ElementId) -> GridError {
    GridError::DuplicateId(format!(
        "There is already a {category} with the id {id} in the network."
    ))
}
