//! Integration tests for network construction, mutation and validation.

use std::sync::Arc;

use gridnet_core::*;
use indexmap::IndexMap;
use num_complex::Complex64;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

struct Fixture {
    graph: ElementGraph,
    source_bus: ElementIndex,
    load_bus: ElementIndex,
    switch: ElementIndex,
    source: ElementIndex,
    load: ElementIndex,
    ground: ElementIndex,
    pref: ElementIndex,
}

impl Fixture {
    /// source bus -- switch -- load bus, neutral grounded at the source.
    fn new() -> Self {
        let mut graph = ElementGraph::new();
        let source_bus = graph
            .insert(Element::bus("sb", Bus::new(Phases::abcn())))
            .unwrap();
        let load_bus = graph
            .insert(Element::bus("lb", Bus::new(Phases::abcn())))
            .unwrap();
        let switch = graph
            .insert(Element::branch(
                "sw",
                Branch::switch(source_bus, load_bus, Phases::abcn()),
            ))
            .unwrap();
        let source = graph
            .insert(Element::source(
                "src",
                source_bus,
                Phases::abcn(),
                vec![c(230.0, 0.0), c(-115.0, -199.2), c(-115.0, 199.2)],
            ))
            .unwrap();
        let load = graph
            .insert(Element::load(
                "load",
                Load::power(load_bus, Phases::abcn(), vec![c(1000.0, 300.0); 3]),
            ))
            .unwrap();
        let ground = graph.insert(Element::ground("gnd")).unwrap();
        graph.connect_ground(ground, source_bus, Phase::N).unwrap();
        let pref = graph
            .insert(Element::potential_ref("pref", ground))
            .unwrap();
        Self {
            graph,
            source_bus,
            load_bus,
            switch,
            source,
            load,
            ground,
            pref,
        }
    }

    fn collections(&self) -> ElementCollections {
        ElementCollections {
            buses: vec![self.source_bus, self.load_bus].into(),
            branches: vec![self.switch].into(),
            loads: vec![self.load].into(),
            sources: vec![self.source].into(),
            grounds: vec![self.ground].into(),
            potential_refs: vec![self.pref].into(),
        }
    }

    fn build(self) -> GridResult<Network> {
        let collections = self.collections();
        Network::from_collections(self.graph, collections)
    }
}

fn transformer_parameters() -> Arc<TransformerParameters> {
    Arc::new(TransformerParameters {
        id: "160kVA".into(),
        vg: "Dyn11".to_string(),
        sn: 160e3,
        up: 20e3,
        us: 400.0,
        i0: 0.023,
        p0: 460.0,
        psc: 2350.0,
        vsc: 0.04,
    })
}

#[test]
fn test_valid_network_is_owned_and_counted() {
    let network = Fixture::new().build().unwrap();
    assert!(network.is_valid());
    for category in ElementCategory::ALL {
        for element in network.elements(category) {
            assert_eq!(element.owner(), Some(network.handle()));
        }
    }
    let stats = network.stats();
    assert_eq!(stats.buses, 2);
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.galvanic_components, 1);
    assert_eq!(
        network
            .get(ElementCategory::Load, &"load".into())
            .unwrap()
            .type_name(),
        "PowerLoad"
    );
}

#[test]
fn test_id_keyed_collections_are_accepted() {
    let fixture = Fixture::new();
    let mut collections = fixture.collections();
    let mut buses = IndexMap::new();
    buses.insert(ElementId::from("sb"), fixture.source_bus);
    buses.insert(ElementId::from("lb"), fixture.load_bus);
    collections.buses = buses.into();
    let network = Network::from_collections(fixture.graph, collections).unwrap();
    let ids: Vec<_> = network
        .elements(ElementCategory::Bus)
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(ids, vec![ElementId::from("sb"), ElementId::from("lb")]);
}

#[test]
fn test_mismatched_key_is_rejected() {
    let fixture = Fixture::new();
    let mut collections = fixture.collections();
    let mut buses = IndexMap::new();
    buses.insert(ElementId::from("sb"), fixture.source_bus);
    buses.insert(ElementId::from("other"), fixture.load_bus);
    collections.buses = buses.into();
    let err = Network::from_collections(fixture.graph, collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadElementId);
}

#[test]
fn test_duplicate_and_misplaced_elements_are_rejected() {
    let mut fixture = Fixture::new();
    let twin = fixture
        .graph
        .insert(Element::bus("lb", Bus::new(Phases::abc())))
        .unwrap();
    let mut collections = fixture.collections();
    collections.buses = vec![fixture.source_bus, fixture.load_bus, twin].into();
    let err = Network::from_collections(fixture.graph.clone(), collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateId);

    let mut collections = fixture.collections();
    collections.loads = vec![fixture.load, fixture.source_bus].into();
    let err = Network::from_collections(fixture.graph, collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
    assert!(err.to_string().contains("Bus 'sb'"));
}

#[test]
fn test_undeclared_neighbor_fails_and_stray_element_is_dropped() {
    let mut fixture = Fixture::new();
    fixture.graph.insert(Element::ground("unused")).unwrap();
    let mut collections = fixture.collections();
    collections.loads = ElementCollection::default();
    let err = Network::from_collections(fixture.graph.clone(), collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
    assert!(err.to_string().contains("PowerLoad 'load'"));
    assert!(err.to_string().contains("constructor"));

    let network = fixture.build().unwrap();
    assert_eq!(network.graph().len(), 7);
    assert_eq!(network.len(ElementCategory::Ground), 1);
}

#[test]
fn test_network_without_source_fails() {
    let mut fixture = Fixture::new();
    fixture.graph.remove(fixture.source);
    let mut collections = fixture.collections();
    collections.sources = ElementCollection::default();
    let err = Network::from_collections(fixture.graph, collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoVoltageSource);
}

#[test]
fn test_transformer_isolates_components() {
    let mut fixture = Fixture::new();
    let lv_bus = fixture
        .graph
        .insert(Element::bus("lv", Bus::new(Phases::abcn())))
        .unwrap();
    let transformer = fixture
        .graph
        .insert(Element::branch(
            "tr",
            Branch::transformer(
                fixture.load_bus,
                lv_bus,
                Phases::abc(),
                Phases::abcn(),
                Transformer::new(transformer_parameters()),
            ),
        ))
        .unwrap();
    let mut collections = fixture.collections();
    collections.buses = vec![fixture.source_bus, fixture.load_bus, lv_bus].into();
    collections.branches = vec![fixture.switch, transformer].into();
    let err = Network::from_collections(fixture.graph.clone(), collections.clone()).unwrap_err();
    match err {
        GridError::NoPotentialReference { element } => assert_eq!(element, "Bus 'lv'"),
        other => panic!("unexpected error {other:?}"),
    }

    let lv_pref = fixture
        .graph
        .insert(Element::potential_ref("lv_pref", lv_bus))
        .unwrap();
    collections.potential_refs = vec![fixture.pref, lv_pref].into();
    let network = Network::from_collections(fixture.graph, collections).unwrap();
    let components = network.components();
    assert_eq!(components.len(), 2);
    assert!(components.iter().all(|c| c.potential_refs == 1));
    assert!(components
        .iter()
        .all(|c| c.elements.contains(&"Transformer 'tr'".to_string())));
}

#[test]
fn test_removing_the_only_connector_splits_the_references() {
    let mut network = Fixture::new().build().unwrap();
    let removed = network
        .remove_element(ElementCategory::Branch, &"sw".into())
        .unwrap_err();
    assert_eq!(removed.kind(), ErrorKind::NoPotentialReference);
    assert!(!network.is_valid());
    assert!(network.find(ElementCategory::Branch, &"sw".into()).is_none());

    let load_bus = network.find(ElementCategory::Bus, &"lb".into()).unwrap();
    network
        .add_element(Element::potential_ref("pref_lb", load_bus))
        .unwrap();
    assert!(network.is_valid());

    let source_bus = network.find(ElementCategory::Bus, &"sb".into()).unwrap();
    let err = network
        .add_element(Element::branch(
            "sw2",
            Branch::switch(source_bus, load_bus, Phases::abcn()),
        ))
        .unwrap_err();
    match err {
        GridError::SeveralPotentialReferences { count, .. } => assert_eq!(count, 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!network.is_valid());
}

#[test]
fn test_elements_in_use_cannot_be_removed() {
    let mut network = Fixture::new().build().unwrap();
    let err = network
        .remove_element(ElementCategory::Bus, &"lb".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ElementInUse);
    assert!(err.to_string().contains("PowerLoad 'load'"));
    assert!(network.is_valid());

    let load = network
        .remove_element(ElementCategory::Load, &"load".into())
        .unwrap();
    assert!(load.owner().is_none());
    assert!(network.is_valid());

    let err = network
        .remove_element(ElementCategory::Load, &"load".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
}

#[test]
fn test_add_element_rejects_duplicates_and_foreign_elements() {
    let mut network = Fixture::new().build().unwrap();
    let load_bus = network.find(ElementCategory::Bus, &"lb".into()).unwrap();
    let err = network
        .add_element(Element::load(
            "load",
            Load::current(load_bus, Phases::abcn(), vec![c(1.0, 0.0); 3]),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateId);
    assert!(network.is_valid());

    let other = Fixture::new().build().unwrap();
    let foreign = other
        .get(ElementCategory::Load, &"load".into())
        .unwrap()
        .clone();
    let err = network.add_element(foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MultipleNetworks);
}

#[test]
fn test_cloned_arena_cannot_back_a_second_network() {
    let fixture = Fixture::new();
    let collections = fixture.collections();
    let first = Network::from_collections(fixture.graph, collections.clone()).unwrap();
    let err = Network::from_collections(first.graph().clone(), collections).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MultipleNetworks);
}

#[test]
fn test_element_outside_the_network_must_be_added_first() {
    let mut network = Fixture::new().build().unwrap();
    let extra_ground = network
        .graph_mut()
        .insert(Element::ground("gnd2"))
        .unwrap();
    assert!(!network.is_valid());
    let err = network
        .add_element(Element::potential_ref("pref2", extra_ground))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
    assert!(err.to_string().contains("add_element"));
}

#[test]
fn test_from_element_collects_everything_reachable() {
    let fixture = Fixture::new();
    let seed = fixture.load;
    let network = Network::from_element(fixture.graph, seed).unwrap();
    assert_eq!(network.len(ElementCategory::Bus), 2);
    assert_eq!(network.len(ElementCategory::PotentialRef), 1);
    assert!(network.to_dot().contains("Ground 'gnd'"));
}

#[test]
fn test_results_are_cleared_by_mutations() {
    let mut network = Fixture::new().build().unwrap();
    for category in ElementCategory::ALL {
        let ids: Vec<_> = network.elements(category).map(|e| e.id.clone()).collect();
        for id in ids {
            let results = match category {
                ElementCategory::Bus => ElementResults::Bus {
                    potentials: vec![c(230.0, 0.0); 4],
                },
                ElementCategory::Branch => ElementResults::Branch {
                    currents1: vec![],
                    currents2: vec![],
                    potentials1: vec![],
                    potentials2: vec![],
                },
                ElementCategory::Load => ElementResults::Load {
                    currents: vec![],
                    potentials: vec![],
                    powers: None,
                },
                ElementCategory::Source => ElementResults::Source {
                    currents: vec![],
                    potentials: vec![],
                },
                ElementCategory::Ground => ElementResults::Ground {
                    potential: c(0.0, 0.0),
                },
                ElementCategory::PotentialRef => ElementResults::PotentialRef {
                    current: c(0.0, 0.0),
                },
            };
            network.set_results(category, &id, results).unwrap();
        }
    }
    assert!(network.has_results());

    network
        .remove_element(ElementCategory::Load, &"load".into())
        .unwrap();
    assert!(!network.has_results());
    assert!(network
        .elements(ElementCategory::Bus)
        .all(|e| e.results.is_none()));

    let err = network
        .set_results(
            ElementCategory::Bus,
            &"missing".into(),
            ElementResults::Bus { potentials: vec![] },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
}
