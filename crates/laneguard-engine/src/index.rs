//! Per-run snapshot of a network's domains and ids.

use ahash::AHashMap;
use laneguard_dsl::Domain;
use laneguard_network::{ElementId, ElementKind, ElementRef, RoadNetwork};
use std::collections::BTreeSet;

/// Domain lists and an id lookup, built once per verification call.
///
/// The network must not change while an index built from it is in use.
#[derive(Debug, Default)]
pub struct NetworkIndex {
    lanelets: Vec<ElementRef>,
    traffic_signs: Vec<ElementRef>,
    traffic_lights: Vec<ElementRef>,
    intersections: Vec<ElementRef>,
    all: Vec<ElementRef>,
    by_id: AHashMap<ElementId, Vec<ElementRef>>,
}

impl NetworkIndex {
    pub fn build(network: &RoadNetwork) -> Self {
        let mut index = NetworkIndex {
            lanelets: network.refs(ElementKind::Lanelet),
            traffic_signs: network.refs(ElementKind::TrafficSign),
            traffic_lights: network.refs(ElementKind::TrafficLight),
            intersections: network.refs(ElementKind::Intersection),
            ..NetworkIndex::default()
        };
        index.all = index
            .lanelets
            .iter()
            .chain(&index.traffic_signs)
            .chain(&index.traffic_lights)
            .chain(&index.intersections)
            .copied()
            .collect();
        for r in &index.all {
            if let Some(id) = network.id_of(*r) {
                index.by_id.entry(id).or_default().push(*r);
            }
        }
        index
    }

    /// Elements of a named domain in iteration order.
    pub fn domain(&self, domain: Domain) -> &[ElementRef] {
        match domain {
            Domain::Lanelets => &self.lanelets,
            Domain::TrafficSigns => &self.traffic_signs,
            Domain::TrafficLights => &self.traffic_lights,
            Domain::Intersections => &self.intersections,
            Domain::All => &self.all,
        }
    }

    pub fn refs_with_id(&self, id: ElementId) -> &[ElementRef] {
        self.by_id.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids carried by more than one element, in ascending order.
    pub fn shared_ids(&self) -> BTreeSet<ElementId> {
        self.by_id
            .iter()
            .filter(|(_, refs)| refs.len() > 1)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn has_local(&self, kind: ElementKind, id: ElementId) -> bool {
        self.refs_with_id(id).iter().any(|r| r.kind == kind)
    }

    /// True when `id` names an element of `kind` inside the network or
    /// among its external references.
    pub fn resolves(&self, network: &RoadNetwork, kind: ElementKind, id: ElementId) -> bool {
        self.has_local(kind, id) || network.external().contains(kind, id)
    }
}
