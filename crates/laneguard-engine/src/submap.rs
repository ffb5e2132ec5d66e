//! Localization: the neighbourhood of a violation that a repair may touch.

use ahash::AHashMap;
use laneguard_network::geometry::distance_to_polyline;
use laneguard_network::{
    ElementId, ElementKey, ElementKind, ElementRef, Lanelet, Point, RoadNetwork, Scope,
};
use std::collections::{BTreeSet, VecDeque};

use crate::partition::Block;

/// Largest distance at which an unreferenced sign or light is associated
/// with a lanelet, in metres.
pub const MAX_ATTACH_DISTANCE: f64 = 30.0;

/// Key of the lanelet closest to `position` within `max_distance`.
///
/// Ties go to the lanelet with the smaller key.
pub fn nearest_lanelet(
    network: &RoadNetwork,
    position: Point,
    max_distance: f64,
) -> Option<ElementKey> {
    network
        .lanelets()
        .filter_map(|(key, l)| lanelet_distance(l, position).map(|d| (key, d)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(key, _)| key)
}

fn lanelet_distance(lanelet: &Lanelet, p: Point) -> Option<f64> {
    [
        &lanelet.center_vertices,
        &lanelet.left_vertices,
        &lanelet.right_vertices,
    ]
    .into_iter()
    .filter_map(|poly| distance_to_polyline(p, poly))
    .min_by(f64::total_cmp)
}

/// Who points at what, by id.
#[derive(Debug, Default)]
struct LinkIndex {
    lanelets: AHashMap<ElementId, Vec<ElementKey>>,
    traffic_signs: AHashMap<ElementId, Vec<ElementKey>>,
    traffic_lights: AHashMap<ElementId, Vec<ElementKey>>,
    /// lanelet id -> lanelets linking to it
    lanelet_referrers: AHashMap<ElementId, Vec<ElementKey>>,
    /// sign id -> lanelets referencing it
    sign_referrers: AHashMap<ElementId, Vec<ElementKey>>,
    /// light id -> lanelets referencing it
    light_referrers: AHashMap<ElementId, Vec<ElementKey>>,
    /// lanelet id -> intersections referencing it
    intersections: AHashMap<ElementId, Vec<ElementKey>>,
}

impl LinkIndex {
    fn build(network: &RoadNetwork) -> Self {
        let mut index = LinkIndex::default();
        for (key, l) in network.lanelets() {
            index.lanelets.entry(l.id).or_default().push(key);
            for target in l.linked_lanelets() {
                index.lanelet_referrers.entry(target).or_default().push(key);
            }
            for sign in l.referenced_traffic_signs() {
                index.sign_referrers.entry(sign).or_default().push(key);
            }
            for light in l.referenced_traffic_lights() {
                index.light_referrers.entry(light).or_default().push(key);
            }
        }
        for (key, s) in network.traffic_signs() {
            index.traffic_signs.entry(s.id).or_default().push(key);
        }
        for (key, t) in network.traffic_lights() {
            index.traffic_lights.entry(t.id).or_default().push(key);
        }
        for (key, i) in network.intersections() {
            for lanelet in i.lanelets() {
                index.intersections.entry(lanelet).or_default().push(key);
            }
        }
        index
    }

    fn get(map: &AHashMap<ElementId, Vec<ElementKey>>, id: ElementId) -> &[ElementKey] {
        map.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A growing set of elements around one or more anchors.
pub struct SubMap<'n> {
    network: &'n RoadNetwork,
    radius: usize,
    links: LinkIndex,
    scope: Scope,
}

impl<'n> SubMap<'n> {
    /// `radius` is the number of lanelet hops walked from each anchor; zero
    /// is treated as one.
    pub fn new(network: &'n RoadNetwork, radius: usize) -> Self {
        Self {
            network,
            radius: radius.max(1),
            links: LinkIndex::build(network),
            scope: Scope::default(),
        }
    }

    /// Every element whose id is in one of the block's id sets.
    pub fn from_block(network: &'n RoadNetwork, block: &Block) -> Self {
        let mut submap = Self::new(network, 1);
        for (key, l) in network.lanelets() {
            if block.lanelets.contains(l.id) {
                submap.include(ElementKind::Lanelet, key);
            }
        }
        for (key, s) in network.traffic_signs() {
            if block.traffic_signs.contains(s.id) {
                submap.include(ElementKind::TrafficSign, key);
            }
        }
        for (key, t) in network.traffic_lights() {
            if block.traffic_lights.contains(t.id) {
                submap.include(ElementKind::TrafficLight, key);
            }
        }
        for (key, i) in network.intersections() {
            if block.intersections.contains(i.id) {
                submap.include(ElementKind::Intersection, key);
            }
        }
        submap
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn into_scope(self) -> Scope {
        self.scope
    }

    fn include(&mut self, kind: ElementKind, key: ElementKey) -> bool {
        self.scope.insert(ElementRef { kind, key })
    }

    /// Add the neighbourhood of every element carrying `id`.
    pub fn extract_from_element(&mut self, id: ElementId) -> &Scope {
        let network = self.network;
        let mut queue: VecDeque<(ElementKey, usize)> = VecDeque::new();

        for seed in network.refs_with_id(id) {
            self.include(seed.kind, seed.key);
            match seed.kind {
                ElementKind::Lanelet => queue.push_back((seed.key, 0)),
                ElementKind::TrafficSign => {
                    let position = network.traffic_sign(seed.key).and_then(|s| s.position);
                    let referrers = LinkIndex::get(&self.links.sign_referrers, id).to_vec();
                    self.seed_referrers(&referrers, position, &mut queue);
                }
                ElementKind::TrafficLight => {
                    let position = network.traffic_light(seed.key).and_then(|t| t.position);
                    let referrers = LinkIndex::get(&self.links.light_referrers, id).to_vec();
                    self.seed_referrers(&referrers, position, &mut queue);
                }
                ElementKind::Intersection => {
                    if let Some(i) = network.intersection(seed.key) {
                        for lanelet in i.lanelets() {
                            for key in LinkIndex::get(&self.links.lanelets, lanelet) {
                                queue.push_back((*key, 1));
                            }
                        }
                    }
                }
            }
        }

        self.walk(queue);
        &self.scope
    }

    pub fn extract_from_elements(&mut self, ids: impl IntoIterator<Item = ElementId>) -> &Scope {
        for id in ids {
            self.extract_from_element(id);
        }
        &self.scope
    }

    fn seed_referrers(
        &self,
        referrers: &[ElementKey],
        position: Option<Point>,
        queue: &mut VecDeque<(ElementKey, usize)>,
    ) {
        if referrers.is_empty() {
            if let Some(key) =
                position.and_then(|p| nearest_lanelet(self.network, p, MAX_ATTACH_DISTANCE))
            {
                queue.push_back((key, 1));
            }
            return;
        }
        for key in referrers {
            queue.push_back((*key, 1));
        }
    }

    /// Breadth-first over lanelet links, in both directions.
    fn walk(&mut self, mut queue: VecDeque<(ElementKey, usize)>) {
        let network = self.network;
        let mut expanded = BTreeSet::new();
        while let Some((key, depth)) = queue.pop_front() {
            let Some(lanelet) = network.lanelet(key) else {
                continue;
            };
            let first_visit = self.include(ElementKind::Lanelet, key);
            if !first_visit && expanded.contains(&key) {
                continue;
            }

            for sign in lanelet.referenced_traffic_signs() {
                for k in LinkIndex::get(&self.links.traffic_signs, sign).to_vec() {
                    self.include(ElementKind::TrafficSign, k);
                }
            }
            for light in lanelet.referenced_traffic_lights() {
                for k in LinkIndex::get(&self.links.traffic_lights, light).to_vec() {
                    self.include(ElementKind::TrafficLight, k);
                }
            }
            for k in LinkIndex::get(&self.links.intersections, lanelet.id).to_vec() {
                self.include(ElementKind::Intersection, k);
            }

            if depth >= self.radius {
                continue;
            }
            expanded.insert(key);
            let mut neighbours: Vec<ElementKey> = lanelet
                .linked_lanelets()
                .flat_map(|id| LinkIndex::get(&self.links.lanelets, id).iter().copied())
                .collect();
            neighbours.extend_from_slice(LinkIndex::get(&self.links.lanelet_referrers, lanelet.id));
            for n in neighbours {
                if !expanded.contains(&n) {
                    queue.push_back((n, depth + 1));
                }
            }
        }
    }

    /// Deep copy of the reached elements; everything else becomes external.
    pub fn create_subnetwork(&self) -> RoadNetwork {
        self.network.extract(&self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laneguard_network::{IncomingGroup, Intersection, TrafficSign, TrafficSignElement};

    fn lanelet(id: ElementId, x0: f64) -> Lanelet {
        Lanelet::new(
            id,
            vec![Point::new(x0, 1.0), Point::new(x0 + 10.0, 1.0)],
            vec![Point::new(x0, -1.0), Point::new(x0 + 10.0, -1.0)],
        )
    }

    /// 1 -> 2 -> 3 -> 4, sign 50 on lanelet 3.
    fn chain() -> RoadNetwork {
        let mut n = RoadNetwork::new();
        let keys: Vec<ElementKey> = (1..=4)
            .map(|id| n.add_lanelet(lanelet(id, id as f64 * 10.0)))
            .collect();
        for pair in keys.windows(2) {
            n.link_lanelets(pair[0], pair[1]);
        }
        if let Some(l) = n.lanelet_mut(keys[2]) {
            l.traffic_signs.insert(50);
        }
        n.add_traffic_sign(TrafficSign::new(50, vec![TrafficSignElement::new("206", vec![])]));
        n
    }

    fn lanelet_ids(network: &RoadNetwork, scope: &Scope) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = scope
            .lanelets
            .iter()
            .filter_map(|k| network.lanelet(*k).map(|l| l.id))
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn radius_bounds_the_walk() {
        let n = chain();
        let mut one = SubMap::new(&n, 1);
        one.extract_from_element(2);
        assert_eq!(lanelet_ids(&n, one.scope()), vec![1, 2, 3]);
        assert_eq!(one.scope().traffic_signs.len(), 1);

        let mut two = SubMap::new(&n, 2);
        two.extract_from_element(1);
        assert_eq!(lanelet_ids(&n, two.scope()), vec![1, 2, 3]);
        assert_eq!(SubMap::new(&n, 0).radius, 1);
    }

    #[test]
    fn signs_pull_in_their_referencing_lanelets() {
        let n = chain();
        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(50);
        assert_eq!(lanelet_ids(&n, sm.scope()), vec![3]);
    }

    #[test]
    fn unreferenced_signs_pull_in_the_nearest_lanelet() {
        let mut n = chain();
        let mut sign = TrafficSign::new(60, vec![TrafficSignElement::new("206", vec![])]);
        sign.position = Some(Point::new(42.0, 3.0));
        n.add_traffic_sign(sign);
        let mut far = TrafficSign::new(61, vec![]);
        far.position = Some(Point::new(500.0, 500.0));
        n.add_traffic_sign(far);

        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(60);
        assert_eq!(lanelet_ids(&n, sm.scope()), vec![4]);

        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(61);
        assert!(sm.scope().lanelets.is_empty());
        assert_eq!(sm.scope().len(), 1);
    }

    #[test]
    fn intersections_bring_their_lanelets_and_are_found_from_lanelets() {
        let mut n = chain();
        let mut group = IncomingGroup::default();
        group.incoming_lanelets.insert(1);
        group.successors_straight.insert(4);
        n.add_intersection(Intersection::new(70, vec![group]));

        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(70);
        assert_eq!(lanelet_ids(&n, sm.scope()), vec![1, 4]);

        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(2);
        assert_eq!(sm.scope().intersections.len(), 1);
    }

    #[test]
    fn subnetworks_treat_the_rest_as_external() {
        let n = chain();
        let mut sm = SubMap::new(&n, 1);
        sm.extract_from_element(1);
        let sub = sm.create_subnetwork();
        assert_eq!(sub.count(ElementKind::Lanelet), 2);
        assert!(sub.resolves(ElementKind::Lanelet, 3));
        assert!(sub.resolves(ElementKind::TrafficSign, 50));
        assert!(!sub.resolves(ElementKind::Lanelet, 9));
    }
}
