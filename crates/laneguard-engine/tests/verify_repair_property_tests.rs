use laneguard_engine::{
    FormulaId, Location, MapRepairer, MapVerifier, NetworkIndex, RuleCatalog, SubMap,
};
use laneguard_network::{
    Adjacency, CycleElement, ElementId, IncomingGroup, Intersection, Lanelet, NetworkDocument,
    Point, RoadNetwork, TrafficLight, TrafficLightPhase, TrafficSign, TrafficSignElement,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const MAX_LANELET_ID: u32 = 10;
const MAX_LINK_ID: u32 = 14;

fn polyline(count: usize, x0: f64, y: f64) -> Vec<Point> {
    (0..count).map(|i| Point::new(x0 + i as f64 * 3.0, y)).collect()
}

fn lanelet_strategy() -> impl Strategy<Value = Lanelet> {
    (
        1u32..=MAX_LANELET_ID,
        1usize..=4,
        1usize..=4,
        any::<bool>(),
        prop::collection::btree_set(1u32..=MAX_LINK_ID, 0..3),
        prop::collection::btree_set(1u32..=MAX_LINK_ID, 0..3),
        prop::collection::btree_set(20u32..=24, 0..2),
        prop::option::of(1u32..=MAX_LINK_ID),
    )
        .prop_map(
            |(id, left, right, reversed, successors, predecessors, signs, adjacent)| {
                // Straight boundaries never cross themselves.
                let x0 = f64::from(id) * 20.0;
                let mut right_vertices = polyline(right, x0, -1.0);
                if reversed {
                    right_vertices.reverse();
                }
                let mut l = Lanelet::new(id, polyline(left, x0, 1.0), right_vertices);
                l.successors = successors;
                l.predecessors = predecessors;
                l.traffic_signs = signs;
                l.adjacent_left = adjacent.map(|id| Adjacency {
                    id,
                    same_direction: true,
                });
                l
            },
        )
}

fn sign_strategy() -> impl Strategy<Value = TrafficSign> {
    let element = (
        prop::sample::select(vec!["206", "274", "265", "R2-1"]),
        prop::collection::vec(prop::sample::select(vec![-5.0, 0.0, 30.0]), 0..3),
    );
    (
        20u32..=24,
        prop::collection::vec(element, 0..3),
        prop::option::of((0.0f64..250.0, -40.0f64..40.0)),
    )
        .prop_map(|(id, elements, position)| {
            let mut s = TrafficSign::new(
                id,
                elements
                    .into_iter()
                    .map(|(code, values)| TrafficSignElement::new(code, values))
                    .collect(),
            );
            s.position = position.map(|(x, y)| Point::new(x, y));
            s
        })
}

fn light_strategy() -> impl Strategy<Value = TrafficLight> {
    let phase = prop::sample::select(vec![
        TrafficLightPhase::Red,
        TrafficLightPhase::RedYellow,
        TrafficLightPhase::Green,
        TrafficLightPhase::Yellow,
    ]);
    (
        30u32..=32,
        prop::collection::vec((phase, 0u32..3), 0..4),
        prop::option::of((0.0f64..250.0, -40.0f64..40.0)),
    )
        .prop_map(|(id, cycle, position)| {
            let mut t = TrafficLight::new(
                id,
                cycle
                    .into_iter()
                    .map(|(phase, duration)| CycleElement::new(phase, duration))
                    .collect(),
            );
            t.position = position.map(|(x, y)| Point::new(x, y));
            t
        })
}

fn intersection_strategy() -> impl Strategy<Value = Intersection> {
    let group = (
        prop::collection::btree_set(1u32..=MAX_LINK_ID, 0..3),
        prop::collection::btree_set(1u32..=MAX_LINK_ID, 0..3),
    )
        .prop_map(|(incoming_lanelets, successors_straight)| IncomingGroup {
            incoming_lanelets,
            successors_straight,
            ..IncomingGroup::default()
        });
    (
        40u32..=41,
        prop::collection::vec(group, 0..3),
        prop::collection::btree_set(1u32..=MAX_LINK_ID, 0..2),
    )
        .prop_map(|(id, incomings, crossings)| {
            let mut i = Intersection::new(id, incomings);
            i.crossings = crossings;
            i
        })
}

fn network_strategy() -> impl Strategy<Value = RoadNetwork> {
    (
        prop::collection::vec(lanelet_strategy(), 0..8),
        prop::collection::vec(sign_strategy(), 0..4),
        prop::collection::vec(light_strategy(), 0..3),
        prop::collection::vec(intersection_strategy(), 0..2),
    )
        .prop_map(|(lanelets, traffic_signs, traffic_lights, intersections)| {
            RoadNetwork::from_document(NetworkDocument {
                lanelets,
                traffic_signs,
                traffic_lights,
                intersections,
            })
        })
}

/// Every failing binding of `id`, found by brute force over the outer
/// domains and reported by ids.
fn failing_locations(
    catalog: &RuleCatalog,
    network: &RoadNetwork,
    id: FormulaId,
) -> BTreeSet<Location> {
    let entry = catalog.entry(id).expect("standard catalog holds every formula");
    let index = NetworkIndex::build(network);
    let domains: Vec<_> = entry
        .formula
        .bindings
        .iter()
        .map(|(_, domain)| index.domain(*domain).to_vec())
        .collect();

    let mut bindings = vec![Vec::new()];
    for domain in &domains {
        bindings = bindings
            .into_iter()
            .flat_map(|prefix| {
                domain.iter().map(move |r| {
                    let mut next = prefix.clone();
                    next.push(*r);
                    next
                })
            })
            .collect();
    }

    bindings
        .into_iter()
        .filter(|b| !matches!(catalog.evaluate(id, network, b), Ok(true)))
        .map(|b| Location(b.iter().filter_map(|r| network.id_of(*r)).collect()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn reported_locations_are_exactly_the_failing_bindings(network in network_strategy()) {
        let catalog = RuleCatalog::standard().unwrap();
        let verifier = MapVerifier::new(&catalog).with_parallelism(false);
        for id in FormulaId::ALL {
            let reported: BTreeSet<Location> = verifier
                .verify(&network, &[*id])
                .remove(id)
                .unwrap_or_default()
                .into_iter()
                .collect();
            prop_assert_eq!(&reported, &failing_locations(&catalog, &network, *id), "{}", id);
        }
    }

    #[test]
    fn dangling_successors_are_reported_at_their_lanelet(network in network_strategy()) {
        let catalog = RuleCatalog::standard().unwrap();
        let lanelet_ids: BTreeSet<ElementId> = network.lanelets().map(|(_, l)| l.id).collect();
        let expected: BTreeSet<Location> = network
            .lanelets()
            .filter(|(_, l)| l.successors.iter().any(|s| !lanelet_ids.contains(s)))
            .map(|(_, l)| Location::from([l.id]))
            .collect();
        let reported: BTreeSet<Location> = MapVerifier::new(&catalog)
            .verify(&network, &[FormulaId::ExistenceSuccessor])
            .remove(&FormulaId::ExistenceSuccessor)
            .unwrap_or_default()
            .into_iter()
            .collect();
        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn repairing_twice_equals_repairing_once(network in network_strategy()) {
        let catalog = RuleCatalog::standard().unwrap();
        let verifier = MapVerifier::new(&catalog).with_parallelism(false);
        for id in FormulaId::ALL {
            let violations = verifier.verify(&network, &[*id]);
            let mut repaired = network.deep_copy();
            MapRepairer::new(&mut repaired).repair_map(&violations);
            let once = repaired.to_document();

            let again = MapRepairer::new(&mut repaired).repair_map(&violations);
            prop_assert!(again.is_noop(), "{}", id);
            prop_assert_eq!(&repaired.to_document(), &once, "{}", id);
        }
    }

    #[test]
    fn repairs_stay_inside_the_localized_scope(network in network_strategy()) {
        let catalog = RuleCatalog::standard().unwrap();
        let violations = MapVerifier::new(&catalog)
            .with_parallelism(false)
            .verify(&network, FormulaId::ALL);
        for (formula, locations) in &violations {
            for location in locations {
                let mut submap = SubMap::new(&network, 1);
                submap.extract_from_elements(location.0.iter().copied());
                let scope = submap.into_scope();

                let mut repaired = network.deep_copy();
                MapRepairer::new(&mut repaired).repair(*formula, location);
                for r in network.all_refs() {
                    if !scope.contains(r) {
                        prop_assert_eq!(
                            repaired.element(r),
                            network.element(r),
                            "{} at {}",
                            formula,
                            location
                        );
                    }
                }
            }
        }
    }
}
