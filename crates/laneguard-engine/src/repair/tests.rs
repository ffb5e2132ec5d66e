use super::*;
use crate::catalog::RuleCatalog;
use crate::verifier::MapVerifier;
use approx::assert_relative_eq;
use laneguard_network::{
    CycleElement, ElementId, ElementKind, IncomingGroup, Intersection, Lanelet, NetworkDocument,
    Point, StopLine, TrafficLight, TrafficLightPhase, TrafficSign, TrafficSignElement,
};

fn straight(id: ElementId, x0: f64) -> Lanelet {
    Lanelet::new(
        id,
        vec![Point::new(x0, 1.0), Point::new(x0 + 10.0, 1.0)],
        vec![Point::new(x0, -1.0), Point::new(x0 + 10.0, -1.0)],
    )
}

fn violations_of(network: &RoadNetwork, id: FormulaId) -> Violations {
    let catalog = RuleCatalog::standard().expect("catalog");
    MapVerifier::new(&catalog)
        .with_parallelism(false)
        .verify(network, &[id])
}

/// Verify `id`, repair what was found, and check the rule holds afterwards
/// and that a second repair changes nothing.
fn repair_until_clean(network: &mut RoadNetwork, id: FormulaId) -> RepairReport {
    let violations = violations_of(network, id);
    assert!(!violations.is_empty(), "{id} should be violated before repair");
    let report = MapRepairer::new(network).repair_map(&violations);
    assert!(
        violations_of(network, id).is_empty(),
        "{id} should hold after repair"
    );

    let snapshot = network.to_document();
    let again = MapRepairer::new(network).repair_map(&violations);
    assert!(again.is_noop(), "repeating the {id} repair must be a no-op");
    assert_eq!(network.to_document(), snapshot);
    report
}

#[test]
fn duplicate_lanelet_ids_keep_the_first_element() {
    let mut n = RoadNetwork::new();
    let first = n.add_lanelet(straight(5, 0.0));
    let second = n.add_lanelet(straight(5, 10.0));
    n.add_traffic_sign(TrafficSign::new(5, vec![TrafficSignElement::new("206", vec![])]));

    repair_until_clean(&mut n, FormulaId::UniqueIdLa);
    assert_eq!(n.lanelet(first).map(|l| l.id), Some(5));
    let renamed = n.lanelet(second).map(|l| l.id).expect("still present");
    assert!(renamed > 5);
    assert_eq!(n.refs_with_id(5).len(), 1);
    assert!(violations_of(&n, FormulaId::UniqueIdTs).is_empty());
}

#[test]
fn duplicates_of_the_largest_id_take_unused_ids() {
    let mut n = RoadNetwork::new();
    let first = n.add_lanelet(straight(ElementId::MAX, 0.0));
    let second = n.add_lanelet(straight(ElementId::MAX, 10.0));
    n.add_lanelet(straight(0, 20.0));

    repair_until_clean(&mut n, FormulaId::UniqueIdLa);
    assert_eq!(n.lanelet(first).map(|l| l.id), Some(ElementId::MAX));
    assert_eq!(n.lanelet(second).map(|l| l.id), Some(1));
}

#[test]
fn boundaries_are_resampled_to_a_common_size() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.left_vertices = vec![Point::new(0.0, 1.0), Point::new(5.0, 1.0), Point::new(10.0, 1.0)];
    let key = n.add_lanelet(l);
    repair_until_clean(&mut n, FormulaId::SameVerticesSize);
    let l = n.lanelet(key).unwrap();
    assert_eq!(l.right_vertices.len(), 3);
    assert_eq!(l.center_vertices.len(), 3);
    assert_relative_eq!(l.right_vertices[1].x, 5.0);
    assert_relative_eq!(l.center_vertices[1].y, 0.0);
}

#[test]
fn degenerate_lanelets_are_removed_and_references_scrubbed() {
    let mut n = RoadNetwork::new();
    let mut bad = straight(1, 0.0);
    bad.left_vertices.truncate(1);
    let bad = n.add_lanelet(bad);
    let good = n.add_lanelet(straight(2, 10.0));
    n.link_lanelets(bad, good);

    repair_until_clean(&mut n, FormulaId::VerticesMoreThanOne);
    assert!(n.lanelet(bad).is_none());
    assert!(n.lanelet(good).unwrap().predecessors.is_empty());
}

#[test]
fn reversed_right_boundaries_are_flipped() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.right_vertices.reverse();
    let key = n.add_lanelet(l);
    repair_until_clean(&mut n, FormulaId::PolylinesSameDirection);
    assert_eq!(n.lanelet(key).unwrap().right_vertices[0], Point::new(0.0, -1.0));
}

#[test]
fn self_intersections_are_cut_one_loop_per_repair() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.left_vertices = vec![
        Point::new(0.0, 0.0),
        Point::new(4.0, 0.0),
        Point::new(4.0, 2.0),
        Point::new(2.0, 2.0),
        Point::new(2.0, -2.0),
        Point::new(6.0, -2.0),
    ];
    n.add_lanelet(l);
    repair_until_clean(&mut n, FormulaId::LeftSelfIntersection);
}

#[test]
fn dangling_links_and_references_are_dropped() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.successors.insert(42);
    l.predecessors.insert(43);
    l.adjacent_left = Some(laneguard_network::Adjacency {
        id: 44,
        same_direction: true,
    });
    l.traffic_signs.insert(99);
    l.traffic_lights.insert(98);
    l.stop_line = Some(StopLine {
        start: Point::new(10.0, 1.0),
        end: Point::new(10.0, -1.0),
        traffic_sign_refs: [97].into(),
        traffic_light_refs: [96].into(),
    });
    let key = n.add_lanelet(l);

    for id in [
        FormulaId::ExistenceSuccessor,
        FormulaId::ExistencePredecessor,
        FormulaId::ExistenceLeftAdj,
        FormulaId::ExistenceTrafficSigns,
        FormulaId::ExistenceTrafficLights,
        FormulaId::ExistenceStopLineTrafficSigns,
        FormulaId::ExistenceStopLineTrafficLights,
    ] {
        repair_until_clean(&mut n, id);
    }
    let l = n.lanelet(key).unwrap();
    assert!(l.successors.is_empty() && l.predecessors.is_empty());
    assert!(l.adjacent_left.is_none());
    assert!(l.traffic_signs.is_empty() && l.traffic_lights.is_empty());
    let stop = l.stop_line.as_ref().unwrap();
    assert!(stop.traffic_sign_refs.is_empty() && stop.traffic_light_refs.is_empty());
}

#[test]
fn external_references_are_left_alone() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.successors.insert(42);
    n.add_lanelet(l);
    n.external_mut().lanelets.insert(42);
    assert!(violations_of(&n, FormulaId::ExistenceSuccessor).is_empty());
    let forced = Violations::from([(FormulaId::ExistenceSuccessor, vec![Location::from([1])])]);
    assert!(MapRepairer::new(&mut n).repair_map(&forced).is_noop());
}

#[test]
fn one_sided_links_are_completed() {
    let mut n = RoadNetwork::new();
    let a = n.add_lanelet(straight(1, 0.0));
    let b = n.add_lanelet(straight(2, 10.0));
    n.lanelet_mut(b).unwrap().predecessors.insert(1);
    repair_until_clean(&mut n, FormulaId::ConnectionsPredecessor);
    assert!(n.lanelet(a).unwrap().successors.contains(&2));

    let c = n.add_lanelet(straight(3, 20.0));
    n.lanelet_mut(b).unwrap().successors.insert(3);
    repair_until_clean(&mut n, FormulaId::ConnectionsSuccessor);
    assert!(n.lanelet(c).unwrap().predecessors.contains(&2));
}

#[test]
fn two_way_links_keep_the_successor_edge() {
    let mut n = RoadNetwork::new();
    let a = n.add_lanelet(straight(1, 0.0));
    let b = n.add_lanelet(straight(2, 10.0));
    n.link_lanelets(a, b);
    n.link_lanelets(b, a);
    repair_until_clean(&mut n, FormulaId::NonPredecessorAsSuccessor);
    let la = n.lanelet(a).unwrap();
    let lb = n.lanelet(b).unwrap();
    assert!(la.successors.contains(&2) && !la.predecessors.contains(&2));
    assert!(lb.predecessors.contains(&1) && !lb.successors.contains(&1));
    assert!(violations_of(&n, FormulaId::ConnectionsSuccessor).is_empty());
    assert!(violations_of(&n, FormulaId::ConnectionsPredecessor).is_empty());
}

#[test]
fn stop_line_signs_are_referenced_by_the_lanelet() {
    let mut n = RoadNetwork::new();
    let mut l = straight(1, 0.0);
    l.stop_line = Some(StopLine {
        start: Point::new(10.0, 1.0),
        end: Point::new(10.0, -1.0),
        traffic_sign_refs: [7].into(),
        traffic_light_refs: Default::default(),
    });
    let key = n.add_lanelet(l);
    n.add_traffic_sign(TrafficSign::new(7, vec![TrafficSignElement::new("206", vec![])]));
    repair_until_clean(&mut n, FormulaId::IncludedStopLineTrafficSigns);
    assert!(n.lanelet(key).unwrap().traffic_signs.contains(&7));
}

#[test]
fn sign_repairs() {
    let mut n = RoadNetwork::new();
    let lanelet = n.add_lanelet(straight(1, 0.0));
    n.add_traffic_sign(TrafficSign::new(10, Vec::new()));
    let mut near = TrafficSign::new(11, vec![TrafficSignElement::new("206", vec![])]);
    near.position = Some(Point::new(5.0, 4.0));
    n.add_traffic_sign(near);
    let mut far = TrafficSign::new(12, vec![TrafficSignElement::new("206", vec![])]);
    far.position = Some(Point::new(500.0, 0.0));
    let far = n.add_traffic_sign(far);
    n.lanelet_mut(lanelet).unwrap().traffic_signs.insert(10);

    repair_until_clean(&mut n, FormulaId::AtLeastOneTrafficSignElement);
    assert!(n.traffic_signs_with_id(10).is_empty());

    repair_until_clean(&mut n, FormulaId::ReferencedTrafficSign);
    assert!(n.lanelet(lanelet).unwrap().traffic_signs.contains(&11));
    assert!(n.traffic_sign(far).is_none());
}

#[test]
fn sign_value_repairs() {
    let mut n = RoadNetwork::new();
    let key = n.add_traffic_sign(TrafficSign::new(
        20,
        vec![
            TrafficSignElement::new("265", vec![]),
            TrafficSignElement::new("206", vec![]),
            TrafficSignElement::new("274", vec![-30.0, 50.0]),
            TrafficSignElement::new("R2-1", vec![0.0]),
        ],
    ));
    repair_until_clean(&mut n, FormulaId::ValidAdditionalValueSpeedSign);
    repair_until_clean(&mut n, FormulaId::GivenAdditionalValue);
    let codes: Vec<&str> = n
        .traffic_sign(key)
        .unwrap()
        .elements
        .iter()
        .map(|e| e.code.as_str())
        .collect();
    assert_eq!(codes, vec!["206", "274"]);
    assert_eq!(n.traffic_sign(key).unwrap().elements[1].additional_values, vec![50.0]);
}

#[test]
fn light_repairs() {
    let mut n = RoadNetwork::new();
    let empty = n.add_traffic_light(TrafficLight::new(30, Vec::new()));
    let messy = n.add_traffic_light(TrafficLight::new(
        31,
        vec![
            CycleElement::new(TrafficLightPhase::Red, 20),
            CycleElement::new(TrafficLightPhase::Green, 0),
            CycleElement::new(TrafficLightPhase::Green, 20),
            CycleElement::new(TrafficLightPhase::Red, 5),
        ],
    ));

    repair_until_clean(&mut n, FormulaId::AtLeastOneCycleElement);
    assert_eq!(n.traffic_light(empty).unwrap().cycle, default_cycle());

    repair_until_clean(&mut n, FormulaId::NonZeroDuration);
    repair_until_clean(&mut n, FormulaId::UniqueStateInCycle);
    let phases: Vec<TrafficLightPhase> =
        n.traffic_light(messy).unwrap().cycle.iter().map(|c| c.phase).collect();
    assert_eq!(phases, vec![TrafficLightPhase::Red, TrafficLightPhase::Green]);
}

#[test]
fn orphaned_lights_without_position_are_removed() {
    let mut n = RoadNetwork::new();
    n.add_lanelet(straight(1, 0.0));
    let light = n.add_traffic_light(TrafficLight::new(40, vec![]));
    repair_until_clean(&mut n, FormulaId::ReferencedTrafficLight);
    assert!(n.traffic_light(light).is_none());
}

fn group(incoming: &[ElementId], straight: &[ElementId]) -> IncomingGroup {
    IncomingGroup {
        incoming_lanelets: incoming.iter().copied().collect(),
        successors_straight: straight.iter().copied().collect(),
        ..IncomingGroup::default()
    }
}

#[test]
fn intersection_repairs() {
    let doc = NetworkDocument {
        lanelets: vec![straight(1, 0.0), straight(2, 10.0), straight(3, 20.0)],
        ..NetworkDocument::default()
    };
    let mut n = RoadNetwork::from_document(doc);
    let a = n.lanelets_with_id(1)[0];
    let b = n.lanelets_with_id(2)[0];
    n.link_lanelets(a, b);

    let mut crossing = Intersection::new(
        60,
        vec![group(&[1, 77], &[2, 78]), group(&[79], &[3]), group(&[1], &[])],
    );
    crossing.crossings.extend([3, 80]);
    let key = n.add_intersection(crossing);
    n.add_intersection(Intersection::new(61, vec![group(&[1], &[2])]));

    repair_until_clean(&mut n, FormulaId::ExistenceIncomingLanelets);
    repair_until_clean(&mut n, FormulaId::ExistenceSuccessorLanelets);
    repair_until_clean(&mut n, FormulaId::AtLeastOneRoadConnection);
    repair_until_clean(&mut n, FormulaId::ExistenceCrossings);
    repair_until_clean(&mut n, FormulaId::AtLeastTwoIncomingElements);

    let i = n.intersection(key).unwrap();
    assert_eq!(i.incomings, vec![group(&[1], &[2]), group(&[1], &[2])]);
    assert_eq!(i.crossings.iter().copied().collect::<Vec<_>>(), vec![3]);
    assert!(n.intersections_with_id(61).is_empty());
    assert_eq!(n.count(ElementKind::Intersection), 1);
}
