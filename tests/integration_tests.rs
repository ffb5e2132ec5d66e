//! End-to-end tests across the workspace crates:
//! - network documents (JSON) → verification → repair → documents
//! - catalog sources parse with the formula DSL
//!
//! Run with: cargo test --test integration_tests

use laneguard_engine::{
    FormulaId, InvalidState, Location, MapVerification, RuleCatalog, VerificationConfig,
};
use laneguard_network::{ElementKind, Lanelet, NetworkDocument, Point, RoadNetwork};

fn straight(id: u32, x0: f64) -> Lanelet {
    Lanelet::new(
        id,
        vec![Point::new(x0, 1.0), Point::new(x0 + 10.0, 1.0)],
        vec![Point::new(x0, -1.0), Point::new(x0 + 10.0, -1.0)],
    )
}

fn engine(config: VerificationConfig) -> MapVerification {
    MapVerification::new(config.with_parallelism(false)).expect("valid config")
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_catalog_sources_parse_with_the_dsl() {
    let catalog = RuleCatalog::standard().expect("standard catalog");
    for entry in catalog.entries() {
        laneguard_dsl::parse_formula(entry.source)
            .unwrap_or_else(|e| panic!("{} does not parse: {e}", entry.id));
    }
    assert_eq!(catalog.entries().count(), FormulaId::ALL.len());
}

// ============================================================================
// Verify / repair scenarios
// ============================================================================

#[test]
fn test_duplicate_lanelet_ids_are_reported_once_and_renamed() {
    let mut network = RoadNetwork::new();
    network.add_lanelet(straight(5, 0.0));
    network.add_lanelet(straight(5, 10.0));

    let engine = engine(VerificationConfig::default());
    let result = engine.verify(&network);
    assert_eq!(
        result.initial_violations,
        vec![InvalidState {
            formula: FormulaId::UniqueIdLa,
            location: Location::from([5]),
        }]
    );

    let outcome = engine.verify_and_repair(&mut network);
    assert!(outcome.result.repairing_possible);
    let fives = network.lanelets().filter(|(_, l)| l.id == 5).count();
    assert_eq!(fives, 1);
    assert_eq!(network.count(ElementKind::Lanelet), 2);
    assert!(engine.verify(&network).is_valid());
}

#[test]
fn test_missing_sign_reference_from_json_is_removed() {
    let json = r#"{
        "lanelets": [{
            "id": 1,
            "left_vertices": [{"x": 0.0, "y": 1.0}, {"x": 10.0, "y": 1.0}],
            "right_vertices": [{"x": 0.0, "y": -1.0}, {"x": 10.0, "y": -1.0}],
            "traffic_signs": [99]
        }]
    }"#;
    let doc: NetworkDocument = serde_json::from_str(json).expect("valid document");
    let mut network = RoadNetwork::from_document(doc);

    let engine = engine(VerificationConfig::default());
    let result = engine.verify(&network);
    assert!(result.initial_violations.contains(&InvalidState {
        formula: FormulaId::ExistenceTrafficSigns,
        location: Location::from([1]),
    }));

    let outcome = engine.verify_and_repair(&mut network);
    assert!(outcome.result.repairing_possible);
    let doc = network.to_document();
    assert_eq!(doc.lanelets.len(), 1);
    assert!(doc.lanelets[0].traffic_signs.is_empty());

    let text = serde_json::to_string(&doc).expect("serializable");
    let reread: NetworkDocument = serde_json::from_str(&text).expect("round trip");
    assert_eq!(reread, doc);
}

#[test]
fn test_empty_network_has_no_violations() {
    let mut network = RoadNetwork::new();
    let engine = engine(VerificationConfig::default());
    assert!(engine.verify(&network).is_valid());

    let outcome = engine.verify_and_repair(&mut network);
    assert!(outcome.result.is_valid());
    assert!(outcome.result.chains.is_empty());
    assert!(network.is_empty());
}

/// A left boundary with two separate loops: each repair round cuts one.
fn two_loop_network() -> RoadNetwork {
    let mut l = straight(1, 0.0);
    l.left_vertices = vec![
        Point::new(0.0, 0.0),
        Point::new(4.0, 0.0),
        Point::new(4.0, 2.0),
        Point::new(2.0, 2.0),
        Point::new(2.0, -2.0),
        Point::new(10.0, -2.0),
        Point::new(14.0, -2.0),
        Point::new(14.0, 0.0),
        Point::new(12.0, 0.0),
        Point::new(12.0, -4.0),
        Point::new(16.0, -4.0),
    ];
    let mut network = RoadNetwork::new();
    network.add_lanelet(l);
    network
}

#[test]
fn test_repairs_converge_within_the_iteration_limit() {
    let mut network = two_loop_network();
    let outcome = engine(
        VerificationConfig::default()
            .with_formulas([FormulaId::LeftSelfIntersection])
            .with_max_iterations(2),
    )
    .verify_and_repair(&mut network);

    assert!(outcome.result.repairing_possible);
    assert_eq!(outcome.result.chains.len(), 1);
    assert_eq!(outcome.result.chains[0].iterations, 2);
    assert!(outcome.result.residual_violations.is_empty());
}

#[test]
fn test_unconverged_repairs_are_reported_as_residual() {
    let mut network = two_loop_network();
    let outcome = engine(
        VerificationConfig::default()
            .with_formulas([FormulaId::LeftSelfIntersection])
            .with_max_iterations(1),
    )
    .verify_and_repair(&mut network);

    assert!(!outcome.result.repairing_possible);
    assert!(!outcome.result.chains[0].success);
    assert_eq!(
        outcome.result.residual_violations,
        vec![InvalidState {
            formula: FormulaId::LeftSelfIntersection,
            location: Location::from([1]),
        }]
    );
    // The first loop is gone even though the second remains.
    let left = &network.lanelets().next().expect("lanelet kept").1.left_vertices;
    assert!(left.len() < 11);
}

#[test]
fn test_repairs_leave_distant_elements_alone() {
    let mut network = RoadNetwork::new();
    let mut broken = straight(1, 0.0);
    broken.successors.insert(42);
    network.add_lanelet(broken);

    let far_a = network.add_lanelet(straight(10, 1000.0));
    let far_b = network.add_lanelet(straight(11, 1010.0));
    network.link_lanelets(far_a, far_b);
    let before_a = network.lanelet(far_a).cloned();
    let before_b = network.lanelet(far_b).cloned();

    let outcome = engine(VerificationConfig::default()).verify_and_repair(&mut network);
    assert!(outcome.result.repairing_possible);
    assert_eq!(outcome.result.initial_violation_count(), 1);
    assert_eq!(network.lanelet(far_a).cloned(), before_a);
    assert_eq!(network.lanelet(far_b).cloned(), before_b);
    assert!(network
        .lanelets()
        .all(|(_, l)| !l.successors.contains(&42)));
}

#[test]
fn test_verification_result_serializes_for_reports() {
    let network = two_loop_network();
    let result = engine(VerificationConfig::default()).verify(&network);
    let json = serde_json::to_value(&result).expect("serializable");
    assert_eq!(json["initial_violation_counts"]["left_self_intersection"], 1);
    assert_eq!(json["repairing_possible"], true);
}
