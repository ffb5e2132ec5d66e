use laneguard_engine::{MapVerification, Partitioner, VerificationConfig};
use laneguard_network::{ElementKey, ElementKind, Lanelet, NetworkDocument, Point, RoadNetwork};
use proptest::prelude::*;
use roaring::RoaringBitmap;

const MAX_LANELET_ID: u32 = 60;

fn network_strategy() -> impl Strategy<Value = RoadNetwork> {
    let lanelet = (
        1u32..=MAX_LANELET_ID,
        prop::collection::btree_set(1u32..=MAX_LANELET_ID, 0..3),
    )
        .prop_map(|(id, successors)| {
            let x0 = f64::from(id) * 10.0;
            let mut l = Lanelet::new(
                id,
                vec![Point::new(x0, 1.0), Point::new(x0 + 10.0, 1.0)],
                vec![Point::new(x0, -1.0), Point::new(x0 + 10.0, -1.0)],
            );
            l.successors = successors;
            l
        });
    prop::collection::vec(lanelet, 0..40).prop_map(|lanelets| {
        RoadNetwork::from_document(NetworkDocument {
            lanelets,
            ..NetworkDocument::default()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn blocks_cover_every_lanelet_exactly_once(
        network in network_strategy(),
        block_size in 1usize..8,
    ) {
        let partition = Partitioner::new(block_size).partition(&network);
        let expected: RoaringBitmap = network.lanelets().map(|(_, l)| l.id).collect();

        let mut covered = RoaringBitmap::new();
        for block in partition.iter() {
            prop_assert!(covered.is_disjoint(&block.lanelets));
            covered |= &block.lanelets;
        }
        prop_assert_eq!(covered, expected);
    }

    #[test]
    fn blocks_respect_the_size_limit(network in network_strategy(), block_size in 1usize..8) {
        let partition = Partitioner::new(block_size).partition(&network);
        for block in &partition.blocks {
            prop_assert!(!block.lanelets.is_empty());
            prop_assert!(block.lanelets.len() as usize <= block_size);
        }
    }

    #[test]
    fn partitioned_repair_keeps_every_lanelet(network in network_strategy()) {
        let mut network = network;
        let lanelets = network.count(ElementKind::Lanelet);
        let engine = MapVerification::new(
            VerificationConfig::default()
                .with_partitioning(0, 5)
                .with_parallelism(false),
        )
        .unwrap();
        let outcome = engine.verify_and_repair(&mut network);
        prop_assert_eq!(outcome.result.partitioned, lanelets > 0);
        prop_assert_eq!(network.count(ElementKind::Lanelet), lanelets);
        let resolves = |id: &u32| network.has_local(ElementKind::Lanelet, *id);
        prop_assert!(network.lanelets().all(|(_, l)| l.successors.iter().all(resolves)));
        prop_assert!(network.lanelets().all(|(_, l)| l.predecessors.iter().all(resolves)));
    }

    #[test]
    fn removals_leave_no_dangling_links_between_blocks(
        length in 4u32..30,
        block_size in 1usize..6,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut network = RoadNetwork::new();
        let keys: Vec<ElementKey> = (0..length)
            .map(|i| network.add_lanelet(straight(i + 1, f64::from(i) * 10.0)))
            .collect();
        for pair in keys.windows(2) {
            network.link_lanelets(pair[0], pair[1]);
        }
        let degenerate = keys[pick.index(keys.len())];
        if let Some(l) = network.lanelet_mut(degenerate) {
            l.left_vertices.truncate(1);
        }

        let engine = MapVerification::new(
            VerificationConfig::default()
                .with_partitioning(0, block_size)
                .with_parallelism(false),
        )
        .unwrap();
        let outcome = engine.verify_and_repair(&mut network);
        prop_assert!(outcome.result.repairing_possible);
        prop_assert_eq!(network.count(ElementKind::Lanelet), length as usize - 1);
        prop_assert!(engine.verify(&network).is_valid());
    }
}

fn straight(id: u32, x0: f64) -> Lanelet {
    Lanelet::new(
        id,
        vec![Point::new(x0, 1.0), Point::new(x0 + 10.0, 1.0)],
        vec![Point::new(x0, -1.0), Point::new(x0 + 10.0, -1.0)],
    )
}

/// Lanelet 4 closes the first block; removing it used to leave lanelet 5 of
/// the next block with a predecessor that no longer exists.
#[test]
fn degenerate_lanelet_at_a_block_edge() {
    let mut network = RoadNetwork::new();
    let keys: Vec<ElementKey> = (0..12u32)
        .map(|i| network.add_lanelet(straight(i + 1, f64::from(i) * 10.0)))
        .collect();
    for pair in keys.windows(2) {
        network.link_lanelets(pair[0], pair[1]);
    }
    network.lanelet_mut(keys[3]).unwrap().left_vertices.truncate(1);

    let engine = MapVerification::new(
        VerificationConfig::default()
            .with_partitioning(5, 4)
            .with_parallelism(false),
    )
    .unwrap();
    let outcome = engine.verify_and_repair(&mut network);
    assert_eq!(outcome.result.block_count, 3);
    assert!(outcome.result.repairing_possible);
    assert!(engine.verify(&network).is_valid());
    assert!(network.lanelet(keys[4]).unwrap().predecessors.is_empty());
}
