//! Partitioning of large networks into independently verified blocks.

use ahash::AHashMap;
use laneguard_network::{ElementId, RoadNetwork};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Ids of the elements of one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub lanelets: RoaringBitmap,
    pub traffic_signs: RoaringBitmap,
    pub traffic_lights: RoaringBitmap,
    pub intersections: RoaringBitmap,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.lanelets.is_empty()
            && self.traffic_signs.is_empty()
            && self.traffic_lights.is_empty()
            && self.intersections.is_empty()
    }

    pub fn len(&self) -> u64 {
        self.lanelets.len()
            + self.traffic_signs.len()
            + self.traffic_lights.len()
            + self.intersections.len()
    }
}

/// Connected blocks plus a catch-all for everything not placed in one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub blocks: Vec<Block>,
    pub catch_all: Block,
}

impl Partition {
    /// Blocks in processing order, the catch-all last when non-empty.
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks
            .iter()
            .chain((!self.catch_all.is_empty()).then_some(&self.catch_all))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lanelet ids on either end of a link between two blocks, or between a
    /// block and the catch-all.
    pub fn boundary_lanelets(&self, network: &RoadNetwork) -> BTreeSet<ElementId> {
        let lookup = block_lookup(self);
        let block_of = |id: ElementId| lookup.get(&id).copied().unwrap_or(usize::MAX);
        let present: RoaringBitmap = network.lanelets().map(|(_, l)| l.id).collect();

        let mut boundary = BTreeSet::new();
        for (_, l) in network.lanelets() {
            for other in l.linked_lanelets() {
                if present.contains(other) && block_of(other) != block_of(l.id) {
                    boundary.insert(l.id);
                    boundary.insert(other);
                }
            }
        }
        boundary
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    block_size: usize,
}

impl Partitioner {
    /// Blocks close once they hold `block_size` lanelet ids (at least one).
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn partition(&self, network: &RoadNetwork) -> Partition {
        let graph = lanelet_graph(network);
        let mut partition = Partition::default();
        let mut assigned = RoaringBitmap::new();

        for (&start, neighbours) in &graph {
            if assigned.contains(start) {
                continue;
            }
            if neighbours.is_empty() {
                assigned.insert(start);
                partition.catch_all.lanelets.insert(start);
                continue;
            }

            let mut block = Block::default();
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                if block.lanelets.len() as usize >= self.block_size {
                    break;
                }
                if !assigned.insert(id) {
                    continue;
                }
                block.lanelets.insert(id);
                if let Some(next) = graph.get(&id) {
                    queue.extend(next.iter().filter(|n| !assigned.contains(**n)));
                }
            }
            partition.blocks.push(block);
        }

        place_signs_and_lights(network, &mut partition);
        place_intersections(network, &mut partition);

        tracing::debug!(
            blocks = partition.blocks.len(),
            catch_all = partition.catch_all.len(),
            "partitioned network"
        );
        partition
    }
}

/// Undirected lanelet connectivity by id, restricted to ids present in the
/// network and ordered by id.
fn lanelet_graph(network: &RoadNetwork) -> BTreeMap<ElementId, BTreeSet<ElementId>> {
    let mut graph: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
    for (_, l) in network.lanelets() {
        graph.entry(l.id).or_default();
    }
    for (_, l) in network.lanelets() {
        for other in l.linked_lanelets() {
            if other == l.id || !graph.contains_key(&other) {
                continue;
            }
            graph.entry(l.id).or_default().insert(other);
            graph.entry(other).or_default().insert(l.id);
        }
    }
    graph
}

fn block_lookup(partition: &Partition) -> AHashMap<ElementId, usize> {
    partition
        .blocks
        .iter()
        .enumerate()
        .flat_map(|(i, b)| b.lanelets.iter().map(move |id| (id, i)))
        .collect()
}

/// Signs and lights join the first block (in block order, then lanelet id
/// order) whose lanelets reference them; the rest go to the catch-all.
fn place_signs_and_lights(network: &RoadNetwork, partition: &mut Partition) {
    let lookup = block_lookup(partition);
    let mut referencing: BTreeMap<(usize, ElementId), (Vec<ElementId>, Vec<ElementId>)> =
        BTreeMap::new();
    for (_, l) in network.lanelets() {
        let block = lookup.get(&l.id).copied().unwrap_or(usize::MAX);
        let entry = referencing.entry((block, l.id)).or_default();
        entry.0.extend(l.referenced_traffic_signs());
        entry.1.extend(l.referenced_traffic_lights());
    }

    let mut placed_signs = RoaringBitmap::new();
    let mut placed_lights = RoaringBitmap::new();
    let sign_ids: RoaringBitmap = network.traffic_signs().map(|(_, s)| s.id).collect();
    let light_ids: RoaringBitmap = network.traffic_lights().map(|(_, t)| t.id).collect();

    for ((block, _), (signs, lights)) in referencing {
        let target = partition
            .blocks
            .get_mut(block)
            .unwrap_or(&mut partition.catch_all);
        for id in signs {
            if sign_ids.contains(id) && placed_signs.insert(id) {
                target.traffic_signs.insert(id);
            }
        }
        for id in lights {
            if light_ids.contains(id) && placed_lights.insert(id) {
                target.traffic_lights.insert(id);
            }
        }
    }

    partition.catch_all.traffic_signs |= sign_ids - placed_signs;
    partition.catch_all.traffic_lights |= light_ids - placed_lights;
}

/// Intersections join the block of their first incoming lanelet that has
/// one; the rest go to the catch-all.
fn place_intersections(network: &RoadNetwork, partition: &mut Partition) {
    let lookup = block_lookup(partition);
    for (_, i) in network.intersections() {
        let block = i
            .incomings
            .iter()
            .flat_map(|g| g.incoming_lanelets.iter())
            .find_map(|id| lookup.get(id).copied());
        match block.and_then(|b| partition.blocks.get_mut(b)) {
            Some(target) => target.intersections.insert(i.id),
            None => partition.catch_all.intersections.insert(i.id),
        };
    }
}
