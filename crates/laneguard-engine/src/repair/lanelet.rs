use laneguard_network::geometry::{centerline, remove_first_loop, resample};
use laneguard_network::{ElementId, ElementKind, Lanelet, RoadNetwork};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

fn refresh_center(lanelet: &mut Lanelet) {
    if !lanelet.center_vertices.is_empty() {
        lanelet.center_vertices = centerline(&lanelet.left_vertices, &lanelet.right_vertices);
    }
}

/// Resample both boundaries to the larger vertex count. Lanelets with a
/// boundary too short to resample are removed.
pub(super) fn equalize_vertex_counts(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let Some(l) = network.lanelet(key) else {
            continue;
        };
        let (left, right) = (l.left_vertices.len(), l.right_vertices.len());
        if left == right {
            continue;
        }
        if left.min(right) < 2 {
            changed |= network.remove_lanelet(key).is_some();
            continue;
        }
        if let Some(l) = network.lanelet_mut(key) {
            let count = left.max(right);
            l.left_vertices = resample(&l.left_vertices, count);
            l.right_vertices = resample(&l.right_vertices, count);
            refresh_center(l);
            changed = true;
        }
    }
    changed
}

pub(super) fn remove_degenerate(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let degenerate = network
            .lanelet(key)
            .is_some_and(|l| l.left_vertices.len() < 2 || l.right_vertices.len() < 2);
        if degenerate {
            changed |= network.remove_lanelet(key).is_some();
        }
    }
    changed
}

/// Reverse the right boundary when its end is closer to the start of the
/// left boundary than its start is.
pub(super) fn align_right_boundary(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let Some(l) = network.lanelet_mut(key) else {
            continue;
        };
        let (Some(left_start), Some(right_start), Some(right_end)) = (
            l.left_vertices.first().copied(),
            l.right_vertices.first().copied(),
            l.right_vertices.last().copied(),
        ) else {
            continue;
        };
        if left_start.distance(right_start) > left_start.distance(right_end) {
            l.right_vertices.reverse();
            refresh_center(l);
            changed = true;
        }
    }
    changed
}

/// Cut one loop out of the boundary per call.
pub(super) fn untangle(network: &mut RoadNetwork, id: ElementId, side: Side) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        if let Some(l) = network.lanelet_mut(key) {
            let boundary = match side {
                Side::Left => &mut l.left_vertices,
                Side::Right => &mut l.right_vertices,
            };
            if remove_first_loop(boundary) {
                refresh_center(l);
                changed = true;
            }
        }
    }
    changed
}

pub(super) fn drop_dangling_adjacency(
    network: &mut RoadNetwork,
    id: ElementId,
    side: Side,
) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let neighbour = network.lanelet(key).and_then(|l| match side {
            Side::Left => l.adjacent_left,
            Side::Right => l.adjacent_right,
        });
        let Some(neighbour) = neighbour else {
            continue;
        };
        if network.resolves(ElementKind::Lanelet, neighbour.id) {
            continue;
        }
        if let Some(l) = network.lanelet_mut(key) {
            match side {
                Side::Left => l.adjacent_left = None,
                Side::Right => l.adjacent_right = None,
            }
            changed = true;
        }
    }
    changed
}

/// Remove ids that do not resolve to an element of `kind` from the set
/// `select` picks out of each lanelet carrying `id`.
fn retain_resolving(
    network: &mut RoadNetwork,
    id: ElementId,
    kind: ElementKind,
    select: fn(&mut Lanelet) -> Option<&mut BTreeSet<ElementId>>,
) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let Some(current) = network
            .lanelet_mut(key)
            .and_then(select)
            .map(|set| set.clone())
        else {
            continue;
        };
        let dangling: Vec<ElementId> = current
            .into_iter()
            .filter(|target| !network.resolves(kind, *target))
            .collect();
        if dangling.is_empty() {
            continue;
        }
        if let Some(set) = network.lanelet_mut(key).and_then(select) {
            for target in &dangling {
                set.remove(target);
            }
            changed = true;
        }
    }
    changed
}

pub(super) fn drop_dangling_predecessors(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::Lanelet, |l| {
        Some(&mut l.predecessors)
    })
}

pub(super) fn drop_dangling_successors(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::Lanelet, |l| Some(&mut l.successors))
}

pub(super) fn drop_dangling_signs(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::TrafficSign, |l| {
        Some(&mut l.traffic_signs)
    })
}

pub(super) fn drop_dangling_lights(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::TrafficLight, |l| {
        Some(&mut l.traffic_lights)
    })
}

pub(super) fn drop_dangling_stop_line_signs(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::TrafficSign, |l| {
        l.stop_line.as_mut().map(|s| &mut s.traffic_sign_refs)
    })
}

pub(super) fn drop_dangling_stop_line_lights(network: &mut RoadNetwork, id: ElementId) -> bool {
    retain_resolving(network, id, ElementKind::TrafficLight, |l| {
        l.stop_line.as_mut().map(|s| &mut s.traffic_light_refs)
    })
}

/// Add the missing successor edge from each local predecessor.
pub(super) fn complete_predecessor_links(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let predecessors: Vec<ElementId> = network
            .lanelet(key)
            .map(|l| l.predecessors.iter().copied().collect())
            .unwrap_or_default();
        for pred in predecessors {
            for pred_key in network.lanelets_with_id(pred) {
                let missing = network
                    .lanelet(pred_key)
                    .is_some_and(|p| !p.successors.contains(&id));
                if missing {
                    changed |= network.link_lanelets(pred_key, key);
                }
            }
        }
    }
    changed
}

/// Add the missing predecessor edge to each local successor.
pub(super) fn complete_successor_links(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        let successors: Vec<ElementId> = network
            .lanelet(key)
            .map(|l| l.successors.iter().copied().collect())
            .unwrap_or_default();
        for succ in successors {
            for succ_key in network.lanelets_with_id(succ) {
                let missing = network
                    .lanelet(succ_key)
                    .is_some_and(|s| !s.predecessors.contains(&id));
                if missing {
                    changed |= network.link_lanelets(key, succ_key);
                }
            }
        }
    }
    changed
}

/// `other` is both predecessor and successor of `id`: drop the edge
/// `other -> id` and keep `id -> other`.
pub(super) fn break_two_way_link(
    network: &mut RoadNetwork,
    id: ElementId,
    other: ElementId,
) -> bool {
    let mut changed = false;
    let other_keys = network.lanelets_with_id(other);
    for key in network.lanelets_with_id(id) {
        let two_way = network
            .lanelet(key)
            .is_some_and(|l| l.predecessors.contains(&other) && l.successors.contains(&other));
        if !two_way {
            continue;
        }
        for other_key in &other_keys {
            changed |= network.unlink_lanelets(*other_key, key);
        }
        if let Some(l) = network.lanelet_mut(key) {
            changed |= l.predecessors.remove(&other);
        }
    }
    changed
}

pub(super) fn include_stop_line_signs(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.lanelets_with_id(id) {
        if let Some(l) = network.lanelet_mut(key) {
            let refs: Vec<ElementId> = l
                .stop_line
                .iter()
                .flat_map(|s| s.traffic_sign_refs.iter().copied())
                .collect();
            for sign in refs {
                changed |= l.traffic_signs.insert(sign);
            }
        }
    }
    changed
}
