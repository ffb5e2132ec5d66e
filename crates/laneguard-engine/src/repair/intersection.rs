use laneguard_network::{ElementId, ElementKind, IncomingGroup, RoadNetwork};
use std::collections::BTreeSet;

pub(super) fn remove_underfull(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.intersections_with_id(id) {
        if network.intersection(key).is_some_and(|i| i.incomings.len() < 2) {
            changed |= network.remove_intersection(key).is_some();
        }
    }
    changed
}

fn dangling_lanelets<'a>(
    network: &RoadNetwork,
    ids: impl IntoIterator<Item = &'a ElementId>,
) -> BTreeSet<ElementId> {
    ids.into_iter()
        .copied()
        .filter(|id| !network.resolves(ElementKind::Lanelet, *id))
        .collect()
}

/// Rewrite the incoming groups of every intersection carrying `id`.
fn edit_groups(
    network: &mut RoadNetwork,
    id: ElementId,
    mut edit: impl FnMut(&RoadNetwork, &mut Vec<IncomingGroup>) -> bool,
) -> bool {
    let mut changed = false;
    for key in network.intersections_with_id(id) {
        let Some(mut groups) = network.intersection(key).map(|i| i.incomings.clone()) else {
            continue;
        };
        if edit(&*network, &mut groups) {
            if let Some(i) = network.intersection_mut(key) {
                i.incomings = groups;
                changed = true;
            }
        }
    }
    changed
}

/// Drop unresolved incoming lanelets, and groups left without any.
pub(super) fn drop_dangling_incomings(network: &mut RoadNetwork, id: ElementId) -> bool {
    edit_groups(network, id, |network, groups| {
        let mut changed = false;
        groups.retain_mut(|g| {
            let dangling = dangling_lanelets(network, &g.incoming_lanelets);
            if dangling.is_empty() {
                return true;
            }
            changed = true;
            g.incoming_lanelets.retain(|l| !dangling.contains(l));
            !g.incoming_lanelets.is_empty()
        });
        changed
    })
}

pub(super) fn drop_dangling_successors(network: &mut RoadNetwork, id: ElementId) -> bool {
    edit_groups(network, id, |network, groups| {
        let mut changed = false;
        for g in groups.iter_mut() {
            let successors: Vec<ElementId> = g.all_successors().collect();
            let dangling = dangling_lanelets(network, &successors);
            for l in &dangling {
                g.successors_left.remove(l);
                g.successors_right.remove(l);
                g.successors_straight.remove(l);
                changed = true;
            }
        }
        changed
    })
}

/// Give a group without successors the successors of its incoming lanelets
/// as straight connections; drop the group when there are none.
pub(super) fn infer_connections(network: &mut RoadNetwork, id: ElementId) -> bool {
    edit_groups(network, id, |network, groups| {
        let mut changed = false;
        groups.retain_mut(|g| {
            if g.all_successors().next().is_some() {
                return true;
            }
            changed = true;
            let inferred: BTreeSet<ElementId> = g
                .incoming_lanelets
                .iter()
                .flat_map(|incoming| network.lanelets_with_id(*incoming))
                .filter_map(|key| network.lanelet(key))
                .flat_map(|l| l.successors.iter().copied())
                .filter(|succ| network.resolves(ElementKind::Lanelet, *succ))
                .collect();
            g.successors_straight = inferred;
            !g.successors_straight.is_empty()
        });
        changed
    })
}

pub(super) fn drop_dangling_crossings(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.intersections_with_id(id) {
        let dangling = match network.intersection(key) {
            Some(i) => dangling_lanelets(network, &i.crossings),
            None => continue,
        };
        if dangling.is_empty() {
            continue;
        }
        if let Some(i) = network.intersection_mut(key) {
            i.crossings.retain(|c| !dangling.contains(c));
            changed = true;
        }
    }
    changed
}
