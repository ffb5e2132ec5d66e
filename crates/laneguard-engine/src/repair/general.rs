use laneguard_network::{ElementId, RoadNetwork};

/// Keep the first element carrying `id` (lanelets, then signs, lights and
/// intersections, each in key order) and give every other one a fresh id.
pub(super) fn separate_duplicate_ids(network: &mut RoadNetwork, id: ElementId) -> bool {
    let refs = network.refs_with_id(id);
    if refs.len() < 2 {
        return false;
    }
    let mut changed = false;
    for r in &refs[1..] {
        match network.reassign_id(*r) {
            Some(fresh) => {
                tracing::debug!(kind = %r.kind, old = id, new = fresh, "reassigned duplicate id");
                changed = true;
            }
            None => tracing::warn!(kind = %r.kind, id, "no unused id left to reassign"),
        }
    }
    changed
}
