use laneguard_network::{ElementId, RoadNetwork};

use crate::submap::{nearest_lanelet, MAX_ATTACH_DISTANCE};

pub(super) fn remove_empty_signs(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_signs_with_id(id) {
        if network.traffic_sign(key).is_some_and(|s| s.elements.is_empty()) {
            changed |= network.remove_traffic_sign(key).is_some();
        }
    }
    changed
}

/// Reference an orphaned sign from the nearest lanelet within
/// [`MAX_ATTACH_DISTANCE`], or remove it when there is none.
pub(super) fn attach_or_remove(network: &mut RoadNetwork, id: ElementId) -> bool {
    let referenced = network
        .lanelets()
        .any(|(_, l)| l.referenced_traffic_signs().any(|s| s == id));
    if referenced {
        return false;
    }
    let mut changed = false;
    for key in network.traffic_signs_with_id(id) {
        let position = network.traffic_sign(key).and_then(|s| s.position);
        let target = position.and_then(|p| nearest_lanelet(network, p, MAX_ATTACH_DISTANCE));
        match target.and_then(|k| network.lanelet_mut(k)) {
            Some(lanelet) => {
                tracing::debug!(sign = id, lanelet = lanelet.id, "attached orphaned traffic sign");
                changed |= lanelet.traffic_signs.insert(id);
            }
            None => changed |= network.remove_traffic_sign(key).is_some(),
        }
    }
    changed
}

/// Drop elements whose code needs a value but which carry none.
pub(super) fn drop_elements_missing_values(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_signs_with_id(id) {
        if let Some(sign) = network.traffic_sign_mut(key) {
            let before = sign.elements.len();
            sign.elements
                .retain(|e| !e.requires_additional_value() || !e.additional_values.is_empty());
            changed |= sign.elements.len() != before;
        }
    }
    changed
}

/// Drop non-positive speed limits, and speed elements left without any.
pub(super) fn drop_invalid_speed_values(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_signs_with_id(id) {
        let Some(sign) = network.traffic_sign_mut(key) else {
            continue;
        };
        for element in sign.elements.iter_mut().filter(|e| e.is_speed_limit()) {
            let before = element.additional_values.len();
            element.additional_values.retain(|v| *v > 0.0);
            changed |= element.additional_values.len() != before;
        }
        let before = sign.elements.len();
        sign.elements
            .retain(|e| !e.is_speed_limit() || !e.additional_values.is_empty());
        changed |= sign.elements.len() != before;
    }
    changed
}
