use laneguard_network::{CycleElement, ElementId, RoadNetwork, TrafficLightPhase};
use std::collections::BTreeSet;

use crate::submap::{nearest_lanelet, MAX_ATTACH_DISTANCE};

/// Red 30, red-yellow 3, green 30, yellow 3 (time steps).
pub fn default_cycle() -> Vec<CycleElement> {
    vec![
        CycleElement::new(TrafficLightPhase::Red, 30),
        CycleElement::new(TrafficLightPhase::RedYellow, 3),
        CycleElement::new(TrafficLightPhase::Green, 30),
        CycleElement::new(TrafficLightPhase::Yellow, 3),
    ]
}

pub(super) fn install_default_cycle(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_lights_with_id(id) {
        if let Some(light) = network.traffic_light_mut(key) {
            if light.cycle.is_empty() {
                light.cycle = default_cycle();
                changed = true;
            }
        }
    }
    changed
}

pub(super) fn drop_zero_durations(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_lights_with_id(id) {
        if let Some(light) = network.traffic_light_mut(key) {
            let before = light.cycle.len();
            light.cycle.retain(|c| c.duration > 0);
            changed |= light.cycle.len() != before;
        }
    }
    changed
}

/// Keep the first occurrence of each phase.
pub(super) fn drop_repeated_phases(network: &mut RoadNetwork, id: ElementId) -> bool {
    let mut changed = false;
    for key in network.traffic_lights_with_id(id) {
        if let Some(light) = network.traffic_light_mut(key) {
            let mut seen = BTreeSet::new();
            let before = light.cycle.len();
            light.cycle.retain(|c| seen.insert(c.phase));
            changed |= light.cycle.len() != before;
        }
    }
    changed
}

pub(super) fn attach_or_remove(network: &mut RoadNetwork, id: ElementId) -> bool {
    let referenced = network
        .lanelets()
        .any(|(_, l)| l.referenced_traffic_lights().any(|t| t == id));
    if referenced {
        return false;
    }
    let mut changed = false;
    for key in network.traffic_lights_with_id(id) {
        let position = network.traffic_light(key).and_then(|t| t.position);
        let target = position.and_then(|p| nearest_lanelet(network, p, MAX_ATTACH_DISTANCE));
        match target.and_then(|k| network.lanelet_mut(k)) {
            Some(lanelet) => {
                tracing::debug!(
                    light = id,
                    lanelet = lanelet.id,
                    "attached orphaned traffic light"
                );
                changed |= lanelet.traffic_lights.insert(id);
            }
            None => changed |= network.remove_traffic_light(key).is_some(),
        }
    }
    changed
}
