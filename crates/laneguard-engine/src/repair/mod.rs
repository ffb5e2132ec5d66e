//! The map repairer.
//!
//! One strategy per rule. Every strategy acts on the elements carrying the
//! location's anchor id, re-checks the condition its rule states and leaves
//! the network untouched when that condition already holds, so repeating a
//! repair is a no-op. A repair only removes the violation it targets; what it
//! breaks elsewhere is found by the re-verification that follows.

mod general;
mod intersection;
mod lanelet;
mod light;
mod sign;

use laneguard_network::RoadNetwork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::formula::{FormulaId, Location, Violations};

pub use lanelet::Side;
pub use light::default_cycle;

/// Outcome of one [`MapRepairer::repair_map`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Locations per formula at which the network was changed.
    pub changed: BTreeMap<FormulaId, usize>,
    /// Locations per formula that needed no change.
    pub unchanged: BTreeMap<FormulaId, usize>,
}

impl RepairReport {
    pub fn change_count(&self) -> usize {
        self.changed.values().sum()
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Applies repairs to a (sub-)network in place.
pub struct MapRepairer<'s> {
    network: &'s mut RoadNetwork,
}

impl<'s> MapRepairer<'s> {
    pub fn new(network: &'s mut RoadNetwork) -> Self {
        Self { network }
    }

    /// Repair every location, formulas in catalog order.
    pub fn repair_map(&mut self, violations: &Violations) -> RepairReport {
        let mut report = RepairReport::default();
        for (formula, locations) in violations {
            for location in locations {
                let changed = self.repair(*formula, location);
                tracing::debug!(formula = %formula, %location, changed, "repair applied");
                let bucket = if changed {
                    &mut report.changed
                } else {
                    &mut report.unchanged
                };
                *bucket.entry(*formula).or_default() += 1;
            }
        }
        report
    }

    /// Repair one violation. Returns whether anything changed.
    pub fn repair(&mut self, formula: FormulaId, location: &Location) -> bool {
        let Some(anchor) = location.anchor() else {
            return false;
        };
        let n = &mut *self.network;
        match formula {
            FormulaId::UniqueIdLa
            | FormulaId::UniqueIdTs
            | FormulaId::UniqueIdTl
            | FormulaId::UniqueIdIn => general::separate_duplicate_ids(n, anchor),

            FormulaId::SameVerticesSize => lanelet::equalize_vertex_counts(n, anchor),
            FormulaId::VerticesMoreThanOne => lanelet::remove_degenerate(n, anchor),
            FormulaId::PolylinesSameDirection => lanelet::align_right_boundary(n, anchor),
            FormulaId::LeftSelfIntersection => lanelet::untangle(n, anchor, Side::Left),
            FormulaId::RightSelfIntersection => lanelet::untangle(n, anchor, Side::Right),
            FormulaId::ExistenceLeftAdj => lanelet::drop_dangling_adjacency(n, anchor, Side::Left),
            FormulaId::ExistenceRightAdj => {
                lanelet::drop_dangling_adjacency(n, anchor, Side::Right)
            }
            FormulaId::ExistencePredecessor => lanelet::drop_dangling_predecessors(n, anchor),
            FormulaId::ExistenceSuccessor => lanelet::drop_dangling_successors(n, anchor),
            FormulaId::ConnectionsPredecessor => lanelet::complete_predecessor_links(n, anchor),
            FormulaId::ConnectionsSuccessor => lanelet::complete_successor_links(n, anchor),
            FormulaId::NonPredecessorAsSuccessor => match location.get(1) {
                Some(other) => lanelet::break_two_way_link(n, anchor, other),
                None => false,
            },
            FormulaId::ExistenceTrafficSigns => lanelet::drop_dangling_signs(n, anchor),
            FormulaId::ExistenceTrafficLights => lanelet::drop_dangling_lights(n, anchor),
            FormulaId::ExistenceStopLineTrafficSigns => {
                lanelet::drop_dangling_stop_line_signs(n, anchor)
            }
            FormulaId::ExistenceStopLineTrafficLights => {
                lanelet::drop_dangling_stop_line_lights(n, anchor)
            }
            FormulaId::IncludedStopLineTrafficSigns => lanelet::include_stop_line_signs(n, anchor),

            FormulaId::AtLeastOneTrafficSignElement => sign::remove_empty_signs(n, anchor),
            FormulaId::ReferencedTrafficSign => sign::attach_or_remove(n, anchor),
            FormulaId::GivenAdditionalValue => sign::drop_elements_missing_values(n, anchor),
            FormulaId::ValidAdditionalValueSpeedSign => sign::drop_invalid_speed_values(n, anchor),

            FormulaId::AtLeastOneCycleElement => light::install_default_cycle(n, anchor),
            FormulaId::NonZeroDuration => light::drop_zero_durations(n, anchor),
            FormulaId::UniqueStateInCycle => light::drop_repeated_phases(n, anchor),
            FormulaId::ReferencedTrafficLight => light::attach_or_remove(n, anchor),

            FormulaId::AtLeastTwoIncomingElements => intersection::remove_underfull(n, anchor),
            FormulaId::ExistenceIncomingLanelets => {
                intersection::drop_dangling_incomings(n, anchor)
            }
            FormulaId::ExistenceSuccessorLanelets => {
                intersection::drop_dangling_successors(n, anchor)
            }
            FormulaId::AtLeastOneRoadConnection => intersection::infer_connections(n, anchor),
            FormulaId::ExistenceCrossings => intersection::drop_dangling_crossings(n, anchor),
        }
    }
}

#[cfg(test)]
mod tests;
