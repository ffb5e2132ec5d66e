//! Formula identifiers, rule domains and violation records.

use laneguard_network::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// The element kind a rule primarily quantifies over.
///
/// Variant order is the order in which groups are verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDomain {
    General,
    Lanelet,
    TrafficSign,
    TrafficLight,
    Intersection,
}

impl RuleDomain {
    pub const ORDER: [RuleDomain; 5] = [
        RuleDomain::General,
        RuleDomain::Lanelet,
        RuleDomain::TrafficSign,
        RuleDomain::TrafficLight,
        RuleDomain::Intersection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Lanelet => "lanelet",
            Self::TrafficSign => "traffic_sign",
            Self::TrafficLight => "traffic_light",
            Self::Intersection => "intersection",
        }
    }
}

impl fmt::Display for RuleDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! formula_ids {
    ($( $variant:ident => $name:literal, $domain:ident, $doc:literal; )*) => {
        /// Identifier of a catalog rule.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum FormulaId {
            $( #[doc = $doc] $variant, )*
        }

        impl FormulaId {
            pub const ALL: &'static [FormulaId] = &[ $( FormulaId::$variant, )* ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( FormulaId::$variant => $name, )*
                }
            }

            pub fn domain(self) -> RuleDomain {
                match self {
                    $( FormulaId::$variant => RuleDomain::$domain, )*
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $( FormulaId::$variant => $doc, )*
                }
            }
        }

        impl FromStr for FormulaId {
            type Err = CatalogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(FormulaId::$variant), )*
                    other => Err(CatalogError::UnknownFormula(other.to_string())),
                }
            }
        }
    };
}

formula_ids! {
    UniqueIdLa => "unique_id_la", General, "No other element shares a lanelet's id.";
    UniqueIdTs => "unique_id_ts", General, "No other element shares a traffic sign's id.";
    UniqueIdTl => "unique_id_tl", General, "No other element shares a traffic light's id.";
    UniqueIdIn => "unique_id_in", General, "No other element shares an intersection's id.";

    SameVerticesSize => "same_vertices_size", Lanelet,
        "Left and right boundaries have the same number of vertices.";
    VerticesMoreThanOne => "vertices_more_than_one", Lanelet,
        "Both boundaries have at least two vertices.";
    PolylinesSameDirection => "polylines_same_direction", Lanelet,
        "Left and right boundaries run in the same direction.";
    LeftSelfIntersection => "left_self_intersection", Lanelet,
        "The left boundary does not cross itself.";
    RightSelfIntersection => "right_self_intersection", Lanelet,
        "The right boundary does not cross itself.";
    ExistenceLeftAdj => "existence_left_adj", Lanelet, "The left neighbour exists.";
    ExistenceRightAdj => "existence_right_adj", Lanelet, "The right neighbour exists.";
    ExistencePredecessor => "existence_predecessor", Lanelet, "Every predecessor exists.";
    ExistenceSuccessor => "existence_successor", Lanelet, "Every successor exists.";
    ConnectionsPredecessor => "connections_predecessor", Lanelet,
        "Every predecessor lists the lanelet as a successor.";
    ConnectionsSuccessor => "connections_successor", Lanelet,
        "Every successor lists the lanelet as a predecessor.";
    NonPredecessorAsSuccessor => "non_predecessor_as_successor", Lanelet,
        "No lanelet is both predecessor and successor of another.";
    ExistenceTrafficSigns => "existence_traffic_signs", Lanelet,
        "Every referenced traffic sign exists.";
    ExistenceTrafficLights => "existence_traffic_lights", Lanelet,
        "Every referenced traffic light exists.";
    ExistenceStopLineTrafficSigns => "existence_stop_line_traffic_signs", Lanelet,
        "Every traffic sign of the stop line exists.";
    ExistenceStopLineTrafficLights => "existence_stop_line_traffic_lights", Lanelet,
        "Every traffic light of the stop line exists.";
    IncludedStopLineTrafficSigns => "included_stop_line_traffic_signs", Lanelet,
        "Stop-line traffic signs are also referenced by the lanelet.";

    AtLeastOneTrafficSignElement => "at_least_one_traffic_sign_element", TrafficSign,
        "A traffic sign has at least one element.";
    ReferencedTrafficSign => "referenced_traffic_sign", TrafficSign,
        "A traffic sign is referenced by some lanelet.";
    GivenAdditionalValue => "given_additional_value", TrafficSign,
        "Sign elements that need a value carry one.";
    ValidAdditionalValueSpeedSign => "valid_additional_value_speed_sign", TrafficSign,
        "Speed limit values are positive.";

    AtLeastOneCycleElement => "at_least_one_cycle_element", TrafficLight,
        "A traffic light has a non-empty cycle.";
    NonZeroDuration => "non_zero_duration", TrafficLight,
        "Every cycle phase lasts at least one time step.";
    UniqueStateInCycle => "unique_state_in_cycle", TrafficLight,
        "No phase appears twice in a cycle.";
    ReferencedTrafficLight => "referenced_traffic_light", TrafficLight,
        "A traffic light is referenced by some lanelet.";

    AtLeastTwoIncomingElements => "at_least_two_incoming_elements", Intersection,
        "An intersection has at least two incoming groups.";
    ExistenceIncomingLanelets => "existence_incoming_lanelets", Intersection,
        "Every incoming lanelet exists.";
    ExistenceSuccessorLanelets => "existence_successor_lanelets", Intersection,
        "Every left, right and straight successor exists.";
    AtLeastOneRoadConnection => "at_least_one_road_connection", Intersection,
        "Every incoming group leads somewhere.";
    ExistenceCrossings => "existence_crossings", Intersection, "Every crossing lanelet exists.";
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FormulaId {
    /// Whether the formula can fail for an element because of elements in
    /// another block: id uniqueness and the two-sided link rules.
    pub fn spans_blocks(self) -> bool {
        self.domain() == RuleDomain::General
            || matches!(
                self,
                FormulaId::ConnectionsPredecessor
                    | FormulaId::ConnectionsSuccessor
                    | FormulaId::NonPredecessorAsSuccessor
            )
    }
}

/// Parse formula ids given by name, failing on the first unknown one.
pub fn parse_formula_ids<S: AsRef<str>>(names: &[S]) -> Result<Vec<FormulaId>, CatalogError> {
    names.iter().map(|n| n.as_ref().trim().parse()).collect()
}

/// Ids bound to a formula's outer variables at a failing binding.
///
/// The first entry is the element the repair is anchored at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub Vec<ElementId>);

impl Location {
    pub fn anchor(&self) -> Option<ElementId> {
        self.0.first().copied()
    }

    pub fn get(&self, position: usize) -> Option<ElementId> {
        self.0.get(position).copied()
    }
}

impl<const N: usize> From<[ElementId; N]> for Location {
    fn from(ids: [ElementId; N]) -> Self {
        Location(ids.to_vec())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str(")")
    }
}

/// Violations by formula; formulas without violations are absent.
pub type Violations = BTreeMap<FormulaId, Vec<Location>>;

pub fn violation_count(violations: &Violations) -> usize {
    violations.values().map(Vec::len).sum()
}

/// A formula that does not hold at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvalidState {
    pub formula: FormulaId,
    pub location: Location,
}

pub fn invalid_states(violations: &Violations) -> Vec<InvalidState> {
    violations
        .iter()
        .flat_map(|(formula, locations)| {
            locations.iter().map(move |location| InvalidState {
                formula: *formula,
                location: location.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_their_names() {
        for id in FormulaId::ALL {
            assert_eq!(id.as_str().parse::<FormulaId>().unwrap(), *id);
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        assert_eq!(FormulaId::ALL.len(), 34);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = parse_formula_ids(&["unique_id_la", "no_such_rule"]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownFormula(name) if name == "no_such_rule"));
    }

    #[test]
    fn locations_print_as_tuples() {
        assert_eq!(Location::from([5]).to_string(), "(5)");
        assert_eq!(Location::from([3, 4]).to_string(), "(3, 4)");
        assert_eq!(Location::from([3, 4]).anchor(), Some(3));
    }

    #[test]
    fn cross_block_formulas() {
        let spanning: Vec<FormulaId> = FormulaId::ALL
            .iter()
            .copied()
            .filter(|f| f.spans_blocks())
            .collect();
        assert_eq!(spanning.len(), 7);
        assert!(spanning.contains(&FormulaId::UniqueIdIn));
        assert!(spanning.contains(&FormulaId::NonPredecessorAsSuccessor));
        assert!(!FormulaId::ExistenceSuccessor.spans_blocks());
    }
}
