//! Road-network element kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::geometry::Point;

/// Public integer identifier of an element. Not guaranteed unique.
pub type ElementId = u32;

/// Stable storage key inside a [`crate::RoadNetwork`].
///
/// Keys are assigned on insertion, never reused, and survive deep copies, so
/// an element can be followed from a network into its sub-networks and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ElementKey(u64);

impl ElementKey {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Lanelet,
    TrafficSign,
    TrafficLight,
    Intersection,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [
        ElementKind::Lanelet,
        ElementKind::TrafficSign,
        ElementKind::TrafficLight,
        ElementKind::Intersection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lanelet => "lanelet",
            Self::TrafficSign => "traffic_sign",
            Self::TrafficLight => "traffic_light",
            Self::Intersection => "intersection",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one element of one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub key: ElementKey,
}

// ============================================================================
// Lanelets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacency {
    pub id: ElementId,
    pub same_direction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLine {
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub traffic_sign_refs: BTreeSet<ElementId>,
    #[serde(default)]
    pub traffic_light_refs: BTreeSet<ElementId>,
}

/// An atomic directed lane segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lanelet {
    pub id: ElementId,
    #[serde(default)]
    pub left_vertices: Vec<Point>,
    #[serde(default)]
    pub right_vertices: Vec<Point>,
    #[serde(default)]
    pub center_vertices: Vec<Point>,
    #[serde(default)]
    pub predecessors: BTreeSet<ElementId>,
    #[serde(default)]
    pub successors: BTreeSet<ElementId>,
    #[serde(default)]
    pub adjacent_left: Option<Adjacency>,
    #[serde(default)]
    pub adjacent_right: Option<Adjacency>,
    #[serde(default)]
    pub stop_line: Option<StopLine>,
    #[serde(default)]
    pub traffic_signs: BTreeSet<ElementId>,
    #[serde(default)]
    pub traffic_lights: BTreeSet<ElementId>,
    #[serde(default)]
    pub lanelet_types: BTreeSet<String>,
}

impl Lanelet {
    /// A lanelet with the given boundaries and no links.
    pub fn new(id: ElementId, left_vertices: Vec<Point>, right_vertices: Vec<Point>) -> Self {
        let center_vertices = crate::geometry::centerline(&left_vertices, &right_vertices);
        Self {
            id,
            left_vertices,
            right_vertices,
            center_vertices,
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            adjacent_left: None,
            adjacent_right: None,
            stop_line: None,
            traffic_signs: BTreeSet::new(),
            traffic_lights: BTreeSet::new(),
            lanelet_types: BTreeSet::new(),
        }
    }

    /// Lanelet ids this lanelet points at (links and adjacency).
    pub fn linked_lanelets(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.predecessors
            .iter()
            .chain(self.successors.iter())
            .copied()
            .chain(self.adjacent_left.map(|a| a.id))
            .chain(self.adjacent_right.map(|a| a.id))
    }

    /// Traffic sign ids referenced by the lanelet or its stop line.
    pub fn referenced_traffic_signs(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.traffic_signs.iter().copied().chain(
            self.stop_line
                .iter()
                .flat_map(|s| s.traffic_sign_refs.iter().copied()),
        )
    }

    /// Traffic light ids referenced by the lanelet or its stop line.
    pub fn referenced_traffic_lights(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.traffic_lights.iter().copied().chain(
            self.stop_line
                .iter()
                .flat_map(|s| s.traffic_light_refs.iter().copied()),
        )
    }

    /// Remove every reference to `id` from the lanelet links and adjacency.
    pub fn forget_lanelet(&mut self, id: ElementId) -> bool {
        let mut changed = self.predecessors.remove(&id);
        changed |= self.successors.remove(&id);
        if self.adjacent_left.is_some_and(|a| a.id == id) {
            self.adjacent_left = None;
            changed = true;
        }
        if self.adjacent_right.is_some_and(|a| a.id == id) {
            self.adjacent_right = None;
            changed = true;
        }
        changed
    }

    pub fn forget_traffic_sign(&mut self, id: ElementId) -> bool {
        let mut changed = self.traffic_signs.remove(&id);
        if let Some(stop_line) = &mut self.stop_line {
            changed |= stop_line.traffic_sign_refs.remove(&id);
        }
        changed
    }

    pub fn forget_traffic_light(&mut self, id: ElementId) -> bool {
        let mut changed = self.traffic_lights.remove(&id);
        if let Some(stop_line) = &mut self.stop_line {
            changed |= stop_line.traffic_light_refs.remove(&id);
        }
        changed
    }
}

// ============================================================================
// Traffic signs and lights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSignElement {
    /// Catalogue code of the sign element (e.g. `274` for a speed limit).
    pub code: String,
    #[serde(default)]
    pub additional_values: Vec<f64>,
}

/// Sign codes (German and US catalogues) whose meaning is a speed limit.
pub const SPEED_LIMIT_CODES: &[&str] = &["274", "275", "278", "R2-1", "W13-1"];

/// Sign codes that carry a value besides the speed limits: weight, width,
/// height and length restrictions.
pub const VALUE_LIMIT_CODES: &[&str] = &["262", "263", "264", "265", "266"];

impl TrafficSignElement {
    pub fn new(code: impl Into<String>, additional_values: Vec<f64>) -> Self {
        Self {
            code: code.into(),
            additional_values,
        }
    }

    pub fn is_speed_limit(&self) -> bool {
        is_speed_limit_code(&self.code)
    }

    pub fn requires_additional_value(&self) -> bool {
        requires_additional_value_code(&self.code)
    }
}

pub fn is_speed_limit_code(code: &str) -> bool {
    SPEED_LIMIT_CODES.contains(&code)
}

pub fn requires_additional_value_code(code: &str) -> bool {
    is_speed_limit_code(code) || VALUE_LIMIT_CODES.contains(&code)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSign {
    pub id: ElementId,
    #[serde(default)]
    pub elements: Vec<TrafficSignElement>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default, rename = "virtual")]
    pub virtual_sign: bool,
}

impl TrafficSign {
    pub fn new(id: ElementId, elements: Vec<TrafficSignElement>) -> Self {
        Self {
            id,
            elements,
            position: None,
            virtual_sign: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLightPhase {
    Red,
    RedYellow,
    Green,
    Yellow,
    Inactive,
}

impl TrafficLightPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::RedYellow => "red_yellow",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleElement {
    pub phase: TrafficLightPhase,
    /// Duration in time steps.
    pub duration: u32,
}

impl CycleElement {
    pub fn new(phase: TrafficLightPhase, duration: u32) -> Self {
        Self { phase, duration }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLight {
    pub id: ElementId,
    #[serde(default)]
    pub cycle: Vec<CycleElement>,
    #[serde(default)]
    pub position: Option<Point>,
}

impl TrafficLight {
    pub fn new(id: ElementId, cycle: Vec<CycleElement>) -> Self {
        Self {
            id,
            cycle,
            position: None,
        }
    }
}

// ============================================================================
// Intersections
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingGroup {
    #[serde(default)]
    pub incoming_lanelets: BTreeSet<ElementId>,
    #[serde(default)]
    pub successors_left: BTreeSet<ElementId>,
    #[serde(default)]
    pub successors_right: BTreeSet<ElementId>,
    #[serde(default)]
    pub successors_straight: BTreeSet<ElementId>,
}

impl IncomingGroup {
    pub fn all_successors(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.successors_left
            .iter()
            .chain(self.successors_right.iter())
            .chain(self.successors_straight.iter())
            .copied()
    }

    pub fn lanelets(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.incoming_lanelets
            .iter()
            .copied()
            .chain(self.all_successors())
    }

    pub fn forget_lanelet(&mut self, id: ElementId) -> bool {
        let mut changed = self.incoming_lanelets.remove(&id);
        changed |= self.successors_left.remove(&id);
        changed |= self.successors_right.remove(&id);
        changed |= self.successors_straight.remove(&id);
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intersection {
    pub id: ElementId,
    #[serde(default)]
    pub incomings: Vec<IncomingGroup>,
    #[serde(default)]
    pub crossings: BTreeSet<ElementId>,
}

impl Intersection {
    pub fn new(id: ElementId, incomings: Vec<IncomingGroup>) -> Self {
        Self {
            id,
            incomings,
            crossings: BTreeSet::new(),
        }
    }

    /// Every lanelet id the intersection references.
    pub fn lanelets(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.incomings
            .iter()
            .flat_map(IncomingGroup::lanelets)
            .chain(self.crossings.iter().copied())
    }

    pub fn forget_lanelet(&mut self, id: ElementId) -> bool {
        let mut changed = self.crossings.remove(&id);
        for group in &mut self.incomings {
            changed |= group.forget_lanelet(id);
        }
        changed
    }
}

// ============================================================================
// Sum type
// ============================================================================

/// Any element of the network.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Lanelet(Lanelet),
    TrafficSign(TrafficSign),
    TrafficLight(TrafficLight),
    Intersection(Intersection),
}

impl From<Lanelet> for Element {
    fn from(value: Lanelet) -> Self {
        Element::Lanelet(value)
    }
}

impl From<TrafficSign> for Element {
    fn from(value: TrafficSign) -> Self {
        Element::TrafficSign(value)
    }
}

impl From<TrafficLight> for Element {
    fn from(value: TrafficLight) -> Self {
        Element::TrafficLight(value)
    }
}

impl From<Intersection> for Element {
    fn from(value: Intersection) -> Self {
        Element::Intersection(value)
    }
}
