//! Laneguard road network
//!
//! The in-memory graph the verification engine checks and repairs:
//! - **Lanelets**: directed lane segments with boundaries and topology links
//! - **Traffic signs / lights**: referenced by lanelets and their stop lines
//! - **Intersections**: incoming groups and crossings over lanelets
//!
//! Converters from map formats produce a [`NetworkDocument`]; the engine works
//! on a [`RoadNetwork`], which adds stable storage keys, an id allocator and
//! external-reference bookkeeping for sub-networks.

pub mod element;
pub mod geometry;
pub mod network;

pub use element::{
    Adjacency, CycleElement, Element, ElementId, ElementKey, ElementKind, ElementRef,
    IncomingGroup, Intersection, Lanelet, StopLine, TrafficLight, TrafficLightPhase, TrafficSign,
    TrafficSignElement,
};
pub use element::{is_speed_limit_code, requires_additional_value_code};
pub use geometry::Point;
pub use network::{ExternalIds, IdAllocator, MergeSummary, NetworkDocument, RoadNetwork, Scope};
