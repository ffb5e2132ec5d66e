//! Builtin predicates and functions available to formulas.
//!
//! Each builtin has a fixed arity and is resolved by name once, when the
//! catalog is compiled. Accessors take element handles (or parts of them) and
//! return plain values; id sets come back as lists of ints.

use ahash::AHashMap;
use laneguard_network::geometry::is_self_intersecting;
use laneguard_network::{
    is_speed_limit_code, requires_additional_value_code, CycleElement, ElementId, ElementKind,
    ElementRef, IncomingGroup, Intersection, Lanelet, Point, TrafficLight, TrafficSign,
    TrafficSignElement,
};
use std::cmp::Ordering;

use crate::error::EvalError;
use crate::eval::EvalContext;
use crate::value::{PartKind, PartRef, Value};

macro_rules! builtins {
    ($( $variant:ident => $name:literal, $arity:literal, $ret:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $( $variant, )*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[ $( Builtin::$variant, )* ];

            pub fn name(self) -> &'static str {
                match self {
                    $( Builtin::$variant => $name, )*
                }
            }

            pub fn arity(self) -> usize {
                match self {
                    $( Builtin::$variant => $arity, )*
                }
            }

            /// True when the builtin always yields a truth value.
            pub fn is_predicate(self) -> bool {
                match self {
                    $( Builtin::$variant => builtins!(@pred $ret), )*
                }
            }
        }
    };
    (@pred pred) => { true };
    (@pred func) => { false };
}

builtins! {
    Equal => "equal", 2, pred;
    Less => "less", 2, pred;
    LessEqual => "less_equal", 2, pred;

    Size => "size", 1, func;
    Index => "index", 2, func;
    Reverse => "reverse", 1, func;
    Contains => "contains", 2, pred;
    At => "at", 2, func;
    Add => "add", 2, func;
    Sub => "sub", 2, func;
    Distance => "distance", 2, func;
    SelfIntersecting => "self_intersecting", 1, pred;

    ElementId => "element_id", 1, func;
    LaneletId => "lanelet_id", 1, func;
    TrafficSignId => "traffic_sign_id", 1, func;
    TrafficLightId => "traffic_light_id", 1, func;
    IntersectionId => "intersection_id", 1, func;

    LeftPolyline => "left_polyline", 1, func;
    RightPolyline => "right_polyline", 1, func;
    CenterPolyline => "center_polyline", 1, func;
    Predecessors => "predecessors", 1, func;
    Successors => "successors", 1, func;
    LeftAdjacency => "left_adjacency", 1, func;
    RightAdjacency => "right_adjacency", 1, func;
    TrafficSigns => "traffic_signs", 1, func;
    TrafficLights => "traffic_lights", 1, func;
    StopLineTrafficSigns => "stop_line_traffic_signs", 1, func;
    StopLineTrafficLights => "stop_line_traffic_lights", 1, func;
    LaneletTypes => "lanelet_types", 1, func;

    SignElements => "sign_elements", 1, func;
    ElementCode => "element_code", 1, func;
    AdditionalValues => "additional_values", 1, func;
    IsVirtual => "is_virtual", 1, pred;

    Phases => "phases", 1, func;
    Durations => "durations", 1, func;
    CycleElements => "cycle_elements", 1, func;
    Phase => "phase", 1, func;
    Duration => "duration", 1, func;

    Incomings => "incomings", 1, func;
    IncomingLanelets => "incoming_lanelets", 1, func;
    SuccessorsLeft => "successors_left", 1, func;
    SuccessorsRight => "successors_right", 1, func;
    SuccessorsStraight => "successors_straight", 1, func;
    AllSuccessors => "all_successors", 1, func;
    Crossings => "crossings", 1, func;

    LaneletExists => "lanelet_exists", 1, pred;
    TrafficSignExists => "traffic_sign_exists", 1, pred;
    TrafficLightExists => "traffic_light_exists", 1, pred;
    IntersectionExists => "intersection_exists", 1, pred;

    RequiresAdditionalValue => "requires_additional_value", 1, pred;
    IsSpeedSign => "is_speed_sign", 1, pred;
}

/// Name lookup for builtins. Built once and shared by reference.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    by_name: AHashMap<&'static str, Builtin>,
}

impl BuiltinRegistry {
    pub fn standard() -> Self {
        Self {
            by_name: Builtin::ALL.iter().map(|b| (b.name(), *b)).collect(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Builtin> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Argument decoding
// ============================================================================

fn element_of(
    value: &Value,
    kind: ElementKind,
    function: &'static str,
) -> Result<ElementRef, EvalError> {
    match value {
        Value::Element(r) if r.kind == kind => Ok(*r),
        other => Err(EvalError::TypeMismatch {
            function,
            expected: kind.as_str(),
            found: other.type_name(),
        }),
    }
}

fn dangling(kind: ElementKind) -> EvalError {
    EvalError::DanglingHandle { kind }
}

fn lanelet<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n Lanelet, EvalError> {
    let r = element_of(value, ElementKind::Lanelet, function)?;
    ctx.network
        .lanelet(r.key)
        .ok_or(dangling(ElementKind::Lanelet))
}

fn traffic_sign<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n TrafficSign, EvalError> {
    let r = element_of(value, ElementKind::TrafficSign, function)?;
    ctx.network
        .traffic_sign(r.key)
        .ok_or(dangling(ElementKind::TrafficSign))
}

fn traffic_light<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n TrafficLight, EvalError> {
    let r = element_of(value, ElementKind::TrafficLight, function)?;
    ctx.network
        .traffic_light(r.key)
        .ok_or(dangling(ElementKind::TrafficLight))
}

fn intersection<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n Intersection, EvalError> {
    let r = element_of(value, ElementKind::Intersection, function)?;
    ctx.network
        .intersection(r.key)
        .ok_or(dangling(ElementKind::Intersection))
}

fn part_of(value: &Value, kind: PartKind, function: &'static str) -> Result<PartRef, EvalError> {
    match value {
        Value::Part(p) if p.kind == kind => Ok(*p),
        other => Err(EvalError::TypeMismatch {
            function,
            expected: kind.as_str(),
            found: other.type_name(),
        }),
    }
}

fn out_of_range(function: &'static str, index: usize, len: usize) -> EvalError {
    EvalError::IndexOutOfRange {
        function,
        index: index as i64,
        len,
    }
}

fn sign_element<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n TrafficSignElement, EvalError> {
    let p = part_of(value, PartKind::SignElement, function)?;
    let sign = traffic_sign(ctx, &Value::Element(p.owner), function)?;
    sign.elements
        .get(p.index)
        .ok_or_else(|| out_of_range(function, p.index, sign.elements.len()))
}

fn cycle_element<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n CycleElement, EvalError> {
    let p = part_of(value, PartKind::CycleElement, function)?;
    let light = traffic_light(ctx, &Value::Element(p.owner), function)?;
    light
        .cycle
        .get(p.index)
        .ok_or_else(|| out_of_range(function, p.index, light.cycle.len()))
}

fn incoming_group<'n>(
    ctx: &EvalContext<'n>,
    value: &Value,
    function: &'static str,
) -> Result<&'n IncomingGroup, EvalError> {
    let p = part_of(value, PartKind::IncomingGroup, function)?;
    let i = intersection(ctx, &Value::Element(p.owner), function)?;
    i.incomings
        .get(p.index)
        .ok_or_else(|| out_of_range(function, p.index, i.incomings.len()))
}

fn parts(owner: ElementRef, kind: PartKind, count: usize) -> Value {
    Value::List(
        (0..count)
            .map(|index| Value::Part(PartRef { owner, kind, index }))
            .collect(),
    )
}

fn points_of(value: &Value, function: &'static str) -> Result<Vec<Point>, EvalError> {
    value
        .as_list(function)?
        .iter()
        .map(|v| v.as_point(function))
        .collect()
}

/// Ints that do not fit an id never resolve.
fn exists(
    ctx: &EvalContext<'_>,
    value: &Value,
    kind: ElementKind,
    function: &'static str,
) -> Result<bool, EvalError> {
    let raw = value.as_int(function)?;
    Ok(ElementId::try_from(raw)
        .map(|id| ctx.index.resolves(ctx.network, kind, id))
        .unwrap_or(false))
}

fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    function: &'static str,
    ints: fn(i64, i64) -> Option<i64>,
    floats: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        if let Some(v) = ints(*a, *b) {
            return Ok(Value::Int(v));
        }
    }
    Ok(Value::Float(floats(
        lhs.as_number(function)?,
        rhs.as_number(function)?,
    )))
}

// ============================================================================
// Application
// ============================================================================

impl Builtin {
    pub(crate) fn apply(self, ctx: &EvalContext<'_>, args: &[Value]) -> Result<Value, EvalError> {
        let f = self.name();
        let arg = |position: usize| {
            args.get(position).ok_or(EvalError::MissingArgument {
                function: f,
                position,
            })
        };

        let value = match self {
            Builtin::Equal => Value::Bool(arg(0)?.loose_eq(arg(1)?)),
            Builtin::Less => Value::Bool(arg(0)?.compare(arg(1)?)? == Ordering::Less),
            Builtin::LessEqual => Value::Bool(arg(0)?.compare(arg(1)?)? != Ordering::Greater),

            Builtin::Size => match arg(0)? {
                Value::List(items) => Value::Int(items.len() as i64),
                Value::Str(s) => Value::Int(s.chars().count() as i64),
                other => {
                    return Err(EvalError::TypeMismatch {
                        function: f,
                        expected: "list",
                        found: other.type_name(),
                    })
                }
            },
            Builtin::Index => {
                let needle = arg(1)?;
                let position = arg(0)?
                    .as_list(f)?
                    .iter()
                    .position(|v| v.loose_eq(needle))
                    .ok_or(EvalError::NotFound { function: f })?;
                Value::Int(position as i64)
            }
            Builtin::Reverse => {
                let mut items = arg(0)?.as_list(f)?.to_vec();
                items.reverse();
                Value::List(items)
            }
            Builtin::Contains => {
                let needle = arg(1)?;
                Value::Bool(arg(0)?.as_list(f)?.iter().any(|v| v.loose_eq(needle)))
            }
            Builtin::At => {
                let items = arg(0)?.as_list(f)?;
                let index = arg(1)?.as_int(f)?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or(EvalError::IndexOutOfRange {
                        function: f,
                        index,
                        len: items.len(),
                    })?
            }
            Builtin::Add => arithmetic(arg(0)?, arg(1)?, f, i64::checked_add, |a, b| a + b)?,
            Builtin::Sub => arithmetic(arg(0)?, arg(1)?, f, i64::checked_sub, |a, b| a - b)?,
            Builtin::Distance => {
                Value::Float(arg(0)?.as_point(f)?.distance(arg(1)?.as_point(f)?))
            }
            Builtin::SelfIntersecting => Value::Bool(is_self_intersecting(&points_of(arg(0)?, f)?)),

            Builtin::ElementId => match arg(0)? {
                Value::Element(r) => ctx
                    .network
                    .id_of(*r)
                    .map(Value::id)
                    .ok_or(dangling(r.kind))?,
                other => {
                    return Err(EvalError::TypeMismatch {
                        function: f,
                        expected: "element",
                        found: other.type_name(),
                    })
                }
            },
            Builtin::LaneletId => Value::id(lanelet(ctx, arg(0)?, f)?.id),
            Builtin::TrafficSignId => Value::id(traffic_sign(ctx, arg(0)?, f)?.id),
            Builtin::TrafficLightId => Value::id(traffic_light(ctx, arg(0)?, f)?.id),
            Builtin::IntersectionId => Value::id(intersection(ctx, arg(0)?, f)?.id),

            Builtin::LeftPolyline => Value::points(&lanelet(ctx, arg(0)?, f)?.left_vertices),
            Builtin::RightPolyline => Value::points(&lanelet(ctx, arg(0)?, f)?.right_vertices),
            Builtin::CenterPolyline => Value::points(&lanelet(ctx, arg(0)?, f)?.center_vertices),
            Builtin::Predecessors => {
                Value::ids(lanelet(ctx, arg(0)?, f)?.predecessors.iter().copied())
            }
            Builtin::Successors => Value::ids(lanelet(ctx, arg(0)?, f)?.successors.iter().copied()),
            Builtin::LeftAdjacency => {
                Value::ids(lanelet(ctx, arg(0)?, f)?.adjacent_left.map(|a| a.id))
            }
            Builtin::RightAdjacency => {
                Value::ids(lanelet(ctx, arg(0)?, f)?.adjacent_right.map(|a| a.id))
            }
            Builtin::TrafficSigns => {
                Value::ids(lanelet(ctx, arg(0)?, f)?.traffic_signs.iter().copied())
            }
            Builtin::TrafficLights => {
                Value::ids(lanelet(ctx, arg(0)?, f)?.traffic_lights.iter().copied())
            }
            Builtin::StopLineTrafficSigns => Value::ids(
                lanelet(ctx, arg(0)?, f)?
                    .stop_line
                    .iter()
                    .flat_map(|s| s.traffic_sign_refs.iter().copied()),
            ),
            Builtin::StopLineTrafficLights => Value::ids(
                lanelet(ctx, arg(0)?, f)?
                    .stop_line
                    .iter()
                    .flat_map(|s| s.traffic_light_refs.iter().copied()),
            ),
            Builtin::LaneletTypes => Value::List(
                lanelet(ctx, arg(0)?, f)?
                    .lanelet_types
                    .iter()
                    .cloned()
                    .map(Value::Str)
                    .collect(),
            ),

            Builtin::SignElements => {
                let owner = element_of(arg(0)?, ElementKind::TrafficSign, f)?;
                let sign = traffic_sign(ctx, arg(0)?, f)?;
                parts(owner, PartKind::SignElement, sign.elements.len())
            }
            Builtin::ElementCode => Value::Str(sign_element(ctx, arg(0)?, f)?.code.clone()),
            Builtin::AdditionalValues => Value::List(
                sign_element(ctx, arg(0)?, f)?
                    .additional_values
                    .iter()
                    .copied()
                    .map(Value::Float)
                    .collect(),
            ),
            Builtin::IsVirtual => Value::Bool(traffic_sign(ctx, arg(0)?, f)?.virtual_sign),

            Builtin::Phases => Value::List(
                traffic_light(ctx, arg(0)?, f)?
                    .cycle
                    .iter()
                    .map(|c| Value::Str(c.phase.as_str().to_string()))
                    .collect(),
            ),
            Builtin::Durations => Value::List(
                traffic_light(ctx, arg(0)?, f)?
                    .cycle
                    .iter()
                    .map(|c| Value::Int(i64::from(c.duration)))
                    .collect(),
            ),
            Builtin::CycleElements => {
                let owner = element_of(arg(0)?, ElementKind::TrafficLight, f)?;
                let light = traffic_light(ctx, arg(0)?, f)?;
                parts(owner, PartKind::CycleElement, light.cycle.len())
            }
            Builtin::Phase => {
                Value::Str(cycle_element(ctx, arg(0)?, f)?.phase.as_str().to_string())
            }
            Builtin::Duration => Value::Int(i64::from(cycle_element(ctx, arg(0)?, f)?.duration)),

            Builtin::Incomings => {
                let owner = element_of(arg(0)?, ElementKind::Intersection, f)?;
                let i = intersection(ctx, arg(0)?, f)?;
                parts(owner, PartKind::IncomingGroup, i.incomings.len())
            }
            Builtin::IncomingLanelets => Value::ids(
                incoming_group(ctx, arg(0)?, f)?
                    .incoming_lanelets
                    .iter()
                    .copied(),
            ),
            Builtin::SuccessorsLeft => {
                Value::ids(incoming_group(ctx, arg(0)?, f)?.successors_left.iter().copied())
            }
            Builtin::SuccessorsRight => {
                Value::ids(incoming_group(ctx, arg(0)?, f)?.successors_right.iter().copied())
            }
            Builtin::SuccessorsStraight => Value::ids(
                incoming_group(ctx, arg(0)?, f)?
                    .successors_straight
                    .iter()
                    .copied(),
            ),
            Builtin::AllSuccessors => Value::ids(incoming_group(ctx, arg(0)?, f)?.all_successors()),
            Builtin::Crossings => {
                Value::ids(intersection(ctx, arg(0)?, f)?.crossings.iter().copied())
            }

            Builtin::LaneletExists => Value::Bool(exists(ctx, arg(0)?, ElementKind::Lanelet, f)?),
            Builtin::TrafficSignExists => {
                Value::Bool(exists(ctx, arg(0)?, ElementKind::TrafficSign, f)?)
            }
            Builtin::TrafficLightExists => {
                Value::Bool(exists(ctx, arg(0)?, ElementKind::TrafficLight, f)?)
            }
            Builtin::IntersectionExists => {
                Value::Bool(exists(ctx, arg(0)?, ElementKind::Intersection, f)?)
            }

            Builtin::RequiresAdditionalValue => {
                Value::Bool(requires_additional_value_code(arg(0)?.as_str(f)?))
            }
            Builtin::IsSpeedSign => Value::Bool(is_speed_limit_code(arg(0)?.as_str(f)?)),
        };
        Ok(value)
    }
}
