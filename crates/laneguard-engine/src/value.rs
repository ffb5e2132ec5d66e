//! Runtime values of the formula evaluator.

use laneguard_network::{ElementId, ElementRef, Point};
use std::cmp::Ordering;

use crate::error::EvalError;

/// Which component of its owner a [`PartRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    SignElement,
    CycleElement,
    IncomingGroup,
}

impl PartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignElement => "sign element",
            Self::CycleElement => "cycle element",
            Self::IncomingGroup => "incoming group",
        }
    }
}

/// Handle to the `index`-th component of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartRef {
    pub owner: ElementRef,
    pub kind: PartKind,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Point(Point),
    List(Vec<Value>),
    Element(ElementRef),
    Part(PartRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Point(_) => "point",
            Value::List(_) => "list",
            Value::Element(_) => "element",
            Value::Part(_) => "part",
        }
    }

    pub fn id(id: ElementId) -> Value {
        Value::Int(i64::from(id))
    }

    pub fn ids(ids: impl IntoIterator<Item = ElementId>) -> Value {
        Value::List(ids.into_iter().map(Value::id).collect())
    }

    pub fn points(points: &[Point]) -> Value {
        Value::List(points.iter().copied().map(Value::Point).collect())
    }

    fn mismatch(&self, function: &'static str, expected: &'static str) -> EvalError {
        EvalError::TypeMismatch {
            function,
            expected,
            found: self.type_name(),
        }
    }

    pub fn as_bool(&self, function: &'static str) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch(function, "bool")),
        }
    }

    pub fn as_int(&self, function: &'static str) -> Result<i64, EvalError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.mismatch(function, "int")),
        }
    }

    pub fn as_number(&self, function: &'static str) -> Result<f64, EvalError> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(other.mismatch(function, "number")),
        }
    }

    pub fn as_str(&self, function: &'static str) -> Result<&str, EvalError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch(function, "string")),
        }
    }

    pub fn as_point(&self, function: &'static str) -> Result<Point, EvalError> {
        match self {
            Value::Point(p) => Ok(*p),
            other => Err(other.mismatch(function, "point")),
        }
    }

    pub fn as_list(&self, function: &'static str) -> Result<&[Value], EvalError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch(function, "list")),
        }
    }

    /// Equality across the numeric types; everything else compares by variant.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Ordering for numbers and strings.
    pub fn compare(&self, other: &Value) -> Result<Ordering, EvalError> {
        let incomparable = || EvalError::Incomparable {
            lhs: self.type_name(),
            rhs: other.type_name(),
        };
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = self.as_number("compare")?;
                let b = other.as_number("compare")?;
                a.partial_cmp(&b).ok_or_else(incomparable)
            }
            _ => Err(incomparable()),
        }
    }
}
