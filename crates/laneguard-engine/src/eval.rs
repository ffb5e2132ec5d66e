//! Evaluation of compiled formulas against a network.

use laneguard_dsl::{CmpOp, Connective, Quantifier};
use laneguard_network::{ElementRef, RoadNetwork};
use std::cmp::Ordering;

use crate::compile::{Call, Callee, CompiledFormula, CompiledSubformula, Node, Range, TermNode};
use crate::error::EvalError;
use crate::index::NetworkIndex;
use crate::value::Value;

/// The network a formula is evaluated against, with its index.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'n> {
    pub network: &'n RoadNetwork,
    pub index: &'n NetworkIndex,
}

pub(crate) struct Evaluator<'a> {
    ctx: EvalContext<'a>,
    subformulas: &'a [CompiledSubformula],
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: EvalContext<'a>, subformulas: &'a [CompiledSubformula]) -> Self {
        Self { ctx, subformulas }
    }

    /// Truth of `formula` with its outer variables bound to `bindings`.
    pub(crate) fn evaluate(
        &self,
        formula: &CompiledFormula,
        bindings: &[ElementRef],
    ) -> Result<bool, EvalError> {
        let mut frame = vec![Value::Bool(false); formula.frame_size.max(bindings.len())];
        for (slot, r) in frame.iter_mut().zip(bindings) {
            *slot = Value::Element(*r);
        }
        self.holds(&formula.body, &mut frame)
    }

    fn holds(&self, node: &Node, frame: &mut [Value]) -> Result<bool, EvalError> {
        match node {
            Node::Literal(b) => Ok(*b),
            Node::Not(inner) => Ok(!self.holds(inner, frame)?),
            Node::Connective { op, lhs, rhs } => {
                let left = self.holds(lhs, frame)?;
                match op {
                    Connective::And => Ok(left && self.holds(rhs, frame)?),
                    Connective::Or => Ok(left || self.holds(rhs, frame)?),
                    Connective::Implies => Ok(!left || self.holds(rhs, frame)?),
                    Connective::Iff => Ok(left == self.holds(rhs, frame)?),
                }
            }
            Node::Compare { op, lhs, rhs } => {
                let a = self.term(lhs, frame)?;
                let b = self.term(rhs, frame)?;
                Ok(match op {
                    CmpOp::Eq => a.loose_eq(&b),
                    CmpOp::Ne => !a.loose_eq(&b),
                    CmpOp::Lt => a.compare(&b)? == Ordering::Less,
                    CmpOp::Le => a.compare(&b)? != Ordering::Greater,
                    CmpOp::Gt => a.compare(&b)? == Ordering::Greater,
                    CmpOp::Ge => a.compare(&b)? != Ordering::Less,
                })
            }
            Node::Predicate(call) => self.call(call, frame)?.as_bool("predicate"),
            Node::Quantifier {
                quantifier,
                slot,
                range,
                body,
            } => {
                let items: Vec<Value> = match range {
                    Range::Domain(d) => self
                        .ctx
                        .index
                        .domain(*d)
                        .iter()
                        .copied()
                        .map(Value::Element)
                        .collect(),
                    Range::Term(t) => match self.term(t, frame)? {
                        Value::List(items) => items,
                        other => {
                            return Err(EvalError::NotIterable {
                                found: other.type_name(),
                            })
                        }
                    },
                };
                let universal = matches!(quantifier, Quantifier::ForAll);
                for item in items {
                    frame[*slot] = item;
                    if self.holds(body, frame)? != universal {
                        return Ok(!universal);
                    }
                }
                Ok(universal)
            }
        }
    }

    fn term(&self, term: &TermNode, frame: &mut [Value]) -> Result<Value, EvalError> {
        match term {
            TermNode::Slot(slot) => Ok(frame[*slot].clone()),
            TermNode::Const(v) => Ok(v.clone()),
            TermNode::Call(call) => self.call(call, frame),
        }
    }

    fn call(&self, call: &Call, frame: &mut [Value]) -> Result<Value, EvalError> {
        let args = call
            .args
            .iter()
            .map(|a| self.term(a, frame))
            .collect::<Result<Vec<_>, _>>()?;
        match call.callee {
            Callee::Builtin(b) => b.apply(&self.ctx, &args),
            Callee::Subformula(index) => {
                let sub = &self.subformulas[index];
                let mut inner = vec![Value::Bool(false); sub.frame_size.max(args.len())];
                for (slot, arg) in inner.iter_mut().zip(args) {
                    *slot = arg;
                }
                Ok(Value::Bool(self.holds(&sub.body, &mut inner)?))
            }
        }
    }
}
