//! Name resolution for parsed formulas.
//!
//! Turns a [`laneguard_dsl`] syntax tree into a tree the evaluator can run
//! without lookups: variables become frame slots and calls point straight at
//! a builtin or an earlier subformula. Unknown names, wrong arities and
//! unbound variables are reported here, once, instead of at evaluation time.

use laneguard_dsl::{
    CmpOp, Connective, Domain, DomainExpr, Expr, FormulaDecl, Quantifier, SubformulaDecl, Term,
};

use crate::builtins::{Builtin, BuiltinRegistry};
use crate::error::CatalogError;
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Quantifier {
        quantifier: Quantifier,
        slot: usize,
        range: Range,
        body: Box<Node>,
    },
    Not(Box<Node>),
    Connective {
        op: Connective,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Predicate(Call),
    Compare {
        op: CmpOp,
        lhs: TermNode,
        rhs: TermNode,
    },
    Literal(bool),
}

#[derive(Debug, Clone)]
pub(crate) enum Range {
    Domain(Domain),
    Term(TermNode),
}

#[derive(Debug, Clone)]
pub(crate) enum TermNode {
    Slot(usize),
    Const(Value),
    Call(Call),
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub(crate) callee: Callee,
    pub(crate) args: Vec<TermNode>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Callee {
    Builtin(Builtin),
    /// Position in the catalog's subformula table.
    Subformula(usize),
}

/// A subformula with its parameters in slots `0..arity`.
#[derive(Debug, Clone)]
pub struct CompiledSubformula {
    pub name: String,
    pub(crate) arity: usize,
    pub(crate) frame_size: usize,
    pub(crate) body: Node,
}

/// A formula with its outer variables in slots `0..bindings.len()`.
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    pub bindings: Vec<(String, Domain)>,
    pub(crate) frame_size: usize,
    pub(crate) body: Node,
}

struct Compiler<'a> {
    builtins: &'a BuiltinRegistry,
    subformulas: &'a [CompiledSubformula],
    context: &'a str,
    scope: Vec<(String, usize)>,
    frame_size: usize,
}

impl<'a> Compiler<'a> {
    fn new(
        builtins: &'a BuiltinRegistry,
        subformulas: &'a [CompiledSubformula],
        context: &'a str,
        params: impl IntoIterator<Item = String>,
    ) -> Self {
        let scope: Vec<(String, usize)> = params
            .into_iter()
            .enumerate()
            .map(|(slot, name)| (name, slot))
            .collect();
        Self {
            builtins,
            subformulas,
            context,
            frame_size: scope.len(),
            scope,
        }
    }

    fn push(&mut self, var: &str) -> usize {
        let slot = self.scope.len();
        self.scope.push((var.to_string(), slot));
        self.frame_size = self.frame_size.max(slot + 1);
        slot
    }

    fn lookup(&self, var: &str) -> Option<usize> {
        self.scope
            .iter()
            .rev()
            .find(|(name, _)| name == var)
            .map(|(_, slot)| *slot)
    }

    fn expr(&mut self, expr: &Expr) -> Result<Node, CatalogError> {
        Ok(match expr {
            Expr::Quantifier {
                quantifier,
                var,
                domain,
                body,
            } => {
                let range = match domain {
                    DomainExpr::Named(d) => Range::Domain(*d),
                    DomainExpr::Term(t) => Range::Term(self.term(t)?),
                };
                let slot = self.push(var);
                let body = self.expr(body);
                self.scope.pop();
                Node::Quantifier {
                    quantifier: *quantifier,
                    slot,
                    range,
                    body: Box::new(body?),
                }
            }
            Expr::Not(inner) => Node::Not(Box::new(self.expr(inner)?)),
            Expr::Connective { op, lhs, rhs } => Node::Connective {
                op: *op,
                lhs: Box::new(self.expr(lhs)?),
                rhs: Box::new(self.expr(rhs)?),
            },
            Expr::Predicate { name, args } => {
                let call = self.call(name, args)?;
                if let Callee::Builtin(b) = call.callee {
                    if !b.is_predicate() {
                        return Err(CatalogError::NotAPredicate {
                            context: self.context.to_string(),
                            name: name.clone(),
                        });
                    }
                }
                Node::Predicate(call)
            }
            Expr::Compare { op, lhs, rhs } => Node::Compare {
                op: *op,
                lhs: self.term(lhs)?,
                rhs: self.term(rhs)?,
            },
            Expr::Literal(b) => Node::Literal(*b),
        })
    }

    fn term(&mut self, term: &Term) -> Result<TermNode, CatalogError> {
        Ok(match term {
            Term::Var(var) => TermNode::Slot(self.lookup(var).ok_or_else(|| {
                CatalogError::UnboundVariable {
                    context: self.context.to_string(),
                    var: var.clone(),
                }
            })?),
            Term::Int(i) => TermNode::Const(Value::Int(*i)),
            Term::Float(f) => TermNode::Const(Value::Float(*f)),
            Term::Str(s) => TermNode::Const(Value::Str(s.clone())),
            Term::Bool(b) => TermNode::Const(Value::Bool(*b)),
            Term::Call { name, args } => TermNode::Call(self.call(name, args)?),
        })
    }

    fn call(&mut self, name: &str, args: &[Term]) -> Result<Call, CatalogError> {
        let (callee, expected) = if let Some(index) =
            self.subformulas.iter().position(|s| s.name == name)
        {
            (Callee::Subformula(index), self.subformulas[index].arity)
        } else if let Some(b) = self.builtins.resolve(name) {
            (Callee::Builtin(b), b.arity())
        } else {
            return Err(CatalogError::UnknownName {
                context: self.context.to_string(),
                name: name.to_string(),
            });
        };
        if args.len() != expected {
            return Err(CatalogError::Arity {
                context: self.context.to_string(),
                name: name.to_string(),
                expected,
                got: args.len(),
            });
        }
        let args = args
            .iter()
            .map(|a| self.term(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Call { callee, args })
    }
}

/// Compile a subformula against the subformulas declared before it.
pub fn compile_subformula(
    decl: &SubformulaDecl,
    builtins: &BuiltinRegistry,
    earlier: &[CompiledSubformula],
) -> Result<CompiledSubformula, CatalogError> {
    if earlier.iter().any(|s| s.name == decl.name) {
        return Err(CatalogError::DuplicateSubformula(decl.name.clone()));
    }
    let context = format!("subformula `{}`", decl.name);
    let mut compiler = Compiler::new(builtins, earlier, &context, decl.params.iter().cloned());
    let body = compiler.expr(&decl.body)?;
    Ok(CompiledSubformula {
        name: decl.name.clone(),
        arity: decl.params.len(),
        frame_size: compiler.frame_size,
        body,
    })
}

pub fn compile_formula(
    decl: &FormulaDecl,
    builtins: &BuiltinRegistry,
    subformulas: &[CompiledSubformula],
    context: &str,
) -> Result<CompiledFormula, CatalogError> {
    let mut compiler = Compiler::new(
        builtins,
        subformulas,
        context,
        decl.bindings.iter().map(|b| b.var.clone()),
    );
    let body = compiler.expr(&decl.body)?;
    Ok(CompiledFormula {
        bindings: decl
            .bindings
            .iter()
            .map(|b| (b.var.clone(), b.domain))
            .collect(),
        frame_size: compiler.frame_size,
        body,
    })
}
