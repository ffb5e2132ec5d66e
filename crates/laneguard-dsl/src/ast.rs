//! Typed AST for `formula_v1`.
//!
//! The tree is produced once by the parser and never re-parsed; the engine
//! compiles it into a resolved form before evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Name = String;

// ============================================================================
// Domains
// ============================================================================

/// A named finite set an outer or quantified variable ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    /// `L`: lanelets
    Lanelets,
    /// `TS`: traffic signs
    TrafficSigns,
    /// `TL`: traffic lights
    TrafficLights,
    /// `I`: intersections
    Intersections,
    /// `M`: every element of the network
    All,
}

impl Domain {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "L" => Some(Self::Lanelets),
            "TS" => Some(Self::TrafficSigns),
            "TL" => Some(Self::TrafficLights),
            "I" => Some(Self::Intersections),
            "M" => Some(Self::All),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Lanelets => "L",
            Self::TrafficSigns => "TS",
            Self::TrafficLights => "TL",
            Self::Intersections => "I",
            Self::All => "M",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ============================================================================
// Terms and expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    /// `A`
    ForAll,
    /// `E`
    Exists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
    Implies,
    Iff,
}

impl Connective {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "&",
            Self::Or => "|",
            Self::Implies => "->",
            Self::Iff => "<->",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A value-producing expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Var(Name),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Call { name: Name, args: Vec<Term> },
}

/// What a quantifier ranges over: a named domain or a set-valued term
/// such as `predecessors(l)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainExpr {
    Named(Domain),
    Term(Term),
}

/// A boolean expression (formula body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Quantifier {
        quantifier: Quantifier,
        var: Name,
        domain: DomainExpr,
        body: Box<Expr>,
    },
    Not(Box<Expr>),
    Connective {
        op: Connective,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Predicate {
        name: Name,
        args: Vec<Term>,
    },
    Compare {
        op: CmpOp,
        lhs: Term,
        rhs: Term,
    },
    Literal(bool),
}

/// An outer variable declaration: `l in L`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub var: Name,
    pub domain: Domain,
}

/// `body || x in D, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDecl {
    pub body: Expr,
    pub bindings: Vec<Binding>,
}

/// `name(p, ...) := body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubformulaDecl {
    pub name: Name,
    pub params: Vec<Name>,
    pub body: Expr,
}

// ============================================================================
// Printing
// ============================================================================
//
// Printing is fully parenthesized so the output always re-parses to the same
// tree, independent of precedence.

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(name) => f.write_str(name),
            Term::Int(v) => write!(f, "{v}"),
            Term::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Term::Str(s) => write!(f, "\"{s}\""),
            Term::Bool(b) => write!(f, "{b}"),
            Term::Call { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for DomainExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainExpr::Named(d) => write!(f, "{d}"),
            DomainExpr::Term(t) => write!(f, "{t}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Quantifier {
                quantifier,
                var,
                domain,
                body,
            } => {
                let q = match quantifier {
                    Quantifier::ForAll => "A",
                    Quantifier::Exists => "E",
                };
                write!(f, "({q} {var} in {domain}. {body})")
            }
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::Connective { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Predicate { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::Literal(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for FormulaDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ||", self.body)?;
        for (i, b) in self.bindings.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{} in {}", b.var, b.domain)?;
        }
        Ok(())
    }
}

impl fmt::Display for SubformulaDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) := {}", self.name, self.params.join(", "), self.body)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{a}")?;
    }
    Ok(())
}

impl Expr {
    /// Free variables of the expression, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<Name> {
        let mut out = Vec::new();
        collect_expr_vars(self, &mut Vec::new(), &mut out);
        out
    }
}

fn collect_expr_vars(expr: &Expr, bound: &mut Vec<Name>, out: &mut Vec<Name>) {
    match expr {
        Expr::Quantifier {
            var, domain, body, ..
        } => {
            if let DomainExpr::Term(t) = domain {
                collect_term_vars(t, bound, out);
            }
            bound.push(var.clone());
            collect_expr_vars(body, bound, out);
            bound.pop();
        }
        Expr::Not(inner) => collect_expr_vars(inner, bound, out),
        Expr::Connective { lhs, rhs, .. } => {
            collect_expr_vars(lhs, bound, out);
            collect_expr_vars(rhs, bound, out);
        }
        Expr::Predicate { args, .. } => {
            for a in args {
                collect_term_vars(a, bound, out);
            }
        }
        Expr::Compare { lhs, rhs, .. } => {
            collect_term_vars(lhs, bound, out);
            collect_term_vars(rhs, bound, out);
        }
        Expr::Literal(_) => {}
    }
}

fn collect_term_vars(term: &Term, bound: &[Name], out: &mut Vec<Name>) {
    match term {
        Term::Var(name) => {
            if !bound.contains(name) && !out.contains(name) {
                out.push(name.clone());
            }
        }
        Term::Call { args, .. } => {
            for a in args {
                collect_term_vars(a, bound, out);
            }
        }
        Term::Int(_) | Term::Float(_) | Term::Str(_) | Term::Bool(_) => {}
    }
}
