//! Laneguard formula language
//!
//! Map rules are written as quantified boolean formulas over the elements of a
//! road network:
//!
//! ```text
//! A r in traffic_signs(l). traffic_sign_exists(r) || l in L
//! ```
//!
//! The part before `||` is the body; the part after declares the *outer*
//! variables, each bound to a named domain (`L`, `TS`, `TL`, `I`, `M`). Outer
//! variables are enumerated by the verifier; everything inside the body is
//! evaluated by the engine's interpreter.
//!
//! This crate only owns the surface syntax: the typed AST (`ast`) and the
//! parser (`formula_v1`). Name resolution and evaluation live in
//! `laneguard-engine`.

pub mod ast;
pub mod formula_v1;

pub use ast::{
    Binding, CmpOp, Connective, Domain, DomainExpr, Expr, FormulaDecl, Name, Quantifier,
    SubformulaDecl, Term,
};
pub use formula_v1::{parse_body, parse_formula, parse_subformula, FormulaParseError};
