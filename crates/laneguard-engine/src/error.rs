//! Engine error types.
//!
//! Only configuration and catalog problems surface as errors. Problems with
//! the network's content are reported as violations, and problems while
//! evaluating a formula at one binding count as that binding failing.

use laneguard_dsl::FormulaParseError;
use laneguard_network::ElementKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown formula id `{0}`")]
    UnknownFormula(String),

    #[error("failed to parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: FormulaParseError,
    },

    #[error("{context}: unknown predicate or function `{name}`")]
    UnknownName { context: String, name: String },

    #[error("{context}: `{name}` takes {expected} argument(s), got {got}")]
    Arity {
        context: String,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("{context}: `{name}` does not yield a truth value and cannot be used as a predicate")]
    NotAPredicate { context: String, name: String },

    #[error("{context}: unbound variable `{var}`")]
    UnboundVariable { context: String, var: String },

    #[error("subformula `{0}` is declared twice")]
    DuplicateSubformula(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("max_iterations must be greater than zero")]
    InvalidMaxIterations,

    #[error("submap_radius must be at least 1")]
    InvalidSubmapRadius,

    #[error("block_size must be at least 1")]
    InvalidBlockSize,
}

/// Failure while evaluating a formula at one binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("`{function}` expected {expected}, got {found}")]
    TypeMismatch {
        function: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{function}`: index {index} is out of range for length {len}")]
    IndexOutOfRange {
        function: &'static str,
        index: i64,
        len: usize,
    },

    #[error("`{function}`: value not found")]
    NotFound { function: &'static str },

    #[error("`{function}`: missing argument {position}")]
    MissingArgument {
        function: &'static str,
        position: usize,
    },

    #[error("handle to a {kind} that is no longer in the network")]
    DanglingHandle { kind: ElementKind },

    #[error("cannot order {lhs} against {rhs}")]
    Incomparable {
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("quantifier range must be a list, got {found}")]
    NotIterable { found: &'static str },
}
