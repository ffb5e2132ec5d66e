//! Laneguard engine: map verification and repair
//!
//! Checks a [`laneguard_network::RoadNetwork`] against a catalog of rules
//! written in the `laneguard-dsl` formula language and repairs what it finds.
//!
//! ## Pipeline
//!
//! 1. **Catalog**: rule sources are parsed and compiled once into slot-indexed
//!    trees, with every name resolved against the subformula table and the
//!    builtin registry ([`RuleCatalog`])
//! 2. **Scheduling**: the active formulas are grouped by primary domain
//!    ([`GroupScheduler`])
//! 3. **Verification**: each formula's outer bindings are enumerated and the
//!    failing ones reported as locations ([`MapVerifier`])
//! 4. **Repair**: each violation is localized ([`SubMap`]), repaired on a copy
//!    ([`MapRepairer`]), re-verified and merged back ([`MapVerification`])
//! 5. **Partitioning**: networks above a lanelet threshold are cut into
//!    independent blocks first ([`Partitioner`])
//!
//! Only configuration problems surface as errors. Everything wrong with a
//! network is reported as data in the [`VerificationResult`].

pub mod builtins;
pub mod catalog;
mod compile;
pub mod config;
pub mod error;
mod eval;
pub mod formula;
pub mod index;
pub mod orchestrator;
pub mod partition;
pub mod repair;
pub mod result;
pub mod scheduler;
pub mod submap;
pub mod value;
pub mod verifier;

pub use builtins::{Builtin, BuiltinRegistry};
pub use catalog::{CatalogEntry, RuleCatalog};
pub use compile::{CompiledFormula, CompiledSubformula};
pub use config::VerificationConfig;
pub use error::{CatalogError, EngineError, EvalError};
pub use eval::EvalContext;
pub use formula::{
    invalid_states, parse_formula_ids, violation_count, FormulaId, InvalidState, Location,
    RuleDomain, Violations,
};
pub use index::NetworkIndex;
pub use orchestrator::{MapVerification, VerificationOutcome};
pub use partition::{Block, Partition, Partitioner};
pub use repair::{MapRepairer, RepairReport};
pub use result::{RepairChain, VerificationResult};
pub use scheduler::{FormulaGroup, GroupScheduler};
pub use submap::SubMap;
pub use value::Value;
pub use verifier::MapVerifier;
