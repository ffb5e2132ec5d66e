//! The map verifier: finds every failing binding of a set of formulas.

use ahash::AHashSet;
use laneguard_network::{ElementRef, RoadNetwork};
use rayon::prelude::*;

use crate::catalog::RuleCatalog;
use crate::eval::EvalContext;
use crate::formula::{FormulaId, Location, Violations};
use crate::index::NetworkIndex;

/// Stateless, read-only verifier over a shared catalog.
#[derive(Debug, Clone, Copy)]
pub struct MapVerifier<'c> {
    catalog: &'c RuleCatalog,
    parallel: bool,
}

impl<'c> MapVerifier<'c> {
    pub fn new(catalog: &'c RuleCatalog) -> Self {
        Self {
            catalog,
            parallel: true,
        }
    }

    /// Verify formulas one after another instead of on the rayon pool.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn catalog(&self) -> &'c RuleCatalog {
        self.catalog
    }

    /// Failing locations of each formula; formulas that hold are left out.
    pub fn verify(&self, network: &RoadNetwork, ids: &[FormulaId]) -> Violations {
        let index = NetworkIndex::build(network);
        let ctx = EvalContext {
            network,
            index: &index,
        };
        let run = |id: &FormulaId| (*id, self.verify_formula(ctx, *id));
        let results: Vec<(FormulaId, Vec<Location>)> = if self.parallel {
            ids.par_iter().map(run).collect()
        } else {
            ids.iter().map(run).collect()
        };
        results
            .into_iter()
            .filter(|(_, locations)| !locations.is_empty())
            .collect()
    }

    /// Enumerate the Cartesian product of the outer domains and collect the
    /// bindings at which the body is false. An evaluation error counts as
    /// false. Identical id tuples are reported once.
    pub fn verify_formula(&self, ctx: EvalContext<'_>, id: FormulaId) -> Vec<Location> {
        let Some(entry) = self.catalog.entry(id) else {
            return Vec::new();
        };
        let domains: Vec<&[ElementRef]> = entry
            .formula
            .bindings
            .iter()
            .map(|(_, domain)| ctx.index.domain(*domain))
            .collect();
        if domains.iter().any(|d| d.is_empty()) {
            return Vec::new();
        }

        let mut seen = AHashSet::new();
        let mut locations = Vec::new();
        let mut cursor = vec![0usize; domains.len()];
        let mut bindings: Vec<ElementRef> = domains.iter().map(|d| d[0]).collect();
        loop {
            let holds = match self.catalog.evaluate_indexed(id, ctx, &bindings) {
                Ok(holds) => holds,
                Err(error) => {
                    tracing::trace!(
                        formula = %id,
                        %error,
                        "evaluation error counted as a violation"
                    );
                    false
                }
            };
            if !holds {
                let location = Location(
                    bindings
                        .iter()
                        .filter_map(|r| ctx.network.id_of(*r))
                        .collect(),
                );
                if seen.insert(location.clone()) {
                    locations.push(location);
                }
            }

            // Odometer step; the last binding varies fastest.
            let mut position = domains.len();
            loop {
                if position == 0 {
                    return locations;
                }
                position -= 1;
                cursor[position] += 1;
                if cursor[position] < domains[position].len() {
                    bindings[position] = domains[position][cursor[position]];
                    break;
                }
                cursor[position] = 0;
                bindings[position] = domains[position][0];
            }
        }
    }
}
