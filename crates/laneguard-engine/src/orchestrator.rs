//! The verify-repair loop.
//!
//! Formulas are verified group by group. Every violation found is handed to
//! its own closure: the neighbourhood of the pending anchors is copied out,
//! repaired, re-verified against every active formula and merged back, until
//! nothing is pending or the iteration budget runs out. A closure only chases
//! the violations it started with and those its own rounds introduce.
//!
//! Networks above the partition threshold are split into blocks. Formulas a
//! block cannot decide alone are checked around the block boundaries and
//! shared ids first, each block then runs the same loop on its own copy, and
//! references left dangling by removals in another block are repaired on the
//! merged network.

use laneguard_network::{ElementId, ElementKind, RoadNetwork, Scope};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::catalog::RuleCatalog;
use crate::config::VerificationConfig;
use crate::error::EngineError;
use crate::formula::{
    invalid_states, violation_count, FormulaId, InvalidState, Location, Violations,
};
use crate::index::NetworkIndex;
use crate::partition::{Partition, Partitioner};
use crate::repair::MapRepairer;
use crate::result::{RepairChain, VerificationResult};
use crate::scheduler::GroupScheduler;
use crate::submap::SubMap;
use crate::verifier::MapVerifier;

/// Result of [`MapVerification::verify_and_repair`].
#[derive(Debug)]
pub struct VerificationOutcome {
    pub result: VerificationResult,
    /// The repaired private copy, when the caller's network was left alone.
    pub repaired: Option<RoadNetwork>,
}

pub struct MapVerification {
    config: VerificationConfig,
    catalog: RuleCatalog,
    formulas: Vec<FormulaId>,
}

impl MapVerification {
    /// Fails on an invalid configuration before any network is looked at.
    pub fn new(config: VerificationConfig) -> Result<Self, EngineError> {
        Self::with_catalog(config, RuleCatalog::standard()?)
    }

    pub fn with_catalog(
        config: VerificationConfig,
        catalog: RuleCatalog,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let formulas = catalog.extract_formula_ids(&config.formulas)?;
        Ok(Self {
            config,
            catalog,
            formulas,
        })
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// The active formulas, in catalog order.
    pub fn formulas(&self) -> &[FormulaId] {
        &self.formulas
    }

    fn verifier(&self) -> MapVerifier<'_> {
        MapVerifier::new(&self.catalog).with_parallelism(self.config.parallel)
    }

    /// Verify without repairing.
    pub fn verify(&self, network: &RoadNetwork) -> VerificationResult {
        let mut result = VerificationResult::new(self.formulas.clone());
        let start = Instant::now();
        let violations = self.verifier().verify(network, &self.formulas);
        result.verification_time += start.elapsed();
        result.verification_runs += 1;
        result.record_initial(&violations);
        tracing::info!(
            formulas = self.formulas.len(),
            elements = network.element_count(),
            violations = violation_count(&violations),
            "verification finished"
        );
        result
    }

    /// Verify and repair. With `overwrite_scenario` off the caller's network
    /// is not touched and the repaired copy is returned in the outcome.
    pub fn verify_and_repair(&self, network: &mut RoadNetwork) -> VerificationOutcome {
        let mut private = (!self.config.overwrite_scenario).then(|| network.deep_copy());
        let target: &mut RoadNetwork = match private.as_mut() {
            Some(copy) => copy,
            None => network,
        };

        let lanelets = target.count(ElementKind::Lanelet);
        let result = if lanelets > self.config.partition_threshold {
            self.run_partitioned(target)
        } else {
            self.run(target)
        };

        tracing::info!(
            initial = result.initial_violation_count(),
            repaired = result.repaired_count(),
            residual = result.residual_violations.len(),
            repairing_possible = result.repairing_possible,
            partitioned = result.partitioned,
            "verification and repair finished"
        );
        VerificationOutcome {
            result,
            repaired: private,
        }
    }

    fn run(&self, network: &mut RoadNetwork) -> VerificationResult {
        let mut result = VerificationResult::new(self.formulas.clone());
        let verifier = self.verifier();
        let mut scheduler = GroupScheduler::new(&self.formulas);

        while let Some(group) = scheduler.next_group() {
            let start = Instant::now();
            let violations = verifier.verify(network, &group.formulas);
            result.verification_time += start.elapsed();
            result.verification_runs += 1;
            tracing::debug!(
                domain = %group.domain,
                formulas = group.formulas.len(),
                violations = violation_count(&violations),
                "verified group"
            );
            result.record_initial(&violations);
            self.repair_all(network, &violations, &mut result);
        }
        result
    }

    /// Repair one violation and whatever its repairs break nearby.
    fn repair_closure(
        &self,
        network: &mut RoadNetwork,
        state: InvalidState,
        result: &mut VerificationResult,
    ) -> RepairChain {
        let verifier = self.verifier();
        let mut pending = self.still_present(network, &state, result);
        let mut iterations = 0;

        while !pending.is_empty() && iterations < self.config.max_iterations {
            iterations += 1;
            let anchors: BTreeSet<ElementId> = pending
                .values()
                .flatten()
                .flat_map(|location| location.0.iter().copied())
                .collect();
            let mut submap = SubMap::new(network, self.config.submap_radius);
            submap.extract_from_elements(anchors);
            let scope = submap.into_scope();
            let mut sub = network.extract(&scope);

            let start = Instant::now();
            let before = verifier.verify(&sub, &self.formulas);
            result.verification_time += start.elapsed();
            result.verification_runs += 1;

            let start = Instant::now();
            let report = MapRepairer::new(&mut sub).repair_map(&pending);
            result.repair_time += start.elapsed();
            result.repair_runs += 1;

            let start = Instant::now();
            let after = verifier.verify(&sub, &self.formulas);
            result.verification_time += start.elapsed();
            result.verification_runs += 1;
            pending = owned_by_closure(after, &pending, &before);

            let merged = network.merge_subnetwork(&scope, sub);
            tracing::debug!(
                formula = %state.formula,
                anchor = %state.location,
                iterations,
                changes = report.change_count(),
                scope = scope.len(),
                replaced = merged.replaced,
                removed = merged.removed,
                pending = violation_count(&pending),
                "repair round"
            );
        }

        let success = pending.is_empty();
        if !success {
            tracing::warn!(
                formula = %state.formula,
                anchor = %state.location,
                iterations,
                residual = violation_count(&pending),
                "repair did not converge"
            );
            result.record_residual(&pending);
        }
        RepairChain {
            formula: state.formula,
            location: state.location,
            iterations,
            success,
        }
    }

    /// The violation as a one-entry pending set, or nothing when an earlier
    /// repair already removed it.
    fn still_present(
        &self,
        network: &RoadNetwork,
        state: &InvalidState,
        result: &mut VerificationResult,
    ) -> Violations {
        let mut submap = SubMap::new(network, self.config.submap_radius);
        submap.extract_from_elements(state.location.0.iter().copied());
        let sub = submap.create_subnetwork();

        let start = Instant::now();
        let found = self.verifier().verify(&sub, &[state.formula]);
        result.verification_time += start.elapsed();
        result.verification_runs += 1;

        let present = found
            .get(&state.formula)
            .is_some_and(|locations| locations.contains(&state.location));
        let mut pending = Violations::new();
        if present {
            pending.insert(state.formula, vec![state.location.clone()]);
        }
        pending
    }

    /// Repair every violation in `found`, one closure each.
    fn repair_all(
        &self,
        network: &mut RoadNetwork,
        found: &Violations,
        result: &mut VerificationResult,
    ) {
        for state in invalid_states(found) {
            let chain = self.repair_closure(network, state, result);
            result.chains.push(chain);
        }
    }

    /// Violations of `formulas` around `anchors`, limited to those anchored
    /// at one of them. The neighbourhood holds every element an anchor
    /// refers to or is referred by.
    fn verify_around(
        &self,
        network: &RoadNetwork,
        anchors: &BTreeSet<ElementId>,
        formulas: &[FormulaId],
        result: &mut VerificationResult,
    ) -> Violations {
        let mut submap = SubMap::new(network, self.config.submap_radius);
        submap.extract_from_elements(anchors.iter().copied());
        let sub = submap.create_subnetwork();

        let start = Instant::now();
        let mut found = self.verifier().verify(&sub, formulas);
        result.verification_time += start.elapsed();
        result.verification_runs += 1;

        found.retain(|_, locations| {
            locations.retain(|l| l.anchor().is_some_and(|a| anchors.contains(&a)));
            !locations.is_empty()
        });
        found
    }

    fn run_partitioned(&self, network: &mut RoadNetwork) -> VerificationResult {
        let partitioner = Partitioner::new(self.config.block_size);
        let mut result = VerificationResult::new(self.formulas.clone());
        result.partitioned = true;

        let partition = partitioner.partition(network);
        self.repair_across_blocks(network, &partition, &mut result);

        let partition = partitioner.partition(network);
        let scopes: Vec<Scope> = partition
            .iter()
            .map(|block| SubMap::from_block(network, block).into_scope())
            .collect();
        let blocks: Vec<RoadNetwork> = scopes.iter().map(|s| network.extract(s)).collect();
        tracing::info!(
            lanelets = network.count(ElementKind::Lanelet),
            blocks = blocks.len(),
            "partitioned network"
        );

        let run_block = |mut block: RoadNetwork| {
            let result = self.run(&mut block);
            (block, result)
        };
        let outcomes: Vec<(RoadNetwork, VerificationResult)> = if self.config.parallel {
            blocks.into_par_iter().map(run_block).collect()
        } else {
            blocks.into_iter().map(run_block).collect()
        };

        result.block_count = scopes.len();
        for (scope, (block, block_result)) in scopes.iter().zip(outcomes) {
            network.merge_subnetwork(scope, block);
            result.absorb(block_result);
        }

        self.settle_dangling(network, &mut result);
        result
    }

    /// Check and repair the formulas a block cannot decide alone, around the
    /// elements they can fail at: ids shared by several elements and
    /// lanelets linked to another block.
    fn repair_across_blocks(
        &self,
        network: &mut RoadNetwork,
        partition: &Partition,
        result: &mut VerificationResult,
    ) {
        let formulas: Vec<FormulaId> = self
            .formulas
            .iter()
            .copied()
            .filter(|f| f.spans_blocks())
            .collect();
        if formulas.is_empty() {
            return;
        }
        let mut anchors = partition.boundary_lanelets(network);
        anchors.extend(NetworkIndex::build(network).shared_ids());
        if anchors.is_empty() {
            return;
        }

        let found = self.verify_around(network, &anchors, &formulas, result);
        tracing::debug!(
            anchors = anchors.len(),
            violations = violation_count(&found),
            "verified across blocks"
        );
        result.record_initial(&found);
        self.repair_all(network, &found, result);
    }

    /// Blocks only scrub references inside themselves, so removals leave
    /// dangling references in the neighbouring blocks. Repair the elements
    /// holding them on the merged network.
    fn settle_dangling(&self, network: &mut RoadNetwork, result: &mut VerificationResult) {
        let referrers = network.dangling_referrers();
        if referrers.is_empty() {
            return;
        }
        let found = self.verify_around(network, &referrers, &self.formulas, result);
        tracing::debug!(
            referrers = referrers.len(),
            violations = violation_count(&found),
            "settling block boundaries"
        );
        self.repair_all(network, &found, result);
    }
}

/// The violations a closure keeps chasing after a round: those it was
/// already chasing and those the round introduced. Violations that were
/// there before the round belong to their own closures.
fn owned_by_closure(after: Violations, pending: &Violations, before: &Violations) -> Violations {
    let listed = |v: &Violations, formula: &FormulaId, location: &Location| {
        v.get(formula).is_some_and(|ls| ls.contains(location))
    };
    after
        .into_iter()
        .filter_map(|(formula, locations)| {
            let owned: Vec<Location> = locations
                .into_iter()
                .filter(|l| listed(pending, &formula, l) || !listed(before, &formula, l))
                .collect();
            (!owned.is_empty()).then_some((formula, owned))
        })
        .collect()
}
