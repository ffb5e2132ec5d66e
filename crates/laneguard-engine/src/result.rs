//! Statistics and findings of a run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::formula::{invalid_states, FormulaId, InvalidState, Location, Violations};

/// The repair history of one initial violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairChain {
    pub formula: FormulaId,
    pub location: Location,
    /// Repair rounds spent; zero when an earlier repair already removed it.
    pub iterations: usize,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub formulas: Vec<FormulaId>,
    pub verification_time: Duration,
    pub repair_time: Duration,
    pub verification_runs: usize,
    pub repair_runs: usize,
    pub initial_violation_counts: BTreeMap<FormulaId, usize>,
    pub initial_violations: Vec<InvalidState>,
    /// Violations still present when their closure gave up.
    pub residual_violations: Vec<InvalidState>,
    pub chains: Vec<RepairChain>,
    pub repairing_possible: bool,
    pub partitioned: bool,
    pub block_count: usize,
}

impl VerificationResult {
    pub fn new(formulas: Vec<FormulaId>) -> Self {
        Self {
            formulas,
            verification_time: Duration::ZERO,
            repair_time: Duration::ZERO,
            verification_runs: 0,
            repair_runs: 0,
            initial_violation_counts: BTreeMap::new(),
            initial_violations: Vec::new(),
            residual_violations: Vec::new(),
            chains: Vec::new(),
            repairing_possible: true,
            partitioned: false,
            block_count: 0,
        }
    }

    pub fn record_initial(&mut self, violations: &Violations) {
        for (formula, locations) in violations {
            *self.initial_violation_counts.entry(*formula).or_default() += locations.len();
        }
        self.initial_violations.extend(invalid_states(violations));
    }

    pub fn record_residual(&mut self, violations: &Violations) {
        if violations.is_empty() {
            return;
        }
        self.repairing_possible = false;
        for state in invalid_states(violations) {
            if !self.residual_violations.contains(&state) {
                self.residual_violations.push(state);
            }
        }
    }

    /// Merge the statistics of another run into this one. Counters and
    /// times add up; a failed repair anywhere marks the whole run. Initial
    /// violations this run already holds are not counted twice.
    pub fn absorb(&mut self, other: VerificationResult) {
        self.verification_time += other.verification_time;
        self.repair_time += other.repair_time;
        self.verification_runs += other.verification_runs;
        self.repair_runs += other.repair_runs;
        let mut known: BTreeSet<InvalidState> = self.initial_violations.iter().cloned().collect();
        for state in other.initial_violations {
            if known.insert(state.clone()) {
                *self.initial_violation_counts.entry(state.formula).or_default() += 1;
                self.initial_violations.push(state);
            }
        }
        for state in other.residual_violations {
            if !self.residual_violations.contains(&state) {
                self.residual_violations.push(state);
            }
        }
        self.chains.extend(other.chains);
        self.repairing_possible &= other.repairing_possible;
    }

    pub fn initial_violation_count(&self) -> usize {
        self.initial_violation_counts.values().sum()
    }

    pub fn is_valid(&self) -> bool {
        self.initial_violations.is_empty()
    }

    pub fn repaired_count(&self) -> usize {
        self.chains.iter().filter(|c| c.success).count()
    }
}
