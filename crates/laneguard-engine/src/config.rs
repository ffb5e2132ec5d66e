//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::formula::FormulaId;

/// Configuration for one verification (and repair) run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Formulas to check; empty means the whole catalog
    pub formulas: Vec<FormulaId>,
    /// Repair rounds per violation before giving up
    pub max_iterations: usize,
    /// Repair the caller's network in place instead of a private copy
    pub overwrite_scenario: bool,
    /// Lanelet hops around an anchor included in its sub-network
    pub submap_radius: usize,
    /// Lanelet count above which the network is partitioned
    pub partition_threshold: usize,
    /// Lanelets per partition block
    pub block_size: usize,
    /// Use the rayon pool for formulas and blocks
    pub parallel: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            formulas: Vec::new(),
            max_iterations: 3,
            overwrite_scenario: true,
            submap_radius: 1,
            partition_threshold: 200,
            block_size: 50,
            parallel: true,
        }
    }
}

impl VerificationConfig {
    pub fn with_formulas(mut self, formulas: impl Into<Vec<FormulaId>>) -> Self {
        self.formulas = formulas.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_overwrite_scenario(mut self, overwrite: bool) -> Self {
        self.overwrite_scenario = overwrite;
        self
    }

    pub fn with_partitioning(mut self, threshold: usize, block_size: usize) -> Self {
        self.partition_threshold = threshold;
        self.block_size = block_size;
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_iterations == 0 {
            return Err(EngineError::InvalidMaxIterations);
        }
        if self.submap_radius == 0 {
            return Err(EngineError::InvalidSubmapRadius);
        }
        if self.block_size == 0 {
            return Err(EngineError::InvalidBlockSize);
        }
        Ok(())
    }
}
