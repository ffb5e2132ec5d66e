//! Grouping of formulas into batches verified one after another.

use serde::{Deserialize, Serialize};

use crate::formula::{FormulaId, RuleDomain};

/// Formulas sharing a primary domain. Repairs for one group only touch
/// elements of that group's kind, so its formulas can be verified together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaGroup {
    pub domain: RuleDomain,
    pub formulas: Vec<FormulaId>,
}

/// Restartable cursor over the groups of a formula set.
#[derive(Debug, Clone)]
pub struct GroupScheduler {
    groups: Vec<FormulaGroup>,
    cursor: usize,
}

impl GroupScheduler {
    pub fn new(formulas: &[FormulaId]) -> Self {
        let groups = RuleDomain::ORDER
            .iter()
            .filter_map(|domain| {
                let mut members: Vec<FormulaId> = formulas
                    .iter()
                    .copied()
                    .filter(|id| id.domain() == *domain)
                    .collect();
                members.sort();
                members.dedup();
                (!members.is_empty()).then(|| FormulaGroup {
                    domain: *domain,
                    formulas: members,
                })
            })
            .collect();
        Self { groups, cursor: 0 }
    }

    pub fn is_next_group(&self) -> bool {
        self.cursor < self.groups.len()
    }

    pub fn next_group(&mut self) -> Option<FormulaGroup> {
        let group = self.groups.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(group)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn groups(&self) -> &[FormulaGroup] {
        &self.groups
    }
}
