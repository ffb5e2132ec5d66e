//! Text renderings of engine results.

use colored::Colorize;
use laneguard_engine::{
    FormulaId, InvalidState, Partition, RuleCatalog, RuleDomain, VerificationResult,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

fn push_states(out: &mut String, states: &[InvalidState]) {
    let mut by_formula: BTreeMap<FormulaId, Vec<String>> = BTreeMap::new();
    for s in states {
        by_formula
            .entry(s.formula)
            .or_default()
            .push(s.location.to_string());
    }
    for (formula, locations) in by_formula {
        out.push_str(&format!(
            "  - {} ({}): {}\n",
            formula.as_str().bold(),
            locations.len(),
            locations.join(" ")
        ));
    }
}

fn push_timing(out: &mut String, r: &VerificationResult) {
    out.push_str(&format!(
        "  verification: {:.3}s over {} run(s)\n",
        r.verification_time.as_secs_f64(),
        r.verification_runs
    ));
    if r.repair_runs > 0 {
        out.push_str(&format!(
            "  repair: {:.3}s over {} run(s)\n",
            r.repair_time.as_secs_f64(),
            r.repair_runs
        ));
    }
    if r.partitioned {
        out.push_str(&format!("  partitioned into {} block(s)\n", r.block_count));
    }
}

pub fn render_verification_text(r: &VerificationResult, input: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("verify {}\n", input.display()));
    out.push_str(&format!("  formulas: {}\n", r.formulas.len()));
    push_timing(&mut out, r);

    if r.is_valid() {
        out.push_str(&format!("  {}\n", "no violations".green().bold()));
        return out;
    }
    out.push_str(&format!(
        "  {}\n",
        format!("{} violation(s)", r.initial_violation_count())
            .red()
            .bold()
    ));
    push_states(&mut out, &r.initial_violations);
    out
}

pub fn render_repair_text(r: &VerificationResult, input: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("repair {}\n", input.display()));
    out.push_str(&format!("  formulas: {}\n", r.formulas.len()));
    push_timing(&mut out, r);

    if r.is_valid() {
        out.push_str(&format!("  {}\n", "no violations".green().bold()));
        return out;
    }
    out.push_str(&format!(
        "  found {} violation(s), repaired {}\n",
        r.initial_violation_count(),
        r.repaired_count()
    ));
    push_states(&mut out, &r.initial_violations);

    let rounds: usize = r.chains.iter().map(|c| c.iterations).sum();
    out.push_str(&format!("  repair rounds: {rounds}\n"));
    if r.repairing_possible {
        out.push_str(&format!("  {}\n", "all violations repaired".green().bold()));
    } else {
        out.push_str(&format!(
            "  {}\n",
            format!("{} residual violation(s)", r.residual_violations.len())
                .yellow()
                .bold()
        ));
        push_states(&mut out, &r.residual_violations);
    }
    out
}

pub fn render_partition_text(p: &Partition) -> String {
    let mut out = String::new();
    out.push_str(&format!("partition: {} block(s)\n", p.blocks.len()));
    for (i, block) in p.blocks.iter().enumerate() {
        out.push_str(&format!(
            "  block {i}: lanelets={} signs={} lights={} intersections={}\n",
            block.lanelets.len(),
            block.traffic_signs.len(),
            block.traffic_lights.len(),
            block.intersections.len()
        ));
    }
    if !p.catch_all.is_empty() {
        out.push_str(&format!(
            "  catch-all: lanelets={} signs={} lights={} intersections={}\n",
            p.catch_all.lanelets.len(),
            p.catch_all.traffic_signs.len(),
            p.catch_all.traffic_lights.len(),
            p.catch_all.intersections.len()
        ));
    }
    out
}

#[derive(Debug, Serialize)]
pub struct FormulaListing {
    pub id: FormulaId,
    pub domain: RuleDomain,
    pub description: &'static str,
    pub source: &'static str,
}

pub fn formula_listing(catalog: &RuleCatalog) -> Vec<FormulaListing> {
    catalog
        .entries()
        .map(|e| FormulaListing {
            id: e.id,
            domain: e.domain,
            description: e.id.description(),
            source: e.source,
        })
        .collect()
}

pub fn render_formulas_text(catalog: &RuleCatalog, source: bool) -> String {
    let mut by_domain: BTreeMap<RuleDomain, Vec<FormulaListing>> = BTreeMap::new();
    for listing in formula_listing(catalog) {
        by_domain.entry(listing.domain).or_default().push(listing);
    }

    let mut out = String::new();
    for domain in RuleDomain::ORDER {
        let Some(items) = by_domain.get(&domain) else {
            continue;
        };
        out.push_str(&format!("{}\n", domain.as_str().bold()));
        for f in items {
            out.push_str(&format!("  {:<36} {}\n", f.id.as_str(), f.description));
            if source {
                out.push_str(&format!("  {:<36} {}\n", "", f.source.dimmed()));
            }
        }
    }
    out
}
