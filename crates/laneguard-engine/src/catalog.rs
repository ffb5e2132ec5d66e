//! The rule catalog.
//!
//! Every rule is written in the formula language and compiled once when the
//! catalog is built; the catalog is immutable afterwards and handed around by
//! reference.

use laneguard_dsl::{parse_formula, parse_subformula};
use laneguard_network::{ElementRef, RoadNetwork};
use std::collections::BTreeMap;

use crate::builtins::BuiltinRegistry;
use crate::compile::{compile_formula, compile_subformula, CompiledFormula, CompiledSubformula};
use crate::error::{CatalogError, EvalError};
use crate::eval::{EvalContext, Evaluator};
use crate::formula::{FormulaId, RuleDomain};
use crate::index::NetworkIndex;

/// Shared predicate bodies, in declaration order.
pub const SUBFORMULAS: &[&str] = &[
    "distinct_ids(x, y) := x = y | element_id(x) != element_id(y)",
    "links_to(a, b) := contains(successors(a), lanelet_id(b))",
    "links_from(a, b) := contains(predecessors(a), lanelet_id(b))",
    "nonempty_boundaries(l) := size(left_polyline(l)) > 0 & size(right_polyline(l)) > 0",
    "references_sign(l, t) := contains(traffic_signs(l), traffic_sign_id(t)) \
     | contains(stop_line_traffic_signs(l), traffic_sign_id(t))",
    "references_light(l, t) := contains(traffic_lights(l), traffic_light_id(t)) \
     | contains(stop_line_traffic_lights(l), traffic_light_id(t))",
];

/// Rule sources by id.
pub const RULES: &[(FormulaId, &str)] = &[
    (
        FormulaId::UniqueIdLa,
        "A y in M. distinct_ids(x, y) || x in L",
    ),
    (
        FormulaId::UniqueIdTs,
        "A y in M. distinct_ids(x, y) || x in TS",
    ),
    (
        FormulaId::UniqueIdTl,
        "A y in M. distinct_ids(x, y) || x in TL",
    ),
    (
        FormulaId::UniqueIdIn,
        "A y in M. distinct_ids(x, y) || x in I",
    ),
    (
        FormulaId::SameVerticesSize,
        "size(left_polyline(l)) = size(right_polyline(l)) || l in L",
    ),
    (
        FormulaId::VerticesMoreThanOne,
        "size(left_polyline(l)) > 1 & size(right_polyline(l)) > 1 || l in L",
    ),
    (
        FormulaId::PolylinesSameDirection,
        "nonempty_boundaries(l) -> \
         distance(at(left_polyline(l), 0), at(right_polyline(l), 0)) \
         <= distance(at(left_polyline(l), 0), at(reverse(right_polyline(l)), 0)) || l in L",
    ),
    (
        FormulaId::LeftSelfIntersection,
        "!self_intersecting(left_polyline(l)) || l in L",
    ),
    (
        FormulaId::RightSelfIntersection,
        "!self_intersecting(right_polyline(l)) || l in L",
    ),
    (
        FormulaId::ExistenceLeftAdj,
        "A r in left_adjacency(l). lanelet_exists(r) || l in L",
    ),
    (
        FormulaId::ExistenceRightAdj,
        "A r in right_adjacency(l). lanelet_exists(r) || l in L",
    ),
    (
        FormulaId::ExistencePredecessor,
        "A r in predecessors(l). lanelet_exists(r) || l in L",
    ),
    (
        FormulaId::ExistenceSuccessor,
        "A r in successors(l). lanelet_exists(r) || l in L",
    ),
    (
        FormulaId::ConnectionsPredecessor,
        "A k in L. links_from(l, k) -> links_to(k, l) || l in L",
    ),
    (
        FormulaId::ConnectionsSuccessor,
        "A k in L. links_to(l, k) -> links_from(k, l) || l in L",
    ),
    (
        FormulaId::NonPredecessorAsSuccessor,
        "!(links_from(l, k) & links_to(l, k)) || l in L, k in L",
    ),
    (
        FormulaId::ExistenceTrafficSigns,
        "A r in traffic_signs(l). traffic_sign_exists(r) || l in L",
    ),
    (
        FormulaId::ExistenceTrafficLights,
        "A r in traffic_lights(l). traffic_light_exists(r) || l in L",
    ),
    (
        FormulaId::ExistenceStopLineTrafficSigns,
        "A r in stop_line_traffic_signs(l). traffic_sign_exists(r) || l in L",
    ),
    (
        FormulaId::ExistenceStopLineTrafficLights,
        "A r in stop_line_traffic_lights(l). traffic_light_exists(r) || l in L",
    ),
    (
        FormulaId::IncludedStopLineTrafficSigns,
        "A r in stop_line_traffic_signs(l). contains(traffic_signs(l), r) || l in L",
    ),
    (
        FormulaId::AtLeastOneTrafficSignElement,
        "size(sign_elements(t)) >= 1 || t in TS",
    ),
    (
        FormulaId::ReferencedTrafficSign,
        "E l in L. references_sign(l, t) || t in TS",
    ),
    (
        FormulaId::GivenAdditionalValue,
        "A e in sign_elements(t). requires_additional_value(element_code(e)) \
         -> size(additional_values(e)) > 0 || t in TS",
    ),
    (
        FormulaId::ValidAdditionalValueSpeedSign,
        "A e in sign_elements(t). is_speed_sign(element_code(e)) \
         -> (A v in additional_values(e). v > 0) || t in TS",
    ),
    (
        FormulaId::AtLeastOneCycleElement,
        "size(phases(t)) >= 1 || t in TL",
    ),
    (
        FormulaId::NonZeroDuration,
        "A d in durations(t). d > 0 || t in TL",
    ),
    (
        FormulaId::UniqueStateInCycle,
        "A p in phases(t). index(phases(t), p) \
         = sub(sub(size(phases(t)), 1), index(reverse(phases(t)), p)) || t in TL",
    ),
    (
        FormulaId::ReferencedTrafficLight,
        "E l in L. references_light(l, t) || t in TL",
    ),
    (
        FormulaId::AtLeastTwoIncomingElements,
        "size(incomings(i)) >= 2 || i in I",
    ),
    (
        FormulaId::ExistenceIncomingLanelets,
        "A g in incomings(i). A r in incoming_lanelets(g). lanelet_exists(r) || i in I",
    ),
    (
        FormulaId::ExistenceSuccessorLanelets,
        "A g in incomings(i). A r in all_successors(g). lanelet_exists(r) || i in I",
    ),
    (
        FormulaId::AtLeastOneRoadConnection,
        "A g in incomings(i). size(successors_left(g)) > 0 \
         | size(successors_right(g)) > 0 | size(successors_straight(g)) > 0 || i in I",
    ),
    (
        FormulaId::ExistenceCrossings,
        "A r in crossings(i). lanelet_exists(r) || i in I",
    ),
];

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: FormulaId,
    pub domain: RuleDomain,
    pub source: &'static str,
    pub formula: CompiledFormula,
}

#[derive(Debug, Clone)]
pub struct RuleCatalog {
    builtins: BuiltinRegistry,
    subformulas: Vec<CompiledSubformula>,
    entries: BTreeMap<FormulaId, CatalogEntry>,
}

impl RuleCatalog {
    /// The full rule set.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_sources(SUBFORMULAS, RULES)
    }

    /// Build a catalog from formula sources. Later entries for the same id
    /// replace earlier ones.
    pub fn from_sources(
        subformulas: &[&'static str],
        rules: &[(FormulaId, &'static str)],
    ) -> Result<Self, CatalogError> {
        let builtins = BuiltinRegistry::standard();

        let mut compiled_subs = Vec::with_capacity(subformulas.len());
        for src in subformulas {
            let decl = parse_subformula(src).map_err(|source| CatalogError::Parse {
                context: format!("subformula `{src}`"),
                source,
            })?;
            let compiled = compile_subformula(&decl, &builtins, &compiled_subs)?;
            compiled_subs.push(compiled);
        }

        let mut entries = BTreeMap::new();
        for (id, src) in rules {
            let context = format!("formula `{id}`");
            let decl = parse_formula(src).map_err(|source| CatalogError::Parse {
                context: context.clone(),
                source,
            })?;
            let formula = compile_formula(&decl, &builtins, &compiled_subs, &context)?;
            entries.insert(
                *id,
                CatalogEntry {
                    id: *id,
                    domain: id.domain(),
                    source: src,
                    formula,
                },
            );
        }

        Ok(Self {
            builtins,
            subformulas: compiled_subs,
            entries,
        })
    }

    pub fn entry(&self, id: FormulaId) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.values()
    }

    pub fn contains(&self, id: FormulaId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    /// The requested ids (deduplicated, in catalog order), or every id in
    /// the catalog when none are requested.
    pub fn extract_formula_ids(
        &self,
        requested: &[FormulaId],
    ) -> Result<Vec<FormulaId>, CatalogError> {
        if requested.is_empty() {
            return Ok(self.entries.keys().copied().collect());
        }
        if let Some(missing) = requested.iter().find(|id| !self.contains(**id)) {
            return Err(CatalogError::UnknownFormula(missing.to_string()));
        }
        Ok(self
            .entries
            .keys()
            .copied()
            .filter(|id| requested.contains(id))
            .collect())
    }

    /// Truth of one formula at one binding of its outer variables.
    pub fn evaluate(
        &self,
        id: FormulaId,
        network: &RoadNetwork,
        bindings: &[ElementRef],
    ) -> Result<bool, EvalError> {
        let index = NetworkIndex::build(network);
        self.evaluate_indexed(id, EvalContext { network, index: &index }, bindings)
    }

    pub(crate) fn evaluate_indexed(
        &self,
        id: FormulaId,
        ctx: EvalContext<'_>,
        bindings: &[ElementRef],
    ) -> Result<bool, EvalError> {
        // Ids missing from a custom catalog hold vacuously.
        let Some(entry) = self.entries.get(&id) else {
            return Ok(true);
        };
        Evaluator::new(ctx, &self.subformulas).evaluate(&entry.formula, bindings)
    }
}
