//! The road-network graph.
//!
//! Elements live in four key-ordered stores. Public ids may collide; storage
//! keys never do. Sub-networks are deep copies of a subset of the elements
//! that keep the parent's keys, so a repaired copy can be written back with
//! [`RoadNetwork::merge_subnetwork`].

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::element::{
    Element, ElementId, ElementKey, ElementKind, ElementRef, Intersection, Lanelet, TrafficLight,
    TrafficSign,
};

// ============================================================================
// Id allocation
// ============================================================================

/// Hands out ids strictly greater than every id it has observed, until the
/// top of the id range is reached.
///
/// Clones share the same counter; this is how sub-networks repaired in
/// parallel avoid colliding on freshly assigned ids.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: Arc<AtomicU64>,
}

/// One past the largest id.
const ID_LIMIT: u64 = ElementId::MAX as u64 + 1;

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator with its own counter starting at this one's watermark.
    pub fn detached(&self) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(self.watermark())),
        }
    }

    pub fn observe(&self, id: ElementId) {
        self.next.fetch_max(u64::from(id) + 1, Ordering::SeqCst);
    }

    /// `None` once an element with id `ElementId::MAX` has been observed or
    /// every id above the observed ones has been handed out.
    pub fn fresh(&self) -> Option<ElementId> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next < ID_LIMIT).then_some(next + 1)
            })
            .ok()
            .and_then(|id| ElementId::try_from(id).ok())
    }

    /// Smallest id that may still be handed out; `ElementId::MAX + 1` when
    /// the range is used up.
    pub fn watermark(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

// ============================================================================
// External references
// ============================================================================

/// Ids that exist outside this (sub-)network and must be treated as resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalIds {
    pub lanelets: RoaringBitmap,
    pub traffic_signs: RoaringBitmap,
    pub traffic_lights: RoaringBitmap,
    pub intersections: RoaringBitmap,
}

impl ExternalIds {
    pub fn of_kind(&self, kind: ElementKind) -> &RoaringBitmap {
        match kind {
            ElementKind::Lanelet => &self.lanelets,
            ElementKind::TrafficSign => &self.traffic_signs,
            ElementKind::TrafficLight => &self.traffic_lights,
            ElementKind::Intersection => &self.intersections,
        }
    }

    pub fn of_kind_mut(&mut self, kind: ElementKind) -> &mut RoaringBitmap {
        match kind {
            ElementKind::Lanelet => &mut self.lanelets,
            ElementKind::TrafficSign => &mut self.traffic_signs,
            ElementKind::TrafficLight => &mut self.traffic_lights,
            ElementKind::Intersection => &mut self.intersections,
        }
    }

    pub fn contains(&self, kind: ElementKind, id: ElementId) -> bool {
        self.of_kind(kind).contains(id)
    }

    pub fn is_empty(&self) -> bool {
        ElementKind::ALL.iter().all(|k| self.of_kind(*k).is_empty())
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// A set of element keys, per kind: the footprint of a sub-network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub lanelets: BTreeSet<ElementKey>,
    pub traffic_signs: BTreeSet<ElementKey>,
    pub traffic_lights: BTreeSet<ElementKey>,
    pub intersections: BTreeSet<ElementKey>,
}

impl Scope {
    pub fn of_kind(&self, kind: ElementKind) -> &BTreeSet<ElementKey> {
        match kind {
            ElementKind::Lanelet => &self.lanelets,
            ElementKind::TrafficSign => &self.traffic_signs,
            ElementKind::TrafficLight => &self.traffic_lights,
            ElementKind::Intersection => &self.intersections,
        }
    }

    fn of_kind_mut(&mut self, kind: ElementKind) -> &mut BTreeSet<ElementKey> {
        match kind {
            ElementKind::Lanelet => &mut self.lanelets,
            ElementKind::TrafficSign => &mut self.traffic_signs,
            ElementKind::TrafficLight => &mut self.traffic_lights,
            ElementKind::Intersection => &mut self.intersections,
        }
    }

    pub fn insert(&mut self, r: ElementRef) -> bool {
        self.of_kind_mut(r.kind).insert(r.key)
    }

    pub fn contains(&self, r: ElementRef) -> bool {
        self.of_kind(r.kind).contains(&r.key)
    }

    pub fn len(&self) -> usize {
        ElementKind::ALL.iter().map(|k| self.of_kind(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn refs(&self) -> impl Iterator<Item = ElementRef> + '_ {
        ElementKind::ALL.into_iter().flat_map(move |kind| {
            self.of_kind(kind)
                .iter()
                .map(move |key| ElementRef { kind, key: *key })
        })
    }

    /// True when no element belongs to both scopes.
    pub fn is_disjoint(&self, other: &Scope) -> bool {
        ElementKind::ALL
            .iter()
            .all(|k| self.of_kind(*k).is_disjoint(other.of_kind(*k)))
    }
}

/// What a merge wrote back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub replaced: usize,
    pub removed: usize,
    pub inserted: usize,
}

// ============================================================================
// RoadNetwork
// ============================================================================

#[derive(Debug, Default)]
pub struct RoadNetwork {
    lanelets: BTreeMap<ElementKey, Lanelet>,
    traffic_signs: BTreeMap<ElementKey, TrafficSign>,
    traffic_lights: BTreeMap<ElementKey, TrafficLight>,
    intersections: BTreeMap<ElementKey, Intersection>,
    next_key: u64,
    ids: IdAllocator,
    external: ExternalIds,
}

macro_rules! element_store {
    ($field:ident, $ty:ty, $add:ident, $get:ident, $get_mut:ident, $iter:ident, $with_id:ident) => {
        pub fn $add(&mut self, element: $ty) -> ElementKey {
            self.ids.observe(element.id);
            let key = self.alloc_key();
            self.$field.insert(key, element);
            key
        }

        pub fn $get(&self, key: ElementKey) -> Option<&$ty> {
            self.$field.get(&key)
        }

        pub fn $get_mut(&mut self, key: ElementKey) -> Option<&mut $ty> {
            self.$field.get_mut(&key)
        }

        pub fn $iter(&self) -> impl Iterator<Item = (ElementKey, &$ty)> + '_ {
            self.$field.iter().map(|(k, v)| (*k, v))
        }

        /// Keys of every element of this kind carrying `id`, in key order.
        pub fn $with_id(&self, id: ElementId) -> Vec<ElementKey> {
            self.$field
                .iter()
                .filter(|(_, e)| e.id == id)
                .map(|(k, _)| *k)
                .collect()
        }
    };
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_key(&mut self) -> ElementKey {
        let key = ElementKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    element_store!(
        lanelets,
        Lanelet,
        add_lanelet,
        lanelet,
        lanelet_mut,
        lanelets,
        lanelets_with_id
    );
    element_store!(
        traffic_signs,
        TrafficSign,
        add_traffic_sign,
        traffic_sign,
        traffic_sign_mut,
        traffic_signs,
        traffic_signs_with_id
    );
    element_store!(
        traffic_lights,
        TrafficLight,
        add_traffic_light,
        traffic_light,
        traffic_light_mut,
        traffic_lights,
        traffic_lights_with_id
    );
    element_store!(
        intersections,
        Intersection,
        add_intersection,
        intersection,
        intersection_mut,
        intersections,
        intersections_with_id
    );

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn count(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Lanelet => self.lanelets.len(),
            ElementKind::TrafficSign => self.traffic_signs.len(),
            ElementKind::TrafficLight => self.traffic_lights.len(),
            ElementKind::Intersection => self.intersections.len(),
        }
    }

    pub fn element_count(&self) -> usize {
        ElementKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// Keys of one kind, in iteration (insertion) order.
    pub fn keys(&self, kind: ElementKind) -> Vec<ElementKey> {
        match kind {
            ElementKind::Lanelet => self.lanelets.keys().copied().collect(),
            ElementKind::TrafficSign => self.traffic_signs.keys().copied().collect(),
            ElementKind::TrafficLight => self.traffic_lights.keys().copied().collect(),
            ElementKind::Intersection => self.intersections.keys().copied().collect(),
        }
    }

    /// Handles of one kind, in iteration order.
    pub fn refs(&self, kind: ElementKind) -> Vec<ElementRef> {
        self.keys(kind)
            .into_iter()
            .map(|key| ElementRef { kind, key })
            .collect()
    }

    /// Every handle: lanelets, signs, lights, intersections, each in key order.
    pub fn all_refs(&self) -> Vec<ElementRef> {
        ElementKind::ALL
            .into_iter()
            .flat_map(|kind| self.refs(kind))
            .collect()
    }

    pub fn contains(&self, r: ElementRef) -> bool {
        self.id_of(r).is_some()
    }

    pub fn id_of(&self, r: ElementRef) -> Option<ElementId> {
        match r.kind {
            ElementKind::Lanelet => self.lanelets.get(&r.key).map(|e| e.id),
            ElementKind::TrafficSign => self.traffic_signs.get(&r.key).map(|e| e.id),
            ElementKind::TrafficLight => self.traffic_lights.get(&r.key).map(|e| e.id),
            ElementKind::Intersection => self.intersections.get(&r.key).map(|e| e.id),
        }
    }

    /// Owned copy of an element.
    pub fn element(&self, r: ElementRef) -> Option<Element> {
        match r.kind {
            ElementKind::Lanelet => self.lanelets.get(&r.key).cloned().map(Element::from),
            ElementKind::TrafficSign => self.traffic_signs.get(&r.key).cloned().map(Element::from),
            ElementKind::TrafficLight => {
                self.traffic_lights.get(&r.key).cloned().map(Element::from)
            }
            ElementKind::Intersection => {
                self.intersections.get(&r.key).cloned().map(Element::from)
            }
        }
    }

    /// Handles of every element (any kind) carrying `id`.
    pub fn refs_with_id(&self, id: ElementId) -> Vec<ElementRef> {
        let mut out = Vec::new();
        let tag = |kind: ElementKind, keys: Vec<ElementKey>| {
            keys.into_iter().map(move |key| ElementRef { kind, key })
        };
        out.extend(tag(ElementKind::Lanelet, self.lanelets_with_id(id)));
        out.extend(tag(ElementKind::TrafficSign, self.traffic_signs_with_id(id)));
        out.extend(tag(ElementKind::TrafficLight, self.traffic_lights_with_id(id)));
        out.extend(tag(ElementKind::Intersection, self.intersections_with_id(id)));
        out
    }

    pub fn has_local(&self, kind: ElementKind, id: ElementId) -> bool {
        match kind {
            ElementKind::Lanelet => self.lanelets.values().any(|e| e.id == id),
            ElementKind::TrafficSign => self.traffic_signs.values().any(|e| e.id == id),
            ElementKind::TrafficLight => self.traffic_lights.values().any(|e| e.id == id),
            ElementKind::Intersection => self.intersections.values().any(|e| e.id == id),
        }
    }

    /// True when `id` names an element of `kind` here or outside this network.
    pub fn resolves(&self, kind: ElementKind, id: ElementId) -> bool {
        self.external.contains(kind, id) || self.has_local(kind, id)
    }

    /// Ids of the lanelets and intersections holding a reference that
    /// resolves neither here nor externally.
    pub fn dangling_referrers(&self) -> BTreeSet<ElementId> {
        let mut known = self.external.clone();
        known.lanelets.extend(self.lanelets.values().map(|e| e.id));
        known.traffic_signs.extend(self.traffic_signs.values().map(|e| e.id));
        known.traffic_lights.extend(self.traffic_lights.values().map(|e| e.id));

        let mut referrers = BTreeSet::new();
        for l in self.lanelets.values() {
            let dangling = l.linked_lanelets().any(|id| !known.lanelets.contains(id))
                || l
                    .referenced_traffic_signs()
                    .any(|id| !known.traffic_signs.contains(id))
                || l
                    .referenced_traffic_lights()
                    .any(|id| !known.traffic_lights.contains(id));
            if dangling {
                referrers.insert(l.id);
            }
        }
        for i in self.intersections.values() {
            if i.lanelets().any(|id| !known.lanelets.contains(id)) {
                referrers.insert(i.id);
            }
        }
        referrers
    }

    pub fn external(&self) -> &ExternalIds {
        &self.external
    }

    pub fn external_mut(&mut self) -> &mut ExternalIds {
        &mut self.external
    }

    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    /// An id no element uses yet. Above the allocator's range this falls
    /// back to the smallest id not taken here or externally; `None` only
    /// when every id is taken.
    pub fn fresh_id(&self) -> Option<ElementId> {
        self.ids.fresh().or_else(|| self.smallest_unused_id())
    }

    fn smallest_unused_id(&self) -> Option<ElementId> {
        let mut used = RoaringBitmap::new();
        for kind in ElementKind::ALL {
            used |= self.external.of_kind(kind);
        }
        used.extend(self.lanelets.values().map(|e| e.id));
        used.extend(self.traffic_signs.values().map(|e| e.id));
        used.extend(self.traffic_lights.values().map(|e| e.id));
        used.extend(self.intersections.values().map(|e| e.id));

        let mut candidate: ElementId = 0;
        for id in &used {
            if id != candidate {
                break;
            }
            candidate = candidate.checked_add(1)?;
        }
        Some(candidate)
    }

    /// Give the element a fresh id. Returns the new id, or `None` when the
    /// element is missing or no id is left.
    pub fn reassign_id(&mut self, r: ElementRef) -> Option<ElementId> {
        if !self.contains(r) {
            return None;
        }
        let fresh = self.fresh_id()?;
        let slot = match r.kind {
            ElementKind::Lanelet => self.lanelets.get_mut(&r.key).map(|e| &mut e.id),
            ElementKind::TrafficSign => self.traffic_signs.get_mut(&r.key).map(|e| &mut e.id),
            ElementKind::TrafficLight => self.traffic_lights.get_mut(&r.key).map(|e| &mut e.id),
            ElementKind::Intersection => self.intersections.get_mut(&r.key).map(|e| &mut e.id),
        }?;
        *slot = fresh;
        Some(fresh)
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    /// Insert the edge `pred -> succ` in both directions.
    pub fn link_lanelets(&mut self, pred: ElementKey, succ: ElementKey) -> bool {
        let (Some(pred_id), Some(succ_id)) = (
            self.lanelets.get(&pred).map(|l| l.id),
            self.lanelets.get(&succ).map(|l| l.id),
        ) else {
            return false;
        };
        let mut changed = false;
        if let Some(l) = self.lanelets.get_mut(&pred) {
            changed |= l.successors.insert(succ_id);
        }
        if let Some(l) = self.lanelets.get_mut(&succ) {
            changed |= l.predecessors.insert(pred_id);
        }
        changed
    }

    /// Remove the edge `pred -> succ` in both directions.
    pub fn unlink_lanelets(&mut self, pred: ElementKey, succ: ElementKey) -> bool {
        let (Some(pred_id), Some(succ_id)) = (
            self.lanelets.get(&pred).map(|l| l.id),
            self.lanelets.get(&succ).map(|l| l.id),
        ) else {
            return false;
        };
        let mut changed = false;
        if let Some(l) = self.lanelets.get_mut(&pred) {
            changed |= l.successors.remove(&succ_id);
        }
        if let Some(l) = self.lanelets.get_mut(&succ) {
            changed |= l.predecessors.remove(&pred_id);
        }
        changed
    }

    /// Make `right` the right neighbour of `left` and, for same-direction
    /// neighbours, `left` the left neighbour of `right`.
    pub fn link_adjacent(&mut self, left: ElementKey, right: ElementKey, same_direction: bool) {
        use crate::element::Adjacency;
        let (Some(left_id), Some(right_id)) = (
            self.lanelets.get(&left).map(|l| l.id),
            self.lanelets.get(&right).map(|l| l.id),
        ) else {
            return;
        };
        if let Some(l) = self.lanelets.get_mut(&left) {
            l.adjacent_right = Some(Adjacency {
                id: right_id,
                same_direction,
            });
        }
        if let Some(r) = self.lanelets.get_mut(&right) {
            let back = Some(Adjacency {
                id: left_id,
                same_direction,
            });
            if same_direction {
                r.adjacent_left = back;
            } else {
                r.adjacent_right = back;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------------

    /// Remove a lanelet; references to its id are scrubbed from the remaining
    /// elements unless the id still resolves.
    pub fn remove_lanelet(&mut self, key: ElementKey) -> Option<Lanelet> {
        let removed = self.lanelets.remove(&key)?;
        let id = removed.id;
        if !self.resolves(ElementKind::Lanelet, id) {
            for l in self.lanelets.values_mut() {
                l.forget_lanelet(id);
            }
            for i in self.intersections.values_mut() {
                i.forget_lanelet(id);
            }
        }
        Some(removed)
    }

    pub fn remove_traffic_sign(&mut self, key: ElementKey) -> Option<TrafficSign> {
        let removed = self.traffic_signs.remove(&key)?;
        if !self.resolves(ElementKind::TrafficSign, removed.id) {
            for l in self.lanelets.values_mut() {
                l.forget_traffic_sign(removed.id);
            }
        }
        Some(removed)
    }

    pub fn remove_traffic_light(&mut self, key: ElementKey) -> Option<TrafficLight> {
        let removed = self.traffic_lights.remove(&key)?;
        if !self.resolves(ElementKind::TrafficLight, removed.id) {
            for l in self.lanelets.values_mut() {
                l.forget_traffic_light(removed.id);
            }
        }
        Some(removed)
    }

    pub fn remove_intersection(&mut self, key: ElementKey) -> Option<Intersection> {
        self.intersections.remove(&key)
    }

    // ------------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------------

    /// Independent copy: same keys and elements, separate id counter.
    pub fn deep_copy(&self) -> RoadNetwork {
        RoadNetwork {
            lanelets: self.lanelets.clone(),
            traffic_signs: self.traffic_signs.clone(),
            traffic_lights: self.traffic_lights.clone(),
            intersections: self.intersections.clone(),
            next_key: self.next_key,
            ids: self.ids.detached(),
            external: self.external.clone(),
        }
    }

    /// Deep copy of the elements in `scope`.
    ///
    /// Ids of every element left out are recorded as external, so references
    /// leaving the scope are not mistaken for dangling ones. The copy shares
    /// this network's id allocator.
    pub fn extract(&self, scope: &Scope) -> RoadNetwork {
        let mut external = self.external.clone();
        let mut sub = RoadNetwork {
            next_key: self.next_key,
            ids: self.ids.clone(),
            ..RoadNetwork::default()
        };

        for (key, l) in &self.lanelets {
            if scope.lanelets.contains(key) {
                sub.lanelets.insert(*key, l.clone());
            } else {
                external.lanelets.insert(l.id);
            }
        }
        for (key, s) in &self.traffic_signs {
            if scope.traffic_signs.contains(key) {
                sub.traffic_signs.insert(*key, s.clone());
            } else {
                external.traffic_signs.insert(s.id);
            }
        }
        for (key, t) in &self.traffic_lights {
            if scope.traffic_lights.contains(key) {
                sub.traffic_lights.insert(*key, t.clone());
            } else {
                external.traffic_lights.insert(t.id);
            }
        }
        for (key, i) in &self.intersections {
            if scope.intersections.contains(key) {
                sub.intersections.insert(*key, i.clone());
            } else {
                external.intersections.insert(i.id);
            }
        }

        sub.external = external;
        sub
    }

    /// Write a repaired copy of `scope` back into this network.
    ///
    /// Elements of the scope still present in `sub` replace their originals,
    /// missing ones are removed, and elements `sub` created are inserted under
    /// fresh keys. Nothing outside the scope is touched.
    pub fn merge_subnetwork(&mut self, scope: &Scope, sub: RoadNetwork) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let RoadNetwork {
            lanelets,
            traffic_signs,
            traffic_lights,
            intersections,
            ..
        } = sub;

        fn merge_store<T>(
            target: &mut BTreeMap<ElementKey, T>,
            scoped: &BTreeSet<ElementKey>,
            mut incoming: BTreeMap<ElementKey, T>,
            next_key: &mut u64,
            summary: &mut MergeSummary,
        ) {
            for key in scoped {
                match incoming.remove(key) {
                    Some(element) => {
                        if let Some(slot) = target.get_mut(key) {
                            *slot = element;
                            summary.replaced += 1;
                        }
                    }
                    None => {
                        if target.remove(key).is_some() {
                            summary.removed += 1;
                        }
                    }
                }
            }
            for (_, element) in incoming {
                let key = ElementKey::new(*next_key);
                *next_key += 1;
                target.insert(key, element);
                summary.inserted += 1;
            }
        }

        let mut next_key = self.next_key;
        merge_store(
            &mut self.lanelets,
            &scope.lanelets,
            lanelets,
            &mut next_key,
            &mut summary,
        );
        merge_store(
            &mut self.traffic_signs,
            &scope.traffic_signs,
            traffic_signs,
            &mut next_key,
            &mut summary,
        );
        merge_store(
            &mut self.traffic_lights,
            &scope.traffic_lights,
            traffic_lights,
            &mut next_key,
            &mut summary,
        );
        merge_store(
            &mut self.intersections,
            &scope.intersections,
            intersections,
            &mut next_key,
            &mut summary,
        );
        self.next_key = next_key;
        self.observe_all_ids();
        summary
    }

    fn observe_all_ids(&self) {
        for id in self
            .lanelets
            .values()
            .map(|e| e.id)
            .chain(self.traffic_signs.values().map(|e| e.id))
            .chain(self.traffic_lights.values().map(|e| e.id))
            .chain(self.intersections.values().map(|e| e.id))
        {
            self.ids.observe(id);
        }
    }

    // ------------------------------------------------------------------------
    // Document form
    // ------------------------------------------------------------------------

    pub fn from_document(doc: NetworkDocument) -> RoadNetwork {
        let mut network = RoadNetwork::new();
        for l in doc.lanelets {
            network.add_lanelet(l);
        }
        for s in doc.traffic_signs {
            network.add_traffic_sign(s);
        }
        for t in doc.traffic_lights {
            network.add_traffic_light(t);
        }
        for i in doc.intersections {
            network.add_intersection(i);
        }
        network
    }

    pub fn to_document(&self) -> NetworkDocument {
        NetworkDocument {
            lanelets: self.lanelets.values().cloned().collect(),
            traffic_signs: self.traffic_signs.values().cloned().collect(),
            traffic_lights: self.traffic_lights.values().cloned().collect(),
            intersections: self.intersections.values().cloned().collect(),
        }
    }
}

/// Serializable form of a network, as exchanged with converters and tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default)]
    pub lanelets: Vec<Lanelet>,
    #[serde(default)]
    pub traffic_signs: Vec<TrafficSign>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLight>,
    #[serde(default)]
    pub intersections: Vec<Intersection>,
}

impl From<NetworkDocument> for RoadNetwork {
    fn from(doc: NetworkDocument) -> Self {
        RoadNetwork::from_document(doc)
    }
}
