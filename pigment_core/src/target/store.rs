// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays target storage.

use core::hash::Hash;
use std::collections::{BTreeMap, HashMap};

use kurbo::Size;

use crate::id::TargetId;
use crate::raster::RasterSurface;

/// Cached border-box geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TargetGeometry {
    /// Last known border-box size, or `None` when it must be queried.
    pub size: Option<Size>,
    /// Whether a continuous size subscription keeps `size` fresh.
    pub live: bool,
    /// The size the last render painted at. Survives invalidation.
    pub rendered: Option<Size>,
}

/// What the engine last wrote for one property of one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaintedProperty {
    /// The substituted value.
    pub value: String,
    /// Accompanying declarations written alongside it, by name.
    pub side_effects: BTreeMap<String, String>,
    /// Procedures the value references.
    pub references: Vec<String>,
    /// Revocable URLs embedded in the value.
    pub revocable: Vec<String>,
}

/// How much cached state [`TargetStore::invalidate`] discards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// Only geometry, unless a subscription keeps it fresh.
    Geometry,
    /// Only the dependency baseline, so the next wake-up renders.
    Dependencies,
    /// The baseline and, unless a subscription keeps it fresh, geometry.
    All,
}

/// Struct-of-arrays storage for all targets.
///
/// Targets are addressed by [`TargetId`]. Slots are never freed: a node keeps
/// its identity for the lifetime of the store even after it leaves the tree.
pub struct TargetStore<N, O> {
    // -- Identity --
    nodes: Vec<N>,
    index: HashMap<N, u32>,

    // -- Scheduling --
    pending: Vec<bool>,

    // -- Cached inputs --
    geometry: Vec<TargetGeometry>,
    baseline: Vec<Option<Vec<(String, String)>>>,

    // -- Outputs --
    override_rule: Vec<Option<O>>,
    rasters: Vec<HashMap<String, Box<dyn RasterSurface>>>,
    painted: Vec<BTreeMap<String, PaintedProperty>>,
    unresolved: Vec<Vec<String>>,
}

impl<N: core::fmt::Debug, O: core::fmt::Debug> core::fmt::Debug for TargetStore<N, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TargetStore")
            .field("len", &self.nodes.len())
            .field("pending", &self.pending.iter().filter(|p| **p).count())
            .finish_non_exhaustive()
    }
}

impl<N, O> Default for TargetStore<N, O> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            pending: Vec::new(),
            geometry: Vec::new(),
            baseline: Vec::new(),
            override_rule: Vec::new(),
            rasters: Vec::new(),
            painted: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

impl<N: Clone + Eq + Hash, O> TargetStore<N, O> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Identity --

    /// Returns the target for `node`, allocating a slot on first involvement.
    pub fn get_or_insert(&mut self, node: &N) -> TargetId {
        if let Some(idx) = self.index.get(node) {
            return TargetId(*idx);
        }
        let idx = u32::try_from(self.nodes.len())
            .unwrap_or_else(|_| panic!("target store is full"));
        self.nodes.push(node.clone());
        self.index.insert(node.clone(), idx);
        self.pending.push(false);
        self.geometry.push(TargetGeometry::default());
        self.baseline.push(None);
        self.override_rule.push(None);
        self.rasters.push(HashMap::new());
        self.painted.push(BTreeMap::new());
        self.unresolved.push(Vec::new());
        TargetId(idx)
    }

    /// Returns the target for `node` if it has one.
    #[must_use]
    pub fn id_of(&self, node: &N) -> Option<TargetId> {
        self.index.get(node).map(|idx| TargetId(*idx))
    }

    /// Returns the node of a target.
    #[must_use]
    pub fn node(&self, id: TargetId) -> &N {
        self.validate(id);
        &self.nodes[id.0 as usize]
    }

    /// Iterates over every target in allocation order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "get_or_insert keeps the slot count within u32"
    )]
    pub fn ids(&self) -> impl Iterator<Item = TargetId> + use<N, O> {
        let len = self.nodes.len() as u32;
        (0..len).map(TargetId)
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no target exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -- Scheduling --

    /// Whether the target is queued.
    #[must_use]
    pub fn is_pending(&self, id: TargetId) -> bool {
        self.validate(id);
        self.pending[id.0 as usize]
    }

    /// Sets the queued flag.
    pub fn set_pending(&mut self, id: TargetId, pending: bool) {
        self.validate(id);
        self.pending[id.0 as usize] = pending;
    }

    /// Discards cached inputs.
    pub fn invalidate(&mut self, id: TargetId, how: Invalidation) {
        self.validate(id);
        let idx = id.0 as usize;
        if how != Invalidation::Geometry {
            self.baseline[idx] = None;
        }
        if how != Invalidation::Dependencies && !self.geometry[idx].live {
            self.geometry[idx].size = None;
        }
    }

    // -- Cached inputs --

    /// Returns cached geometry.
    #[must_use]
    pub fn geometry(&self, id: TargetId) -> TargetGeometry {
        self.validate(id);
        self.geometry[id.0 as usize]
    }

    /// Stores a freshly measured border-box size.
    pub fn set_size(&mut self, id: TargetId, size: Size) {
        self.validate(id);
        self.geometry[id.0 as usize].size = Some(size);
    }

    /// Records the size a render just painted at.
    pub fn set_rendered_size(&mut self, id: TargetId, size: Size) {
        self.validate(id);
        self.geometry[id.0 as usize].rendered = Some(size);
    }

    /// Marks whether a continuous size subscription is held.
    pub fn set_live(&mut self, id: TargetId, live: bool) {
        self.validate(id);
        self.geometry[id.0 as usize].live = live;
    }

    /// Returns the dependency baseline, if the target has one.
    #[must_use]
    pub fn baseline(&self, id: TargetId) -> Option<&[(String, String)]> {
        self.validate(id);
        self.baseline[id.0 as usize].as_deref()
    }

    /// Replaces the dependency baseline. An empty baseline is stored as none.
    pub fn set_baseline(&mut self, id: TargetId, baseline: Vec<(String, String)>) {
        self.validate(id);
        self.baseline[id.0 as usize] = (!baseline.is_empty()).then_some(baseline);
    }

    // -- Outputs --

    /// Returns the override rule, if one was created.
    #[must_use]
    pub fn override_rule(&self, id: TargetId) -> Option<&O> {
        self.validate(id);
        self.override_rule[id.0 as usize].as_ref()
    }

    /// Records the override rule. Each target gets at most one.
    pub fn set_override_rule(&mut self, id: TargetId, rule: O) {
        self.validate(id);
        let slot = &mut self.override_rule[id.0 as usize];
        assert!(slot.is_none(), "{id:?} already has an override rule");
        *slot = Some(rule);
    }

    /// Returns the raster surface a procedure renders into for this target.
    pub fn raster_mut(&mut self, id: TargetId, procedure: &str) -> Option<&mut dyn RasterSurface> {
        self.validate(id);
        self.rasters[id.0 as usize]
            .get_mut(procedure)
            .map(|surface| &mut **surface as &mut dyn RasterSurface)
    }

    /// Stores a raster surface, replacing any earlier one for `procedure`.
    pub fn insert_raster(
        &mut self,
        id: TargetId,
        procedure: &str,
        surface: Box<dyn RasterSurface>,
    ) -> &mut dyn RasterSurface {
        self.validate(id);
        let slot = self.rasters[id.0 as usize]
            .entry(procedure.to_owned())
            .insert_entry(surface)
            .into_mut();
        &mut **slot
    }

    /// Drops raster surfaces of procedures not in `keep`.
    pub fn retain_rasters(&mut self, id: TargetId, keep: &[String]) {
        self.validate(id);
        self.rasters[id.0 as usize].retain(|name, _| keep.iter().any(|k| k == name));
    }

    /// Number of raster surfaces held by the target.
    #[must_use]
    pub fn raster_count(&self, id: TargetId) -> usize {
        self.validate(id);
        self.rasters[id.0 as usize].len()
    }

    /// Returns what was last written per property.
    #[must_use]
    pub fn painted(&self, id: TargetId) -> &BTreeMap<String, PaintedProperty> {
        self.validate(id);
        &self.painted[id.0 as usize]
    }

    /// Mutable access to the per-property write record.
    pub fn painted_mut(&mut self, id: TargetId) -> &mut BTreeMap<String, PaintedProperty> {
        self.validate(id);
        &mut self.painted[id.0 as usize]
    }

    /// Procedure names the last render could not resolve.
    #[must_use]
    pub fn unresolved(&self, id: TargetId) -> &[String] {
        self.validate(id);
        &self.unresolved[id.0 as usize]
    }

    /// Replaces the unresolved name list.
    pub fn set_unresolved(&mut self, id: TargetId, names: Vec<String>) {
        self.validate(id);
        self.unresolved[id.0 as usize] = names;
    }

    /// Targets whose output references `procedure` or that are waiting for it
    /// to be registered.
    #[must_use]
    pub fn referencing(&self, procedure: &str) -> Vec<TargetId> {
        self.ids()
            .filter(|id| {
                let idx = id.0 as usize;
                self.unresolved[idx].iter().any(|n| n == procedure)
                    || self.painted[idx]
                        .values()
                        .any(|p| p.references.iter().any(|n| n == procedure))
            })
            .collect()
    }

    // -- Internal helpers --

    /// Panics if the handle did not come from this store.
    fn validate(&self, id: TargetId) {
        assert!(
            (id.0 as usize) < self.nodes.len(),
            "unknown TargetId: {id:?} (store has {} targets)",
            self.nodes.len()
        );
    }
}
