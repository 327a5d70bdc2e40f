// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine context.
//!
//! [`Engine`] owns every piece of engine state: the procedure and property
//! registries, the rule tracker, the target store and the invalidation queue.
//! Nothing is global, so independent engines can share a thread.
//!
//! The host drives it:
//!
//! - [`start`](Engine::start) queues every sheet and element once;
//! - [`drain`](Engine::drain) answers each tick the engine requested;
//! - [`on_mutations`](Engine::on_mutations), [`on_resize`](Engine::on_resize),
//!   [`surface_available`](Engine::surface_available) and
//!   [`images_ready`](Engine::images_ready) forward host notifications;
//! - [`notify_possible_change`](Engine::notify_possible_change) and
//!   [`process_selector`](Engine::process_selector) are explicit triggers.
//!
//! A drain either rescans sheets or renders targets, never both. When sheets
//! are queued they are scanned first and the drain reschedules itself, so
//! targets re-queued by the scan are rendered on the next tick.

mod bridge;
mod render;

use core::fmt;
use std::collections::HashMap;
use std::time::Instant;

use crate::config::{EngineConfig, RegistrationPolicy};
use crate::error::{ModuleError, PropertyError, RegistryError};
use crate::host::{Document, Host, Tick};
use crate::id::TargetId;
use crate::lock::{HostScope, ScopedLock, Suppress};
use crate::properties::{PropertyCache, PropertyDefinition, PropertyRegistry};
use crate::queue::InvalidationQueue;
use crate::registry::{PaintDefinition, Registration, Registry};
use crate::rules::{RuleTracker, SurfaceInput};
use crate::syntax::has_paint;
use crate::target::{Invalidation, TargetStore};
use crate::trace::{DrainEvent, ScanEvent, SkipReason, SurfaceSkippedEvent, TraceSink, Tracer};
use crate::worklet::{ScriptRealm, WorkletScope};

/// An override write waiting for its resources to load.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DeferredWrite {
    target: TargetId,
    property: String,
    value: String,
}

/// The paint engine for one host.
pub struct Engine<H: Host> {
    config: EngineConfig,
    registry: Registry,
    properties: PropertyRegistry,
    rules: RuleTracker<H::Surface, H::Rule>,
    targets: TargetStore<H::Node, H::OverrideRule>,
    queue: InvalidationQueue<H::Surface>,
    override_lock: ScopedLock,
    observation_lock: ScopedLock,
    deferred: HashMap<u64, DeferredWrite>,
    property_cache: PropertyCache,
    import_retry: Option<Instant>,
    trace: Option<Box<dyn TraceSink>>,
}

impl<H: Host> fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("tracked_rules", &self.rules.len())
            .field("targets", &self.targets.len())
            .field("queued", &self.queue.len())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl<H: Host> Default for Engine<H> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Builds a tracer over the engine's optional sink.
fn tracer(sink: &mut Option<Box<dyn TraceSink>>) -> Tracer<'_> {
    Tracer::new(sink.as_mut().map(|s| &mut **s as &mut dyn TraceSink))
}

/// Clamps a count into a trace field.
fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Collects `root` and its descendants in tree order, without entering
/// foreign islands.
fn subtree<D: Document + ?Sized>(host: &D, root: &D::Node) -> Vec<D::Node> {
    let mut nodes = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if !host.is_foreign_island(&node) {
            stack.extend(host.children(&node).into_iter().rev());
        }
        nodes.push(node);
    }
    nodes
}

impl<H: Host> Engine<H> {
    /// Creates an idle engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            properties: PropertyRegistry::new(),
            rules: RuleTracker::new(),
            targets: TargetStore::new(),
            queue: InvalidationQueue::new(),
            override_lock: ScopedLock::new(),
            observation_lock: ScopedLock::new(),
            deferred: HashMap::new(),
            property_cache: PropertyCache::new(),
            import_retry: None,
            trace: None,
        }
    }

    /// The configuration the engine was created with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Routes structured diagnostics to `sink`.
    ///
    /// Events are only emitted when the `trace` feature is enabled.
    pub fn set_trace_sink(&mut self, sink: impl TraceSink + 'static) {
        self.trace = Some(Box::new(sink));
    }

    // -- Registration --

    /// Registers a paint procedure.
    ///
    /// Targets whose output referenced `definition.name()`, or that were
    /// waiting for it, are re-queued with their geometry kept.
    pub fn register_paint(
        &mut self,
        host: &mut H,
        definition: PaintDefinition,
    ) -> Result<Registration, RegistryError> {
        let name = definition.name().to_owned();
        let registration = match self.registry.register(definition, self.config.registration) {
            Ok(registration) => registration,
            Err(err) => {
                if self.config.registration == RegistrationPolicy::Reject {
                    tracing::warn!(%err, "paint procedure registration rejected");
                }
                return Err(err);
            }
        };
        let affected = self.targets.referencing(&name);
        tracing::debug!(
            name = %name,
            ?registration,
            affected = affected.len(),
            "registered paint procedure"
        );
        for id in affected {
            self.enqueue(host, id, Some(Invalidation::Dependencies));
        }
        Ok(registration)
    }

    /// Registers a custom property for typed, inheritance-aware reads.
    pub fn register_property(&mut self, definition: PropertyDefinition) -> Result<(), PropertyError> {
        let name = definition.name.clone();
        self.properties.register(definition)?;
        tracing::debug!(name = %name, "registered custom property");
        Ok(())
    }

    /// Evaluates a procedure module and registers what it defines.
    ///
    /// Returns the number of procedures registered. If evaluation fails,
    /// nothing from this module is registered.
    pub fn add_module<R: ScriptRealm + ?Sized>(
        &mut self,
        host: &mut H,
        realm: &mut R,
        source: &str,
    ) -> Result<usize, ModuleError> {
        let mut scope = WorkletScope::new(host.device_pixel_ratio());
        realm.evaluate(source, &mut scope)?;
        let definitions = scope.into_registrations();
        let loaded = definitions.len();
        for definition in definitions {
            self.register_paint(host, definition)?;
        }
        tracing::debug!(loaded, "loaded procedure module");
        Ok(loaded)
    }

    // -- Triggers --

    /// Queues every sheet and every element of the host tree.
    pub fn start(&mut self, host: &mut H) {
        for surface in host.surfaces() {
            if !host.is_override_surface(&surface) && self.queue.push_surface(surface) {
                self.queue.schedule(host);
            }
        }
        let root = host.root();
        for node in subtree(&*host, &root) {
            self.notify_possible_change(host, &node, false);
        }
    }

    /// Queues `node` for re-evaluation.
    ///
    /// With `force`, its dependency baseline and (unless a subscription keeps
    /// it fresh) its geometry are discarded, so it is rendered regardless.
    pub fn notify_possible_change(&mut self, host: &mut H, node: &H::Node, force: bool) {
        let id = self.targets.get_or_insert(node);
        self.enqueue(host, id, force.then_some(Invalidation::All));
    }

    /// Queues every element matching `selector`.
    pub fn process_selector(&mut self, host: &mut H, selector: &str, force: bool) {
        for node in host.query_selector_all(selector) {
            self.notify_possible_change(host, &node, force);
        }
    }

    /// Reports that `surface` was added, finished loading or was edited.
    pub fn surface_available(&mut self, host: &mut H, surface: &H::Surface) {
        if host.is_override_surface(surface) {
            return;
        }
        if self.queue.push_surface(surface.clone()) {
            self.queue.schedule(host);
        }
    }

    fn enqueue(&mut self, host: &mut H, id: TargetId, invalidate: Option<Invalidation>) {
        if let Some(how) = invalidate {
            self.targets.invalidate(id, how);
        }
        if self.targets.is_pending(id) {
            return;
        }
        self.targets.set_pending(id, true);
        self.queue.push_target(id);
        self.queue.schedule(host);
    }

    // -- Drain --

    /// Processes the queue. Call once for every tick the engine requested.
    pub fn drain(&mut self, host: &mut H) {
        self.queue.tick_delivered();

        let retry_due = self.import_retry.is_some_and(|at| host.now() >= at);
        if self.queue.has_surfaces() || retry_due {
            let surfaces = self.queue.take_surfaces();
            self.import_retry = None;
            self.rescan(host);
            if !self.queue.is_empty() {
                self.queue.schedule(host);
            }
            tracer(&mut self.trace).drain(&DrainEvent {
                surfaces: count(surfaces.len()),
                targets: 0,
                rendered: 0,
                skipped: 0,
            });
            return;
        }

        let batch = self.queue.take_batch();
        let dequeued = batch.targets.len();
        let mut live = Vec::with_capacity(dequeued);
        for id in batch.targets {
            self.targets.set_pending(id, false);
            if host.is_connected(self.targets.node(id)) {
                live.push(id);
            }
        }

        let mut rendered = 0;
        if !live.is_empty() {
            let mut scope = HostScope::new(host, &self.override_lock, Suppress::OverrideSurface);
            for &id in &live {
                if self.needs_render(&scope, id) {
                    self.render(&mut scope, id);
                    rendered += 1;
                } else {
                    tracing::trace!(id = %id, "dependencies unchanged; skipped");
                }
            }
        }

        tracing::debug!(dequeued, rendered, "drained targets");
        tracer(&mut self.trace).drain(&DrainEvent {
            surfaces: 0,
            targets: count(dequeued),
            rendered,
            skipped: count(dequeued) - rendered,
        });
    }

    /// Rescans every sheet and re-queues the targets the scan affects.
    fn rescan(&mut self, host: &mut H) {
        let inputs: Vec<SurfaceInput<H::Surface, H::Rule>> = host
            .surfaces()
            .into_iter()
            .filter(|s| !host.is_override_surface(s) && !self.rules.is_unreadable(s))
            .map(|surface| SurfaceInput {
                contents: host.surface_contents(&surface),
                surface,
            })
            .collect();
        let now = host.now();
        let outcome = self.rules.scan(inputs, now, self.config.import_wait);

        for surface in &outcome.unreadable {
            tracing::warn!(surface = surface.0, "style sheet is unreadable; skipping it");
            tracer(&mut self.trace).surface_skipped(&SurfaceSkippedEvent {
                surface: *surface,
                reason: SkipReason::Unreadable,
            });
        }
        if let Some(wait) = outcome.retry_after {
            tracing::debug!(?wait, "style sheet awaiting imports");
            self.import_retry = Some(now + wait);
            host.request_tick(Tick::Timer(wait));
        }
        if !outcome.rewrites.is_empty() {
            let mut scope = HostScope::new(host, &self.observation_lock, Suppress::Observation);
            for (rule, text) in &outcome.rewrites {
                scope.rewrite_rule(rule, text);
            }
        }

        tracing::debug!(
            scanned = outcome.scanned,
            changed = outcome.changed_selectors.len(),
            removed = outcome.removed.len(),
            tracked = self.rules.len(),
            "scanned style sheets"
        );
        tracer(&mut self.trace).scan(&ScanEvent {
            scanned: count(outcome.scanned),
            pending: count(outcome.pending),
            changed: count(outcome.changed_selectors.len()),
            removed: count(outcome.removed.len()),
            new_paint_surface: outcome.new_paint_surface,
        });

        if outcome.new_paint_surface {
            // Any previously unmatched target may now resolve a procedure.
            if let Some(selectors) = self.rules.tracked_selector_list() {
                self.process_selector(host, &selectors, false);
            }
            let painted: Vec<TargetId> = self
                .targets
                .ids()
                .filter(|id| self.targets.override_rule(*id).is_some())
                .collect();
            for id in painted {
                self.enqueue(host, id, None);
            }
        } else if let Some(selectors) = outcome.requery_selector() {
            self.process_selector(host, &selectors, false);
        }
    }

    /// Whether a dequeued target has to be rendered.
    ///
    /// Targets with a baseline render only when a recorded value changed, or
    /// when their geometry was discarded without a subscription and the box
    /// no longer matches the one last painted. Without a baseline they render
    /// if they carry an override or any paintable property mentions a
    /// procedure.
    fn needs_render(&self, host: &H, id: TargetId) -> bool {
        let node = self.targets.node(id);
        let geometry = self.targets.geometry(id);
        if geometry.size.is_none()
            && !geometry.live
            && geometry
                .rendered
                .is_some_and(|painted| host.border_box(node) != painted)
        {
            return true;
        }
        match self.targets.baseline(id) {
            Some(baseline) => baseline
                .iter()
                .any(|(name, value)| self.properties.resolve(host, node, name) != *value),
            None => {
                self.targets.override_rule(id).is_some()
                    || self
                        .config
                        .paintable_properties
                        .iter()
                        .any(|property| has_paint(&host.computed_value(node, property)))
            }
        }
    }

    // -- Inspection --

    /// The target assigned to `node`, if it has been involved.
    #[must_use]
    pub fn target_of(&self, node: &H::Node) -> Option<TargetId> {
        self.targets.id_of(node)
    }

    /// Per-target state.
    #[must_use]
    pub fn targets(&self) -> &TargetStore<H::Node, H::OverrideRule> {
        &self.targets
    }

    /// Tracked rules.
    #[must_use]
    pub fn rules(&self) -> &RuleTracker<H::Surface, H::Rule> {
        &self.rules
    }

    /// Registered procedures.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of override writes waiting for resources to load.
    #[must_use]
    pub fn deferred_writes(&self) -> usize {
        self.deferred.len()
    }

    /// Whether nothing is queued or scheduled.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.queue.is_scheduled() && self.import_retry.is_none()
    }
}
