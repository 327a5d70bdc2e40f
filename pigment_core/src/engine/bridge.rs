// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host notifications: tree mutations and size changes.
//!
//! Every write the engine makes is bracketed by an observation lock, so the
//! records delivered here only ever describe changes made by someone else.
//! Handlers only enqueue; nothing is rendered until the next drain.

use super::{Engine, subtree};
use crate::host::{Host, MutationRecord, ResizeEntry};
use crate::lock::{HostScope, Suppress};
use crate::target::Invalidation;

impl<H: Host> Engine<H> {
    /// Handles a batch of mutation records.
    ///
    /// - Inserted subtrees are walked and every element is queued. Inserted
    ///   sheet owners queue a rescan instead.
    /// - Removed subtrees release their size subscriptions.
    /// - A stripped tracking attribute is restored. Any other attribute change
    ///   queues the element and its descendants with their geometry
    ///   discarded.
    pub fn on_mutations(&mut self, host: &mut H, records: &[MutationRecord<H::Node>]) {
        for record in records {
            match record {
                MutationRecord::ChildList { added, removed } => {
                    for node in added {
                        if let Some(surface) = host.surface_owned_by(node) {
                            self.surface_available(host, &surface);
                            continue;
                        }
                        for element in subtree(&*host, node) {
                            self.notify_possible_change(host, &element, false);
                        }
                    }
                    for node in removed {
                        if let Some(surface) = host.surface_owned_by(node) {
                            self.surface_available(host, &surface);
                            continue;
                        }
                        self.release_subtree(host, node);
                    }
                }
                MutationRecord::Attributes { target, name, .. } => {
                    if name == self.config.tracking_attribute && self.restore_tracking(host, target) {
                        continue;
                    }
                    for element in subtree(&*host, target) {
                        let id = self.targets.get_or_insert(&element);
                        self.enqueue(host, id, Some(Invalidation::Geometry));
                    }
                }
            }
        }
    }

    /// Handles size notifications from continuous subscriptions.
    pub fn on_resize(&mut self, host: &mut H, entries: &[ResizeEntry<H::Node>]) {
        for entry in entries {
            let Some(id) = self.targets.id_of(&entry.node) else {
                continue;
            };
            let size = entry.resolved_border_box();
            tracing::trace!(id = %id, width = size.width, height = size.height, "resized");
            self.targets.set_size(id, size);
            self.targets.set_live(id, true);
            self.enqueue(host, id, Some(Invalidation::Dependencies));
        }
    }

    /// Ends the size subscriptions held for `root` and its descendants.
    fn release_subtree(&mut self, host: &mut H, root: &H::Node) {
        for node in subtree(&*host, root) {
            let Some(id) = self.targets.id_of(&node) else {
                continue;
            };
            if self.targets.geometry(id).live {
                host.unobserve_size(&node);
                self.targets.set_live(id, false);
            }
        }
    }

    /// Rewrites the tracking attribute if something other than the engine
    /// changed it on a target that has an override rule. Returns whether the
    /// record is fully handled.
    fn restore_tracking(&mut self, host: &mut H, node: &H::Node) -> bool {
        let Some(id) = self.targets.id_of(node) else {
            return false;
        };
        if self.targets.override_rule(id).is_none() {
            return false;
        }
        let attribute = self.config.tracking_attribute;
        let expected = id.tracking_value().to_string();
        if host.attribute(node, attribute).as_deref() != Some(expected.as_str()) {
            tracing::debug!(id = %id, "restoring stripped tracking attribute");
            let mut scope = HostScope::new(host, &self.observation_lock, Suppress::Observation);
            scope.set_attribute(node, attribute, &expected);
        }
        true
    }
}
