// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation queue and drain scheduling.
//!
//! The queue holds two kinds of entries: targets waiting to be re-evaluated
//! and newly available sheets waiting to be scanned. Targets are
//! deduplicated by their `pending` flag in the
//! [`TargetStore`](crate::target::TargetStore); sheets by equality.
//!
//! Draining separates the two. Sheets come out first, in arrival order.
//! Targets come out **last in, first out**, so the element mutated most
//! recently is painted first.
//!
//! At most one drain is outstanding at a time: the first entry pushed into an
//! idle queue requests a tick from the host, and further pushes ride along
//! until that tick arrives.

use std::time::Duration;

use crate::host::{Tick, TickSource};
use crate::id::TargetId;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry<S> {
    Target(TargetId),
    Surface(S),
}

/// Entries removed from the queue by [`InvalidationQueue::take_batch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch<S> {
    /// Sheets to scan, oldest first.
    pub surfaces: Vec<S>,
    /// Targets to evaluate, newest first.
    pub targets: Vec<TargetId>,
}

/// Pending targets and sheets.
#[derive(Clone, Debug)]
pub struct InvalidationQueue<S> {
    entries: Vec<Entry<S>>,
    scheduled: bool,
}

impl<S> Default for InvalidationQueue<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            scheduled: false,
        }
    }
}

impl<S: PartialEq> InvalidationQueue<S> {
    /// Creates an empty, idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a target. The caller guarantees it is not already queued.
    pub fn push_target(&mut self, id: TargetId) {
        self.entries.push(Entry::Target(id));
    }

    /// Appends a sheet unless it is already queued. Returns whether it was
    /// added.
    pub fn push_surface(&mut self, surface: S) -> bool {
        let entry = Entry::Surface(surface);
        if self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Requests a drain from `ticks` unless one is already outstanding.
    ///
    /// Uses a microtask when the host has them, else a zero-delay timer.
    pub fn schedule<T: TickSource + ?Sized>(&mut self, ticks: &mut T) {
        if self.scheduled {
            return;
        }
        self.scheduled = true;
        ticks.request_tick(if ticks.supports_microtasks() {
            Tick::Microtask
        } else {
            Tick::Timer(Duration::ZERO)
        });
    }

    /// Marks the outstanding drain as delivered.
    pub fn tick_delivered(&mut self) {
        self.scheduled = false;
    }

    /// Whether a drain has been requested and not yet delivered.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Removes every entry. Sheets keep arrival order, targets are reversed.
    pub fn take_batch(&mut self) -> Batch<S> {
        let mut batch = Batch {
            surfaces: Vec::new(),
            targets: Vec::new(),
        };
        for entry in self.entries.drain(..).rev() {
            match entry {
                Entry::Target(id) => batch.targets.push(id),
                Entry::Surface(s) => batch.surfaces.push(s),
            }
        }
        batch.surfaces.reverse();
        batch
    }

    /// Removes only the queued sheets, in arrival order.
    pub fn take_surfaces(&mut self) -> Vec<S> {
        let mut surfaces = Vec::new();
        let entries = core::mem::take(&mut self.entries);
        for entry in entries {
            match entry {
                Entry::Surface(s) => surfaces.push(s),
                target @ Entry::Target(_) => self.entries.push(target),
            }
        }
        surfaces
    }

    /// Whether any sheet is queued.
    #[must_use]
    pub fn has_surfaces(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Surface(_)))
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ticks {
        requested: Vec<Tick>,
        microtasks: bool,
    }

    impl TickSource for Ticks {
        fn request_tick(&mut self, tick: Tick) {
            self.requested.push(tick);
        }

        fn supports_microtasks(&self) -> bool {
            self.microtasks
        }
    }

    #[test]
    fn targets_drain_lifo_after_surfaces() {
        let mut queue = InvalidationQueue::new();
        queue.push_target(TargetId(0));
        queue.push_surface("s1");
        queue.push_target(TargetId(1));
        queue.push_surface("s2");
        queue.push_target(TargetId(2));
        let batch = queue.take_batch();
        assert_eq!(batch.surfaces, ["s1", "s2"]);
        assert_eq!(batch.targets, [TargetId(2), TargetId(1), TargetId(0)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn surfaces_are_deduplicated() {
        let mut queue = InvalidationQueue::new();
        assert!(queue.push_surface("s"));
        assert!(!queue.push_surface("s"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn take_surfaces_leaves_targets_in_order() {
        let mut queue = InvalidationQueue::new();
        queue.push_target(TargetId(0));
        queue.push_surface("s");
        queue.push_target(TargetId(1));
        assert!(queue.has_surfaces());
        assert_eq!(queue.take_surfaces(), ["s"]);
        assert!(!queue.has_surfaces());
        assert_eq!(queue.take_batch().targets, [TargetId(1), TargetId(0)]);
    }

    #[test]
    fn one_outstanding_tick() {
        let mut ticks = Ticks {
            microtasks: true,
            ..Ticks::default()
        };
        let mut queue = InvalidationQueue::<&str>::new();
        queue.schedule(&mut ticks);
        queue.schedule(&mut ticks);
        assert_eq!(ticks.requested, [Tick::Microtask]);
        queue.tick_delivered();
        queue.schedule(&mut ticks);
        assert_eq!(ticks.requested.len(), 2);
    }

    #[test]
    fn falls_back_to_timer_without_microtasks() {
        let mut ticks = Ticks::default();
        let mut queue = InvalidationQueue::<&str>::new();
        queue.schedule(&mut ticks);
        assert_eq!(ticks.requested, [Tick::Timer(Duration::ZERO)]);
    }
}
