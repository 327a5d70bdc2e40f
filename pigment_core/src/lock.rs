// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted scoped locks.
//!
//! The engine suppresses two kinds of host behavior while it works: the
//! override sheet is disabled for the length of a render batch, and mutation
//! observation is suspended around every write the engine makes. Both can
//! nest (a batch contains many writes, a write may happen while the sheet is
//! already disabled), so each is a counter rather than a flag. The host is
//! told only about the outermost acquire and the matching last release.

use core::fmt;
use core::ops::{Deref, DerefMut};
use std::cell::Cell;
use std::rc::Rc;

use crate::host::Host;

/// A nestable lock. Cloning yields another handle to the same counter.
#[derive(Clone, Default)]
pub struct ScopedLock {
    depth: Rc<Cell<u32>>,
}

impl fmt::Debug for ScopedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedLock")
            .field("depth", &self.depth.get())
            .finish()
    }
}

impl ScopedLock {
    /// Creates a released lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires one level. The level is released when the guard drops.
    #[must_use = "the lock is released as soon as the guard is dropped"]
    pub fn acquire(&self) -> LockGuard {
        let depth = self.depth.get();
        self.depth.set(depth + 1);
        LockGuard {
            depth: Rc::clone(&self.depth),
            outermost: depth == 0,
        }
    }

    /// Whether any guard is alive.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.depth.get() > 0
    }

    /// Number of live guards.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }
}

/// One acquired level of a [`ScopedLock`].
pub struct LockGuard {
    depth: Rc<Cell<u32>>,
    outermost: bool,
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("depth", &self.depth.get())
            .field("outermost", &self.outermost)
            .finish()
    }
}

impl LockGuard {
    /// Whether this guard took the lock from released to held.
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Host behavior a [`HostScope`] switches off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Suppress {
    /// The override sheet, so computed reads see authored values only.
    OverrideSurface,
    /// Mutation observation, so the engine's writes are not reported back.
    Observation,
}

impl Suppress {
    fn apply<H: Host>(self, host: &mut H, engaged: bool) {
        match self {
            Self::OverrideSurface => host.set_override_surface_enabled(!engaged),
            Self::Observation => host.set_observation_suspended(engaged),
        }
    }
}

/// A host borrow that holds one level of a [`ScopedLock`].
///
/// The outermost scope switches the host behavior off on creation and back on
/// when dropped, including on early return.
pub(crate) struct HostScope<'h, H: Host> {
    host: &'h mut H,
    guard: LockGuard,
    what: Suppress,
}

impl<'h, H: Host> HostScope<'h, H> {
    pub(crate) fn new(host: &'h mut H, lock: &ScopedLock, what: Suppress) -> Self {
        let guard = lock.acquire();
        if guard.is_outermost() {
            what.apply(host, true);
        }
        Self { host, guard, what }
    }
}

impl<H: Host> Deref for HostScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: Host> DerefMut for HostScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: Host> Drop for HostScope<'_, H> {
    fn drop(&mut self) {
        if self.guard.is_outermost() {
            self.what.apply(self.host, false);
        }
    }
}

impl<H: Host> fmt::Debug for HostScope<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostScope")
            .field("guard", &self.guard)
            .field("what", &self.what)
            .finish_non_exhaustive()
    }
}
