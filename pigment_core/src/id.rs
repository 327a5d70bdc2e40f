// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target, surface and rule identity types.

use core::fmt;

/// A handle to a target in a [`TargetStore`](crate::target::TargetStore).
///
/// Identities are assigned once, in order of first involvement, and are never
/// reused for a different node. The numeric value doubles as the value of the
/// tracking attribute the engine writes onto the target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub(crate) u32);

impl TargetId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the value written into the tracking attribute.
    ///
    /// Slot indices start at zero, tracking values start at one.
    #[inline]
    #[must_use]
    pub const fn tracking_value(self) -> u32 {
        self.0 + 1
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tracking_value())
    }
}

/// Stable identity assigned to a style surface the first time a scan sees it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// Identity of a tracked style rule.
///
/// `occurrence` is the 1-based position of this selector among all style
/// rules of the same surface that share it, counted fresh on every scan. An
/// unchanged surface therefore yields the same keys scan after scan.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    /// Surface the rule was found in.
    pub surface: SurfaceId,
    /// Whitespace-normalized selector text.
    pub selector: String,
    /// Nth occurrence of `selector` within the surface.
    pub occurrence: u32,
}

impl RuleKey {
    /// Creates a key, normalizing whitespace in `selector`.
    #[must_use]
    pub fn new(surface: SurfaceId, selector: &str, occurrence: u32) -> Self {
        Self {
            surface,
            selector: normalize_selector(selector),
            occurrence,
        }
    }
}

impl fmt::Debug for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleKey({:?} {:?} #{})",
            self.surface, self.selector, self.occurrence
        )
    }
}

/// Collapses runs of whitespace so that formatting-only edits keep a key.
pub(crate) fn normalize_selector(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}
