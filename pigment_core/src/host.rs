// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for embedding the engine.
//!
//! The engine never owns the document it paints into. Everything it reads or
//! writes goes through a *host*, split into one trait per collaborator:
//!
//! - **[`Document`]**: node identity, tree structure, attributes, selector
//!   queries, and the switch that suspends mutation observation while the
//!   engine writes.
//!
//! - **[`StyleSurfaces`]**: enumeration of style sheets and their rule trees.
//!   A surface may still be loading ([`SurfaceContents::Pending`]) or may be
//!   unreadable ([`SurfaceContents::Unreadable`]); neither is treated as empty.
//!
//! - **[`ComputedStyle`]**: effective property values and the device pixel
//!   ratio.
//!
//! - **[`Geometry`]**: border-box sizes plus an optional continuous size
//!   subscription whose notifications the host forwards to
//!   [`Engine::on_resize`](crate::Engine::on_resize).
//!
//! - **[`OverrideSurface`]**: the engine-owned sheet that carries rendered
//!   substitutions, one rule per target.
//!
//! - **[`RasterFactory`]**: raster surface allocation, resource preloading
//!   and revocation of superseded references.
//!
//! - **[`TickSource`]**: deferred ticks. Every requested tick must eventually
//!   be answered with a call to [`Engine::drain`](crate::Engine::drain).
//!
//! [`Host`] is implemented automatically for any type that implements all of
//! them.
//!
//! # Event loop wiring
//!
//! ```rust,ignore
//! engine.start(&mut host);
//! loop {
//!     match host.next_event() {
//!         Event::Tick => engine.drain(&mut host),
//!         Event::Mutations(records) => engine.on_mutations(&mut host, &records),
//!         Event::Resized(entries) => engine.on_resize(&mut host, &entries),
//!         Event::SheetLoaded(sheet) => engine.surface_available(&mut host, &sheet),
//!         Event::ImagesLoaded(ticket) => engine.images_ready(&mut host, ticket),
//!     }
//! }
//! ```

use core::fmt::Debug;
use core::hash::Hash;
use std::time::{Duration, Instant};

use kurbo::{Insets, Size};

use crate::raster::RasterSurface;

/// Tree access and mutation observation.
pub trait Document {
    /// Handle to a node in the host tree.
    type Node: Clone + Eq + Hash + Debug;

    /// Returns the root node of the observed tree.
    fn root(&self) -> Self::Node;

    /// Returns every element matching `selector`, in tree order.
    ///
    /// Selectors the host cannot parse match nothing.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Node>;

    /// Whether `node` is still attached to the observed tree.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Returns the element children of `node`, in tree order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Whether `node` roots an embedded foreign document (e.g. an SVG island)
    /// whose descendants are not style targets.
    fn is_foreign_island(&self, node: &Self::Node) -> bool {
        _ = node;
        false
    }

    /// Reads an attribute.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Writes an attribute.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    /// Suspends or resumes mutation observation.
    ///
    /// Mutations made while suspended are never reported to the engine.
    fn set_observation_suspended(&mut self, suspended: bool);
}

/// Style sheet enumeration.
pub trait StyleSurfaces: Document {
    /// Handle to a style sheet.
    type Surface: Clone + Eq + Hash + Debug;
    /// Handle to a live style rule inside a sheet.
    type Rule: Clone + Debug;

    /// Returns every sheet in document order, including the override sheet.
    fn surfaces(&self) -> Vec<Self::Surface>;

    /// Returns the current rule tree of `surface`.
    fn surface_contents(&self, surface: &Self::Surface) -> SurfaceContents<Self::Rule>;

    /// Whether `surface` is the engine's own override sheet.
    fn is_override_surface(&self, surface: &Self::Surface) -> bool;

    /// Returns the sheet owned by `node`, if `node` is a sheet-carrying element.
    fn surface_owned_by(&self, node: &Self::Node) -> Option<Self::Surface> {
        _ = node;
        None
    }

    /// Replaces the text of a live rule.
    ///
    /// Called once for each rule of a newly discovered sheet whose text
    /// carries raw `paint(…)` references, with the references rewritten into
    /// a form the host's own parser accepts. Hosts that parse `paint(…)`
    /// natively can ignore it.
    fn rewrite_rule(&mut self, rule: &Self::Rule, text: &str) {
        _ = (rule, text);
    }
}

/// Effective property values.
pub trait ComputedStyle: Document {
    /// Returns the effective value of `property` on `node`.
    ///
    /// Custom properties inherit. An unset property yields an empty string.
    fn computed_value(&self, node: &Self::Node, property: &str) -> String;

    /// Returns the value declared on `node` itself, ignoring inheritance.
    fn specified_value(&self, node: &Self::Node, property: &str) -> Option<String>;

    /// Ratio of device pixels to logical pixels.
    fn device_pixel_ratio(&self) -> f64;
}

/// Box geometry.
pub trait Geometry: Document {
    /// Returns the current border-box size of `node`.
    fn border_box(&self, node: &Self::Node) -> Size;

    /// Starts a continuous size subscription for `node`.
    ///
    /// Returns `false` when the host has no such facility; the engine then
    /// falls back to querying [`border_box`](Self::border_box) on demand.
    fn observe_size(&mut self, node: &Self::Node) -> bool;

    /// Ends the size subscription for `node`.
    fn unobserve_size(&mut self, node: &Self::Node);
}

/// The engine-owned override sheet.
pub trait OverrideSurface: Document {
    /// Handle to one rule in the override sheet.
    type OverrideRule: Clone + Debug;

    /// Appends an empty rule for `selector` and returns its handle.
    fn insert_override_rule(&mut self, selector: &str) -> Self::OverrideRule;

    /// Sets a declaration on an override rule.
    fn set_override_property(
        &mut self,
        rule: &Self::OverrideRule,
        name: &str,
        value: &str,
        priority: Priority,
    );

    /// Removes a declaration from an override rule.
    fn remove_override_property(&mut self, rule: &Self::OverrideRule, name: &str);

    /// Enables or disables the whole override sheet.
    fn set_override_surface_enabled(&mut self, enabled: bool);
}

/// Raster allocation and resource lifetime.
pub trait RasterFactory {
    /// Creates a raster surface of `width × height` device pixels.
    ///
    /// `native_id` is the stable identifier a host with native canvas
    /// references would register the surface under (`paint-{id}-{name}`).
    /// Returns `None` if the host cannot allocate a surface of that size.
    fn create_raster(
        &mut self,
        width: u32,
        height: u32,
        native_id: &str,
    ) -> Option<Box<dyn RasterSurface>>;

    /// Asks the host to load `urls` before they are written.
    fn preload(&mut self, urls: &[String]) -> Preload {
        _ = urls;
        Preload::Ready
    }

    /// Releases a revocable reference that has been superseded.
    fn revoke(&mut self, url: &str) {
        _ = url;
    }
}

/// Deferred execution.
pub trait TickSource {
    /// Requests a call to [`Engine::drain`](crate::Engine::drain) at `tick`.
    fn request_tick(&mut self, tick: Tick);

    /// Whether the host has a microtask-equivalent queue.
    fn supports_microtasks(&self) -> bool {
        true
    }

    /// Current monotonic time.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Everything the engine needs from its embedder.
pub trait Host:
    StyleSurfaces + ComputedStyle + Geometry + OverrideSurface + RasterFactory + TickSource
{
}

impl<T> Host for T where
    T: StyleSurfaces + ComputedStyle + Geometry + OverrideSurface + RasterFactory + TickSource
{
}

/// When a requested tick should fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// After the current task, before the next one.
    Microtask,
    /// After at least the given delay.
    Timer(Duration),
}

/// Declaration priority for override writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Priority {
    /// A plain declaration.
    Normal,
    /// An `!important` declaration.
    Important,
}

/// Result of [`RasterFactory::preload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preload {
    /// The resources are usable immediately.
    Ready,
    /// The host will call [`Engine::images_ready`](crate::Engine::images_ready)
    /// with this ticket once they are.
    Deferred(u64),
}

/// Current state of a style sheet.
#[derive(Clone, Debug)]
pub enum SurfaceContents<R> {
    /// Still being fetched; contributes nothing until it is available.
    Pending,
    /// Access was denied. Skipped for the lifetime of the engine.
    Unreadable,
    /// Parsed and readable.
    Ready {
        /// Top-level rules in source order.
        rules: Vec<CssRule<R>>,
        /// Whether nested imports are still loading.
        pending_imports: bool,
    },
}

impl<R> SurfaceContents<R> {
    /// A readable sheet with no outstanding imports.
    #[must_use]
    pub fn ready(rules: Vec<CssRule<R>>) -> Self {
        Self::Ready {
            rules,
            pending_imports: false,
        }
    }
}

/// One node of a sheet's rule tree.
#[derive(Clone, Debug)]
pub enum CssRule<R> {
    /// A style rule.
    Style {
        /// Selector text as authored.
        selector: String,
        /// Full text of the declaration block.
        text: String,
        /// Live handle to the rule.
        handle: R,
    },
    /// A conditional group such as `@media` or `@supports`.
    Group {
        /// Whether the group's condition currently holds.
        condition_holds: bool,
        /// Nested rules.
        rules: Vec<CssRule<R>>,
    },
    /// Any rule that cannot carry declarations for targets.
    Other,
}

/// A structural or attribute change reported by the host.
#[derive(Clone, Debug)]
pub enum MutationRecord<N> {
    /// Children were inserted into or removed from a node.
    ChildList {
        /// Roots of inserted subtrees.
        added: Vec<N>,
        /// Roots of removed subtrees.
        removed: Vec<N>,
    },
    /// An attribute changed (including the inline `style` attribute).
    Attributes {
        /// The node whose attribute changed.
        target: N,
        /// Attribute name.
        name: String,
        /// Value before the change, when the host reports it.
        old_value: Option<String>,
    },
}

/// A size notification from a continuous subscription.
#[derive(Clone, Debug)]
pub struct ResizeEntry<N> {
    /// The observed node.
    pub node: N,
    /// Border-box size, when the host reports it directly.
    pub border_box: Option<Size>,
    /// Content-box size.
    pub content_box: Size,
    /// Padding, used to derive the border box when it is not reported.
    pub padding: Insets,
}

impl<N> ResizeEntry<N> {
    /// Returns the border-box size, deriving it from the content box when the
    /// host did not report one.
    #[must_use]
    pub fn resolved_border_box(&self) -> Size {
        self.border_box.unwrap_or_else(|| {
            Size::new(
                self.content_box.width + self.padding.x_value(),
                self.content_box.height + self.padding.y_value(),
            )
        })
    }
}
