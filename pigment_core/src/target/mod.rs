// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-target state.
//!
//! A *target* is a host node the engine has been asked to evaluate. Each one
//! gets, lazily and in this order:
//!
//! - An identity ([`TargetId`](crate::TargetId)) assigned on first
//!   involvement and never reused.
//! - A `pending` flag mirroring its presence in the invalidation queue.
//! - Cached geometry ([`TargetGeometry`]), which is *live* while a continuous
//!   size subscription keeps it fresh.
//! - A dependency baseline: the values last seen for every property the last
//!   render depended on. A wake-up that finds the baseline unchanged skips
//!   the render.
//! - At most one override rule, created on the first write.
//! - Raster surfaces, one per procedure, reused while their size holds.
//! - A record of every property it has painted ([`PaintedProperty`]), used
//!   for change detection and for removing overrides that are no longer
//!   backed by a reference.
//!
//! State is stored in struct-of-arrays layout indexed by the target id.

mod store;

pub use store::{Invalidation, PaintedProperty, TargetGeometry, TargetStore};
