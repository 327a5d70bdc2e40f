// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule tracking, invalidation and memoized paint-procedure rendering.
//!
//! `pigment_core` finds `paint(name)` references in a host's style sheets,
//! runs the named procedure for every element they apply to, and writes the
//! rendered image back through an engine-owned override sheet. It re-renders
//! only when something a procedure depends on has changed, and it never
//! observes its own writes.
//!
//! # Architecture
//!
//! ```text
//!   Host notifications          explicit triggers
//!   (mutations, resizes,        (notify_possible_change,
//!    sheet loads)                process_selector)
//!          │                            │
//!          └──────────────┬─────────────┘
//!                         ▼
//!               InvalidationQueue ──► Host tick ──► Engine::drain()
//!                                                       │
//!                 ┌─────────────────────────────────────┤
//!                 ▼                                     ▼
//!   sheets: RuleTracker::scan()           targets: dependency gate
//!     └─► re-query selectors                └─► render pipeline
//!         (back into the queue)                    │   Registry (procedures)
//!                                                  │   RasterSurface
//!                                                  ▼
//!                                  override sheet (observation suspended)
//! ```
//!
//! **[`host`]**: The traits an embedder implements: tree and attribute
//! access, sheet enumeration, computed style, geometry, the override sheet,
//! raster allocation and deferred ticks.
//!
//! **[`Engine`]**: The context object owning all engine state. Each engine
//! is independent; there is no global state.
//!
//! **[`registry`]**: Paint procedures and their double-buffered instances.
//!
//! **[`rules`]**: The rule tracker: stable rule identities and change
//! detection across sheet scans.
//!
//! **[`queue`]**: The invalidation queue and its one-outstanding-tick
//! scheduling discipline.
//!
//! **[`target`]**: Struct-of-arrays per-target state: geometry, dependency
//! baselines, override rules, raster surfaces and the write record.
//!
//! **[`properties`]**: Registered custom properties and the memoized
//! property reader handed to procedures.
//!
//! **[`syntax`]**: Recognition and escaping of paint references.
//!
//! **[`geometry`]**: Paint box adjustment for `border-image`.
//!
//! **[`raster`]**: The drawing and raster surface contracts backends
//! implement.
//!
//! **[`lock`]**: Reference-counted scoped locks that suspend host behavior
//! while the engine writes.
//!
//! **[`worklet`]** and **[`intercept`]**: Procedure module loading, and a
//! decorator for hosts that cannot report inline style writes.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod id;
pub mod intercept;
pub mod lock;
pub mod properties;
pub mod queue;
pub mod raster;
pub mod registry;
pub mod rules;
pub mod syntax;
pub mod target;
pub mod trace;
pub mod worklet;

pub use config::{EngineConfig, RegistrationPolicy};
pub use engine::Engine;
pub use error::{EncodeError, ModuleError, PaintError, PropertyError, RegistryError};
pub use host::Host;
pub use id::{RuleKey, SurfaceId, TargetId};
pub use registry::{ContextOptions, PaintDefinition, PaintInstance};
