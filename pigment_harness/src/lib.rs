// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host and sample procedures for exercising `pigment_core`.
//!
//! - [`MemoryHost`] implements every host trait over an element arena, a
//!   list of style sheets and the override sheet, with a small cascade.
//! - [`settle`] plays the event loop: it forwards queued notifications and
//!   ticks to an [`Engine`](pigment_core::Engine) until nothing is left.
//! - [`solid`], [`ripple`], [`faulty`] and [`ProbeLog`] are procedures to
//!   register; [`DemoRealm`] loads them from module text.
//!
//! ```
//! use kurbo::Size;
//! use pigment_core::{Engine, EngineConfig};
//! use pigment_core::raster::Color;
//! use pigment_harness::{MemoryHost, settle, solid};
//!
//! let mut host = MemoryHost::new();
//! let root = host.root_node();
//! let card = host.add_element(root, "div", &[("class", "card")]);
//! host.set_size(card, Size::new(40.0, 20.0));
//! host.add_sheet(".card { background-image: paint(fill); }");
//!
//! let mut engine = Engine::new(EngineConfig::new());
//! engine.register_paint(&mut host, solid("fill", Color::rgb(0, 0, 255))).unwrap();
//! engine.start(&mut host);
//! settle(&mut engine, &mut host);
//!
//! let value = host.override_declaration(card, "background-image").unwrap();
//! assert!(value.starts_with("url(\"data:image/paint-fill;base64,"));
//! ```

pub mod css;
mod driver;
mod host;
mod procedures;
mod realm;

pub use driver::{MAX_SETTLE_STEPS, settle};
pub use host::{
    HostCounters, InlineStyleWriter, MemoryHost, NodeId, PreloadMode, RuleId, SheetId,
    SheetState,
};
pub use procedures::{
    Faulty, Probe, ProbeCall, ProbeLog, RIPPLE_INPUTS, Ripple, SolidFill, faulty, ripple, solid,
};
pub use realm::DemoRealm;
