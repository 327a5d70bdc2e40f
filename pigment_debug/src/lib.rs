// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing and Chrome trace export for pigment
//! diagnostics.
//!
//! This crate provides [`TraceSink`](pigment_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Attach a sink with
//! [`Engine::set_trace_sink`](pigment_core::Engine::set_trace_sink). Wrap it
//! in `Rc<RefCell<_>>` first to keep a handle for reading it back.

pub mod chrome;
pub mod pretty;
pub mod recorder;
