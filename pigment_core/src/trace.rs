// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the engine.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! engine emits while it scans sheets, drains its queue and renders targets.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Human-readable logging goes through `tracing` independently of this
//! module; a sink receives the same faults as structured records.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use std::cell::RefCell;
use std::rc::Rc;

use crate::id::{SurfaceId, TargetId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a sheet was left out of a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Access was denied; the sheet is skipped for good.
    Unreadable,
    /// Nested imports are still loading; the sheet will be retried.
    AwaitingImports,
}

/// What an override write did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// A declaration was set.
    Set,
    /// A declaration was removed.
    Remove,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after every rule scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanEvent {
    /// Sheets walked.
    pub scanned: u32,
    /// Sheets skipped because they are still loading.
    pub pending: u32,
    /// Selectors marked changed.
    pub changed: u32,
    /// Rules removed.
    pub removed: u32,
    /// Whether a first-time sheet carried paint references.
    pub new_paint_surface: bool,
}

/// Emitted at the end of every drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainEvent {
    /// Sheets taken from the queue.
    pub surfaces: u32,
    /// Targets taken from the queue.
    pub targets: u32,
    /// Targets that were rendered.
    pub rendered: u32,
    /// Targets skipped (detached, or dependencies unchanged).
    pub skipped: u32,
}

/// Emitted after a target is rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderEvent {
    /// The target.
    pub target: TargetId,
    /// Procedure invocations.
    pub invocations: u32,
    /// Declarations set or removed.
    pub writes: u32,
    /// Logical width of the target's box.
    pub width: f64,
    /// Logical height of the target's box.
    pub height: f64,
}

/// Emitted for every write into the override sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverrideWriteEvent<'a> {
    /// The target whose rule was written.
    pub target: TargetId,
    /// Declaration name.
    pub property: &'a str,
    /// Set or remove.
    pub kind: WriteKind,
}

/// Emitted when a procedure fails while drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintFaultEvent<'a> {
    /// The target being rendered.
    pub target: TargetId,
    /// The failing procedure.
    pub procedure: &'a str,
    /// The failure message.
    pub message: &'a str,
}

/// Emitted when a sheet is left out of a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSkippedEvent {
    /// The sheet.
    pub surface: SurfaceId,
    /// Why.
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a rule scan.
    fn on_scan(&mut self, e: &ScanEvent) {
        _ = e;
    }

    /// Called at the end of a drain.
    fn on_drain(&mut self, e: &DrainEvent) {
        _ = e;
    }

    /// Called after a target is rendered.
    fn on_render(&mut self, e: &RenderEvent) {
        _ = e;
    }

    /// Called for each override write.
    fn on_override_write(&mut self, e: &OverrideWriteEvent<'_>) {
        _ = e;
    }

    /// Called when a procedure fails.
    fn on_paint_fault(&mut self, e: &PaintFaultEvent<'_>) {
        _ = e;
    }

    /// Called when a sheet is skipped.
    fn on_surface_skipped(&mut self, e: &SurfaceSkippedEvent) {
        _ = e;
    }
}

/// Lets a caller keep a handle to a sink the engine owns.
impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_scan(&mut self, e: &ScanEvent) {
        self.borrow_mut().on_scan(e);
    }

    fn on_drain(&mut self, e: &DrainEvent) {
        self.borrow_mut().on_drain(e);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.borrow_mut().on_render(e);
    }

    fn on_override_write(&mut self, e: &OverrideWriteEvent<'_>) {
        self.borrow_mut().on_override_write(e);
    }

    fn on_paint_fault(&mut self, e: &PaintFaultEvent<'_>) {
        self.borrow_mut().on_paint_fault(e);
    }

    fn on_surface_skipped(&mut self, e: &SurfaceSkippedEvent) {
        self.borrow_mut().on_surface_skipped(e);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to `sink`, or discards events when
    /// there is none.
    #[inline]
    #[must_use]
    pub fn new(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(None)
    }

    /// Emits a [`ScanEvent`].
    #[inline]
    pub fn scan(&mut self, e: &ScanEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scan(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrainEvent`].
    #[inline]
    pub fn drain(&mut self, e: &DrainEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_drain(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderEvent`].
    #[inline]
    pub fn render(&mut self, e: &RenderEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`OverrideWriteEvent`].
    #[inline]
    pub fn override_write(&mut self, e: &OverrideWriteEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_override_write(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PaintFaultEvent`].
    #[inline]
    pub fn paint_fault(&mut self, e: &PaintFaultEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_paint_fault(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceSkippedEvent`].
    #[inline]
    pub fn surface_skipped(&mut self, e: &SurfaceSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
