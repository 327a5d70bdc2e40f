// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Targets are
//! printed by their tracking value.

use std::io::Write;

use pigment_core::trace::{
    DrainEvent, OverrideWriteEvent, PaintFaultEvent, RenderEvent, ScanEvent, SkipReason,
    SurfaceSkippedEvent, TraceSink, WriteKind,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink, returning the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_scan(&mut self, e: &ScanEvent) {
        let _ = writeln!(
            self.writer,
            "[scan] sheets={} pending={} changed={} removed={}{}",
            e.scanned,
            e.pending,
            e.changed,
            e.removed,
            if e.new_paint_surface { " +paint" } else { "" },
        );
    }

    fn on_drain(&mut self, e: &DrainEvent) {
        let _ = writeln!(
            self.writer,
            "[drain] sheets={} targets={} rendered={} skipped={}",
            e.surfaces, e.targets, e.rendered, e.skipped,
        );
    }

    fn on_render(&mut self, e: &RenderEvent) {
        let _ = writeln!(
            self.writer,
            "[render] target={} {}x{} invocations={} writes={}",
            e.target, e.width, e.height, e.invocations, e.writes,
        );
    }

    fn on_override_write(&mut self, e: &OverrideWriteEvent<'_>) {
        let op = match e.kind {
            WriteKind::Set => "set",
            WriteKind::Remove => "remove",
        };
        let _ = writeln!(
            self.writer,
            "[override:{op}] target={} {}",
            e.target, e.property,
        );
    }

    fn on_paint_fault(&mut self, e: &PaintFaultEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[fault] target={} paint({}): {}",
            e.target, e.procedure, e.message,
        );
    }

    fn on_surface_skipped(&mut self, e: &SurfaceSkippedEvent) {
        let reason = match e.reason {
            SkipReason::Unreadable => "unreadable",
            SkipReason::AwaitingImports => "awaiting imports",
        };
        let _ = writeln!(
            self.writer,
            "[skip] sheet={} {reason}",
            e.surface.0,
        );
    }
}
