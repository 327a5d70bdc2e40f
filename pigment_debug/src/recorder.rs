// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Every record starts with a tag byte and
//! the microseconds elapsed since the recorder was created. Strings are stored
//! with a `u32` length prefix. [`decode`] reads the records back as an
//! iterator of [`Record`].
//!
//! Targets are stored by their tracking value, the number the engine writes
//! into the tracking attribute.

use std::time::Instant;

use pigment_core::SurfaceId;
use pigment_core::trace::{
    DrainEvent, OverrideWriteEvent, PaintFaultEvent, RenderEvent, ScanEvent, SkipReason,
    SurfaceSkippedEvent, TraceSink, WriteKind,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SCAN: u8 = 1;
const TAG_DRAIN: u8 = 2;
const TAG_RENDER: u8 = 3;
const TAG_OVERRIDE_WRITE: u8 = 4;
const TAG_PAINT_FAULT: u8 = 5;
const TAG_SURFACE_SKIPPED: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    epoch: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            epoch: Instant::now(),
        }
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let elapsed = self.epoch.elapsed().as_micros();
        self.write_u8(tag);
        self.write_u64(u64::try_from(elapsed).unwrap_or(u64::MAX));
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        // Oversized strings are cut at a character boundary.
        let mut len = s.len().min(u32::MAX as usize);
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
        self.buf.extend_from_slice(&s.as_bytes()[..len]);
    }
}

impl TraceSink for RecorderSink {
    fn on_scan(&mut self, e: &ScanEvent) {
        self.begin(TAG_SCAN);
        self.write_u32(e.scanned);
        self.write_u32(e.pending);
        self.write_u32(e.changed);
        self.write_u32(e.removed);
        self.write_u8(u8::from(e.new_paint_surface));
    }

    fn on_drain(&mut self, e: &DrainEvent) {
        self.begin(TAG_DRAIN);
        self.write_u32(e.surfaces);
        self.write_u32(e.targets);
        self.write_u32(e.rendered);
        self.write_u32(e.skipped);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.begin(TAG_RENDER);
        self.write_u32(e.target.tracking_value());
        self.write_u32(e.invocations);
        self.write_u32(e.writes);
        self.write_f64(e.width);
        self.write_f64(e.height);
    }

    fn on_override_write(&mut self, e: &OverrideWriteEvent<'_>) {
        self.begin(TAG_OVERRIDE_WRITE);
        self.write_u32(e.target.tracking_value());
        self.write_u8(match e.kind {
            WriteKind::Set => 0,
            WriteKind::Remove => 1,
        });
        self.write_str(e.property);
    }

    fn on_paint_fault(&mut self, e: &PaintFaultEvent<'_>) {
        self.begin(TAG_PAINT_FAULT);
        self.write_u32(e.target.tracking_value());
        self.write_str(e.procedure);
        self.write_str(e.message);
    }

    fn on_surface_skipped(&mut self, e: &SurfaceSkippedEvent) {
        self.begin(TAG_SURFACE_SKIPPED);
        self.write_u32(e.surface.0);
        self.write_u8(match e.reason {
            SkipReason::Unreadable => 0,
            SkipReason::AwaitingImports => 1,
        });
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`ScanEvent`].
    Scan(ScanEvent),
    /// A [`DrainEvent`].
    Drain(DrainEvent),
    /// A [`RenderEvent`].
    Render {
        /// Tracking value of the target.
        target: u32,
        /// Procedure invocations.
        invocations: u32,
        /// Declarations set or removed.
        writes: u32,
        /// Logical width.
        width: f64,
        /// Logical height.
        height: f64,
    },
    /// An [`OverrideWriteEvent`].
    OverrideWrite {
        /// Tracking value of the target.
        target: u32,
        /// Declaration name.
        property: String,
        /// Set or remove.
        kind: WriteKind,
    },
    /// A [`PaintFaultEvent`].
    PaintFault {
        /// Tracking value of the target.
        target: u32,
        /// The failing procedure.
        procedure: String,
        /// The failure message.
        message: String,
    },
    /// A [`SurfaceSkippedEvent`].
    SurfaceSkipped(SurfaceSkippedEvent),
}

impl RecordedEvent {
    /// Short event name, as used in exports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan(_) => "Scan",
            Self::Drain(_) => "Drain",
            Self::Render { .. } => "Render",
            Self::OverrideWrite { .. } => "OverrideWrite",
            Self::PaintFault { .. } => "PaintFault",
            Self::SurfaceSkipped(_) => "SurfaceSkipped",
        }
    }
}

/// A decoded event with its timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Microseconds since the recorder was created.
    pub at_us: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Option<&[u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.read_bytes(8)?.try_into().ok()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_string(&mut self) -> Option<String> {
        let len = usize::try_from(self.read_u32()?).ok()?;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn decode_scan(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Scan(ScanEvent {
            scanned: self.read_u32()?,
            pending: self.read_u32()?,
            changed: self.read_u32()?,
            removed: self.read_u32()?,
            new_paint_surface: self.read_u8()? != 0,
        }))
    }

    fn decode_drain(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Drain(DrainEvent {
            surfaces: self.read_u32()?,
            targets: self.read_u32()?,
            rendered: self.read_u32()?,
            skipped: self.read_u32()?,
        }))
    }

    fn decode_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Render {
            target: self.read_u32()?,
            invocations: self.read_u32()?,
            writes: self.read_u32()?,
            width: self.read_f64()?,
            height: self.read_f64()?,
        })
    }

    fn decode_override_write(&mut self) -> Option<RecordedEvent> {
        let target = self.read_u32()?;
        let kind = match self.read_u8()? {
            0 => WriteKind::Set,
            _ => WriteKind::Remove,
        };
        let property = self.read_string()?;
        Some(RecordedEvent::OverrideWrite {
            target,
            property,
            kind,
        })
    }

    fn decode_paint_fault(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PaintFault {
            target: self.read_u32()?,
            procedure: self.read_string()?,
            message: self.read_string()?,
        })
    }

    fn decode_surface_skipped(&mut self) -> Option<RecordedEvent> {
        let surface = SurfaceId(self.read_u32()?);
        let reason = match self.read_u8()? {
            0 => SkipReason::Unreadable,
            _ => SkipReason::AwaitingImports,
        };
        Some(RecordedEvent::SurfaceSkipped(SurfaceSkippedEvent {
            surface,
            reason,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_us = self.read_u64()?;
        let event = match tag {
            TAG_SCAN => self.decode_scan(),
            TAG_DRAIN => self.decode_drain(),
            TAG_RENDER => self.decode_render(),
            TAG_OVERRIDE_WRITE => self.decode_override_write(),
            TAG_PAINT_FAULT => self.decode_paint_fault(),
            TAG_SURFACE_SKIPPED => self.decode_surface_skipped(),
            _ => None, // unknown tag → stop iteration
        }?;
        Some(Record { at_us, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
