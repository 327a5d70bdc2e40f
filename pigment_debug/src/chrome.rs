// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Every event is an instant event. Target-scoped events are placed on a
//! thread lane named after the target's tracking value; engine-wide events use
//! lane 0.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// `pid` labels the process lane.
pub fn export(bytes: &[u8], pid: u32, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let (cat, tid, args) = match &record.event {
            RecordedEvent::Scan(e) => (
                "Rules",
                0,
                json!({
                    "scanned": e.scanned,
                    "pending": e.pending,
                    "changed": e.changed,
                    "removed": e.removed,
                    "new_paint_surface": e.new_paint_surface,
                }),
            ),
            RecordedEvent::Drain(e) => (
                "Scheduler",
                0,
                json!({
                    "surfaces": e.surfaces,
                    "targets": e.targets,
                    "rendered": e.rendered,
                    "skipped": e.skipped,
                }),
            ),
            RecordedEvent::Render {
                target,
                invocations,
                writes,
                width,
                height,
            } => (
                "Render",
                *target,
                json!({
                    "invocations": invocations,
                    "writes": writes,
                    "width": width,
                    "height": height,
                }),
            ),
            RecordedEvent::OverrideWrite {
                target,
                property,
                kind,
            } => (
                "Override",
                *target,
                json!({
                    "property": property,
                    "kind": format!("{kind:?}"),
                }),
            ),
            RecordedEvent::PaintFault {
                target,
                procedure,
                message,
            } => (
                "Render",
                *target,
                json!({
                    "procedure": procedure,
                    "message": message,
                }),
            ),
            RecordedEvent::SurfaceSkipped(e) => (
                "Rules",
                0,
                json!({
                    "surface": e.surface.0,
                    "reason": format!("{:?}", e.reason),
                }),
            ),
        };
        events.push(json!({
            "ph": "i",
            "name": record.event.name(),
            "cat": cat,
            "ts": record.at_us,
            "pid": pid,
            "tid": tid,
            "s": if tid == 0 { "g" } else { "t" },
            "args": args,
        }));
    }

    serde_json::to_writer_pretty(writer, &events).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use pigment_core::SurfaceId;
    use pigment_core::target::TargetStore;
    use pigment_core::trace::{
        DrainEvent, OverrideWriteEvent, PaintFaultEvent, SkipReason, SurfaceSkippedEvent,
        TraceSink, WriteKind,
    };

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let target = TargetStore::<u32, ()>::new().get_or_insert(&1);
        let mut rec = RecorderSink::new();
        rec.on_surface_skipped(&SurfaceSkippedEvent {
            surface: SurfaceId(2),
            reason: SkipReason::Unreadable,
        });
        rec.on_override_write(&OverrideWriteEvent {
            target,
            property: "background-image",
            kind: WriteKind::Set,
        });
        rec.on_paint_fault(&PaintFaultEvent {
            target,
            procedure: "rings",
            message: "boom",
        });
        rec.on_drain(&DrainEvent {
            surfaces: 0,
            targets: 1,
            rendered: 1,
            skipped: 0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), 9, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(parsed.len(), 4, "one object per record");
        assert_eq!(parsed[0]["name"], "SurfaceSkipped");
        assert_eq!(parsed[0]["args"]["reason"], "Unreadable");
        assert_eq!(parsed[0]["s"], "g");
        assert_eq!(parsed[1]["name"], "OverrideWrite");
        assert_eq!(parsed[1]["tid"], 1);
        assert_eq!(parsed[1]["s"], "t");
        assert_eq!(parsed[1]["args"]["property"], "background-image");
        assert_eq!(parsed[2]["args"]["procedure"], "rings");
        assert_eq!(parsed[3]["cat"], "Scheduler");
        assert!(parsed.iter().all(|e| e["pid"] == 9 && e["ph"] == "i"));
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], 0, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }
}
