// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event loop for a [`MemoryHost`].

use pigment_core::Engine;
use pigment_core::host::Tick;

use crate::host::MemoryHost;

/// Upper bound on the deliveries [`settle`] makes before giving up.
pub const MAX_SETTLE_STEPS: usize = 1_000;

/// Delivers queued host notifications and requested ticks until none remain.
///
/// Each step forwards one batch in this order: mutation records, changed
/// sheets, size notifications, then the next tick. Timer ticks move the
/// host clock forward by their delay first. Returns the number of steps.
///
/// # Panics
///
/// Panics if the engine keeps producing work for [`MAX_SETTLE_STEPS`]
/// steps.
pub fn settle(engine: &mut Engine<MemoryHost>, host: &mut MemoryHost) -> usize {
    let mut steps = 0;
    loop {
        assert!(
            steps < MAX_SETTLE_STEPS,
            "engine did not settle within {MAX_SETTLE_STEPS} steps"
        );
        steps += 1;

        let mutations = host.take_mutations();
        if !mutations.is_empty() {
            engine.on_mutations(host, &mutations);
            continue;
        }
        let sheets = host.take_sheet_events();
        if !sheets.is_empty() {
            for sheet in &sheets {
                engine.surface_available(host, sheet);
            }
            continue;
        }
        let resizes = host.take_resizes();
        if !resizes.is_empty() {
            engine.on_resize(host, &resizes);
            continue;
        }
        match host.next_tick() {
            Some(tick) => {
                if let Tick::Timer(delay) = tick {
                    host.advance(delay);
                }
                engine.drain(host);
            }
            None => {
                tracing::trace!(steps, "settled");
                return steps - 1;
            }
        }
    }
}
