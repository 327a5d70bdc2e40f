// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style sheets arriving, loading, changing and being denied.

use std::time::Duration;

use kurbo::Size;
use pigment_core::host::Tick;
use pigment_core::raster::Color;
use pigment_core::{Engine, EngineConfig};
use pigment_harness::{MemoryHost, NodeId, SheetState, settle, solid};

const CARD: &str = ".card { background-image: paint(fill); }";

fn document() -> (MemoryHost, NodeId) {
    let mut host = MemoryHost::new();
    let root = host.root_node();
    let card = host.add_element(root, "div", &[("class", "card")]);
    host.set_size(card, Size::new(40.0, 40.0));
    (host, card)
}

fn engine(host: &mut MemoryHost) -> Engine<MemoryHost> {
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(host, solid("fill", Color::BLACK))
        .unwrap();
    engine
}

fn is_painted(host: &MemoryHost, node: NodeId) -> bool {
    host.override_declaration(node, "background-image").is_some()
}

#[test]
fn inserted_style_elements_are_scanned() {
    let (mut host, card) = document();
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert!(!is_painted(&host, card));

    let root = host.root_node();
    let (style, _) = host.add_style_element(root, CARD);
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));
    assert_eq!(engine.rules().len(), 1);

    host.remove(style);
    settle(&mut engine, &mut host);
    assert!(!is_painted(&host, card));
    assert!(engine.rules().is_empty());
}

#[test]
fn inserted_elements_are_painted() {
    let (mut host, card) = document();
    host.add_sheet(CARD);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));

    let root = host.root_node();
    let late = host.add_element(root, "div", &[("class", "card")]);
    host.set_size(late, Size::new(10.0, 10.0));
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, late));
    assert_eq!(host.override_rule_count(), 2);
}

#[test]
fn stripped_tracking_attributes_are_restored() {
    let (mut host, card) = document();
    host.add_sheet(CARD);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    let expected = host.attr(card, "data-css-paint").unwrap().to_owned();
    let writes = host.counters().override_writes();

    host.remove_attr(card, "data-css-paint");
    settle(&mut engine, &mut host);
    assert_eq!(host.attr(card, "data-css-paint"), Some(expected.as_str()));

    host.set_attr(card, "data-css-paint", "99");
    settle(&mut engine, &mut host);
    assert_eq!(host.attr(card, "data-css-paint"), Some(expected.as_str()));

    assert!(is_painted(&host, card));
    assert_eq!(host.counters().override_writes(), writes);
}

#[test]
fn unreadable_sheets_are_skipped_for_good() {
    let (mut host, card) = document();
    let root = host.root_node();
    let other = host.add_element(root, "div", &[("class", "other")]);
    host.set_size(other, Size::new(10.0, 10.0));
    let denied = host.add_sheet(CARD);
    host.set_sheet_state(denied, SheetState::Unreadable);
    host.add_sheet(".other { background-image: paint(fill); }");

    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert_eq!(engine.rules().len(), 1);
    assert!(is_painted(&host, other));
    assert!(!is_painted(&host, card));

    host.set_sheet_state(denied, SheetState::Ready);
    settle(&mut engine, &mut host);
    assert_eq!(engine.rules().len(), 1);
    assert!(!is_painted(&host, card));
}

#[test]
fn loading_sheets_are_scanned_once_ready() {
    let (mut host, card) = document();
    let sheet = host.add_sheet(CARD);
    host.set_sheet_state(sheet, SheetState::Loading);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert!(engine.rules().is_empty());
    assert!(!is_painted(&host, card));

    host.set_sheet_state(sheet, SheetState::Ready);
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));
}

#[test]
fn pending_imports_hold_a_sheet_back_briefly() {
    let (mut host, card) = document();
    let sheet = host.add_sheet(CARD);
    host.set_pending_imports(sheet, true);
    host.take_mutations();
    host.take_sheet_events();

    let mut engine = engine(&mut host);
    engine.start(&mut host);
    assert_eq!(host.next_tick(), Some(Tick::Microtask));
    engine.drain(&mut host);
    assert!(engine.rules().is_empty());
    // The import timer plus the drain for the queued elements.
    assert_eq!(host.pending_ticks(), 2);

    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));
    assert_eq!(engine.rules().len(), 1);
}

#[test]
fn imports_finishing_early_end_the_wait() {
    let (mut host, card) = document();
    let sheet = host.add_sheet(CARD);
    host.set_pending_imports(sheet, true);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    engine.drain(&mut host);
    assert!(engine.rules().is_empty());

    host.advance(Duration::from_millis(100));
    host.set_pending_imports(sheet, false);
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));
}

#[test]
fn conditional_groups_apply_when_they_hold() {
    let (mut host, card) = document();
    let sheet = host.add_sheet("@media print { .card { background-image: paint(fill); } }");
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert!(engine.rules().is_empty());
    assert!(!is_painted(&host, card));
    // The rule was still made safe for hosts without native support.
    assert_eq!(
        host.rule_text(".card"),
        Some("background-image: url(data:image/paint-fill,=);")
    );

    host.set_media("print", true);
    engine.surface_available(&mut host, &sheet);
    settle(&mut engine, &mut host);
    assert_eq!(engine.rules().len(), 1);
    assert!(is_painted(&host, card));
}

#[test]
fn native_paint_support_still_gets_rewritten_rules() {
    let (mut host, card) = document();
    host.set_native_paint(true);
    host.add_sheet(CARD);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert_eq!(host.counters().rule_rewrites, 1);
    assert!(is_painted(&host, card));
}

#[test]
fn drains_fall_back_to_timers() {
    let (mut host, card) = document();
    host.add_sheet(CARD);
    host.set_microtasks(false);
    let mut engine = engine(&mut host);
    engine.start(&mut host);
    assert_eq!(host.next_tick(), Some(Tick::Timer(Duration::ZERO)));
    engine.drain(&mut host);
    settle(&mut engine, &mut host);
    assert!(is_painted(&host, card));
}
