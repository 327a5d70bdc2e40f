// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint boxes, device pixel ratios and size tracking.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use kurbo::Size;
use pigment_core::raster::Color;
use pigment_core::{ContextOptions, Engine, EngineConfig};
use pigment_harness::{MemoryHost, NodeId, ProbeLog, settle, solid};

fn scene(css: &str, size: Size, ratio: f64) -> (MemoryHost, NodeId) {
    let mut host = MemoryHost::new();
    host.set_device_pixel_ratio(ratio);
    let root = host.root_node();
    let card = host.add_element(root, "div", &[("class", "card")]);
    host.set_size(card, size);
    host.add_sheet(css);
    (host, card)
}

fn painted(host: &mut MemoryHost) -> Engine<MemoryHost> {
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(host, solid("fill", Color::BLACK))
        .unwrap();
    engine.start(host);
    settle(&mut engine, host);
    engine
}

/// Pixel dimensions of the PNG inside a `url("data:…;base64,…")` value.
fn png_dimensions(value: &str) -> (u32, u32) {
    let start = value.find("base64,").expect("a base64 data URL") + "base64,".len();
    let end = start + value[start..].find('"').expect("a quoted URL");
    let bytes = STANDARD.decode(&value[start..end]).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    let be = |at: usize| u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap());
    (be(16), be(20))
}

#[test]
fn unit_ratio_needs_no_side_effects() {
    let (mut host, card) = scene(
        ".card { background-image: paint(fill); }",
        Size::new(100.0, 50.0),
        1.0,
    );
    painted(&mut host);
    let value = host.override_declaration(card, "background-image").unwrap();
    assert_eq!(png_dimensions(&value), (100, 50));
    assert_eq!(host.override_declaration(card, "background-size"), None);
}

#[test]
fn high_density_rasters_are_scaled_back() {
    let (mut host, card) = scene(
        ".card { background-image: paint(fill); }",
        Size::new(100.0, 50.0),
        2.0,
    );
    painted(&mut host);
    let value = host.override_declaration(card, "background-image").unwrap();
    assert_eq!(png_dimensions(&value), (200, 100));
    assert_eq!(
        host.override_declaration(card, "background-size").as_deref(),
        Some("100px 50px")
    );
}

#[test]
fn masks_size_both_spellings() {
    let (mut host, card) = scene(
        ".card { mask-image: paint(fill); }",
        Size::new(30.0, 20.0),
        2.0,
    );
    painted(&mut host);
    assert!(host.override_declaration(card, "mask-image").is_some());
    for name in ["mask-size", "-webkit-mask-size"] {
        assert_eq!(
            host.override_declaration(card, name).as_deref(),
            Some("30px 20px"),
            "{name}"
        );
    }
}

#[test]
fn border_images_paint_the_slice_box_unscaled() {
    let (mut host, card) = scene(
        ".card { border-image-source: paint(fill); border-image-slice: 10px; }",
        Size::new(100.0, 100.0),
        2.0,
    );
    painted(&mut host);
    let value = host
        .override_declaration(card, "border-image-source")
        .unwrap();
    assert_eq!(png_dimensions(&value), (80, 80));
    assert_eq!(
        host.override_declaration(card, "border-color").as_deref(),
        Some("transparent")
    );
    assert_eq!(
        host.override_declaration(card, "image-rendering").as_deref(),
        Some("pixelated")
    );
}

#[test]
fn context_options_choose_the_painted_box() {
    let (mut host, _) = scene(
        ".card { background-image: paint(probe); }",
        Size::new(100.0, 50.0),
        2.0,
    );
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(
            &mut host,
            log.definition("probe", &[])
                .with_context_options(ContextOptions {
                    scaling: true,
                    native_pixels: true,
                }),
        )
        .unwrap();
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert_eq!(log.calls()[0].size, Size::new(200.0, 100.0));
}

#[test]
fn resizes_rerender_with_the_reported_box() {
    let (mut host, card) = scene(
        ".card { background-image: paint(probe); }",
        Size::new(100.0, 50.0),
        1.0,
    );
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert_eq!(log.calls()[0].size, Size::new(100.0, 50.0));
    assert!(host.is_observed(card));

    host.set_size(card, Size::new(120.0, 60.0));
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 2);
    assert_eq!(log.calls()[1].size, Size::new(120.0, 60.0));
    let value = host.override_declaration(card, "background-image").unwrap();
    assert_eq!(png_dimensions(&value), (120, 60));
}

#[test]
fn without_subscriptions_a_forced_check_remeasures() {
    let (mut host, card) = scene(
        ".card { background-image: paint(probe); }",
        Size::new(100.0, 50.0),
        1.0,
    );
    host.set_size_observation(false);
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert!(!host.is_observed(card));

    host.set_size(card, Size::new(80.0, 40.0));
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 1);

    engine.notify_possible_change(&mut host, &card, true);
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 2);
    assert_eq!(log.calls()[1].size, Size::new(80.0, 40.0));
}

#[test]
fn without_subscriptions_attribute_changes_remeasure() {
    let (mut host, card) = scene(
        ".card { background-image: paint(probe); }",
        Size::new(100.0, 50.0),
        1.0,
    );
    host.set_size_observation(false);
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    engine.start(&mut host);
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 1);

    host.set_size(card, Size::new(80.0, 40.0));
    host.set_attr(card, "style", "width: 80px");
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 2);
    assert_eq!(log.calls()[1].size, Size::new(80.0, 40.0));
    let value = host.override_declaration(card, "background-image").unwrap();
    assert_eq!(png_dimensions(&value), (80, 40));

    // Same box, nothing to repaint.
    host.set_attr(card, "title", "unchanged");
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 2);
}

#[test]
fn detached_targets_are_skipped() {
    let (mut host, card) = scene(
        ".card { background-image: paint(fill); }",
        Size::new(10.0, 10.0),
        1.0,
    );
    let mut engine = painted(&mut host);
    assert!(host.is_observed(card));
    let writes = host.counters().override_writes();

    engine.notify_possible_change(&mut host, &card, true);
    host.remove(card);
    settle(&mut engine, &mut host);
    assert!(!host.is_observed(card));
    assert_eq!(host.counters().override_writes(), writes);
    assert!(engine.is_idle());
}
