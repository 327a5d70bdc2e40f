// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end rendering: registration, dependency gating and override
//! bookkeeping.

use kurbo::Size;
use pigment_core::raster::Color;
use pigment_core::registry::Registration;
use pigment_core::{Engine, EngineConfig, ModuleError, RegistryError};
use pigment_harness::{
    DemoRealm, MemoryHost, NodeId, ProbeLog, SheetId, faulty, settle, solid,
};

const CARD: &str = ".card { background-image: paint(fill); }";

fn scene(css: &str) -> (MemoryHost, NodeId, SheetId) {
    let mut host = MemoryHost::new();
    let root = host.root_node();
    let card = host.add_element(root, "div", &[("class", "card")]);
    host.set_size(card, Size::new(100.0, 50.0));
    let sheet = host.add_sheet(css);
    (host, card, sheet)
}

fn started(host: &mut MemoryHost, engine: &mut Engine<MemoryHost>) {
    engine.start(host);
    settle(engine, host);
}

#[test]
fn paints_once_and_settles() {
    let (mut host, card, _) = scene(CARD);
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, solid("fill", Color::rgb(0, 0, 255)))
        .unwrap();
    started(&mut host, &mut engine);

    let value = host
        .override_declaration(card, "background-image")
        .expect("card is painted");
    assert!(
        value.starts_with("url(\"data:image/paint-fill;base64,"),
        "{value}"
    );
    assert_eq!(
        host.rule_text(".card"),
        Some("background-image: url(data:image/paint-fill,=);")
    );
    assert!(host.override_enabled());
    assert!(engine.is_idle());
    assert_eq!(host.counters().override_sets, 1);
    assert_eq!(host.counters().rule_rewrites, 1);
    assert_eq!(host.counters().rasters, 1);

    // Nothing changed, so re-checking writes nothing.
    engine.notify_possible_change(&mut host, &card, false);
    engine.process_selector(&mut host, ".card", false);
    settle(&mut engine, &mut host);
    assert_eq!(host.counters().override_writes(), 1);
    assert_eq!(host.counters().rasters, 1);
}

#[test]
fn target_identity_is_stable() {
    let (mut host, card, _) = scene(CARD);
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, solid("fill", Color::BLACK))
        .unwrap();
    started(&mut host, &mut engine);

    let id = engine.target_of(&card).expect("card is tracked");
    let expected = id.tracking_value().to_string();
    assert_eq!(host.attr(card, "data-css-paint"), Some(expected.as_str()));

    engine.notify_possible_change(&mut host, &card, true);
    settle(&mut engine, &mut host);
    assert_eq!(engine.target_of(&card), Some(id));
    assert_eq!(host.override_rule_count(), 1);
    // Same pixels, same value: the forced render writes nothing new.
    assert_eq!(host.counters().override_writes(), 1);
}

#[test]
fn only_changed_dependencies_rerender() {
    let mut host = MemoryHost::new();
    let root = host.root_node();
    let a = host.add_element(root, "div", &[("class", "probe"), ("style", "--x: 1")]);
    let b = host.add_element(root, "div", &[("class", "probe"), ("style", "--x: 2")]);
    host.set_size(a, Size::new(20.0, 20.0));
    host.set_size(b, Size::new(20.0, 20.0));
    host.add_sheet(".probe { background-image: paint(probe); }");

    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &["--x"]))
        .unwrap();
    started(&mut host, &mut engine);
    assert_eq!(log.len(), 2);

    host.set_style(a, "--x: 3");
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 3);
    assert_eq!(
        log.calls()[2].properties,
        [("--x".to_owned(), "3".to_owned())]
    );

    host.set_attr(b, "title", "hello");
    settle(&mut engine, &mut host);
    assert_eq!(log.len(), 3);
}

#[test]
fn buffers_alternate_between_renders() {
    let (mut host, card, _) = scene(".card { background-image: paint(probe); }");
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    started(&mut host, &mut engine);

    for _ in 0..2 {
        engine.notify_possible_change(&mut host, &card, true);
        settle(&mut engine, &mut host);
    }
    let serials: Vec<u32> = log.calls().iter().map(|c| c.instance).collect();
    assert_eq!(serials, [1, 2, 1]);
    assert_eq!(log.instances(), 2);
}

#[test]
fn repeated_selectors_are_keyed_by_occurrence() {
    let (mut host, _, _) = scene(
        ".card { color: red; } .card { background-image: paint(fill); } .card { color: blue; }",
    );
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, solid("fill", Color::BLACK))
        .unwrap();
    started(&mut host, &mut engine);

    let keys: Vec<_> = engine.rules().iter().map(|(key, _)| key.clone()).collect();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].selector, ".card");
    assert_eq!(keys[0].occurrence, 2);
}

#[test]
fn unresolved_procedures_render_once_registered() {
    let (mut host, card, _) = scene(".card { background-image: paint(later); }");
    let mut engine = Engine::new(EngineConfig::new());
    started(&mut host, &mut engine);

    let id = engine.target_of(&card).unwrap();
    assert_eq!(engine.targets().unresolved(id), ["later"]);
    assert_eq!(host.override_declaration(card, "background-image"), None);

    engine
        .register_paint(&mut host, solid("later", Color::BLACK))
        .unwrap();
    settle(&mut engine, &mut host);
    assert!(host.override_declaration(card, "background-image").is_some());
    assert!(engine.targets().unresolved(id).is_empty());
}

#[test]
fn dropping_the_rule_clears_the_override() {
    let (mut host, card, sheet) = scene(CARD);
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, solid("fill", Color::BLACK))
        .unwrap();
    started(&mut host, &mut engine);
    assert!(host.is_observed(card));

    host.set_sheet_text(sheet, ".card { color: red; }");
    settle(&mut engine, &mut host);

    let id = engine.target_of(&card).unwrap();
    assert_eq!(host.override_declaration(card, "background-image"), None);
    assert_eq!(host.counters().override_removes, 1);
    assert!(engine.targets().painted(id).is_empty());
    assert!(engine.rules().is_empty());
    assert!(!host.is_observed(card));
}

#[test]
fn rule_edits_can_paint_another_property() {
    let (mut host, card, sheet) = scene(".card { background-image: paint(probe); }");
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    started(&mut host, &mut engine);
    assert!(host.override_declaration(card, "background-image").is_some());
    assert_eq!(host.override_declaration(card, "mask-image"), None);

    host.set_sheet_text(
        sheet,
        ".card { background-image: url(data:image/paint-probe,=); \
         mask-image: url(data:image/paint-probe,=); }",
    );
    settle(&mut engine, &mut host);
    let mask = host
        .override_declaration(card, "mask-image")
        .expect("mask is painted");
    assert!(mask.starts_with("url(\"data:image/paint-probe;base64,"), "{mask}");
    assert!(host.override_declaration(card, "background-image").is_some());
}

#[test]
fn class_changes_can_paint_another_property() {
    let (mut host, card, _) = scene(
        ".card { background-image: paint(probe); } .card.masked { mask-image: paint(probe); }",
    );
    let log = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, log.definition("probe", &[]))
        .unwrap();
    started(&mut host, &mut engine);
    assert_eq!(host.override_declaration(card, "mask-image"), None);

    host.set_attr(card, "class", "card masked");
    settle(&mut engine, &mut host);
    assert!(host.override_declaration(card, "mask-image").is_some());

    host.set_attr(card, "class", "card");
    settle(&mut engine, &mut host);
    assert_eq!(host.override_declaration(card, "mask-image"), None);
    assert!(host.override_declaration(card, "background-image").is_some());
}

#[test]
fn failing_procedures_are_contained() {
    let mut host = MemoryHost::new();
    let root = host.root_node();
    let bad = host.add_element(root, "div", &[("class", "bad")]);
    let good = host.add_element(root, "div", &[("class", "good")]);
    host.set_size(bad, Size::new(10.0, 10.0));
    host.set_size(good, Size::new(10.0, 10.0));
    host.add_sheet(
        ".bad { background-image: paint(bad); } .good { background-image: paint(good); }",
    );

    let mut engine = Engine::new(EngineConfig::new());
    engine.register_paint(&mut host, faulty("bad")).unwrap();
    engine
        .register_paint(&mut host, solid("good", Color::BLACK))
        .unwrap();
    started(&mut host, &mut engine);

    // Whatever the failing procedure drew is still published.
    assert!(host.override_declaration(bad, "background-image").is_some());
    assert!(host.override_declaration(good, "background-image").is_some());
    assert!(engine.is_idle());
}

#[test]
fn raster_exhaustion_keeps_the_authored_value() {
    let (mut host, card, _) = scene(CARD);
    host.set_raster_limit(Some(10));
    let mut engine = Engine::new(EngineConfig::new());
    engine
        .register_paint(&mut host, solid("fill", Color::BLACK))
        .unwrap();
    started(&mut host, &mut engine);
    assert_eq!(host.override_declaration(card, "background-image"), None);
    assert_eq!(host.counters().rasters, 0);
    assert!(!host.is_observed(card));

    host.set_raster_limit(None);
    engine.notify_possible_change(&mut host, &card, true);
    settle(&mut engine, &mut host);
    assert!(host.override_declaration(card, "background-image").is_some());
    assert_eq!(host.counters().rasters, 1);
}

#[test]
fn reregistering_rerenders_referencing_targets() {
    let (mut host, _, _) = scene(".card { background-image: paint(probe); }");
    let first = ProbeLog::new();
    let mut engine = Engine::new(EngineConfig::new());
    assert_eq!(
        engine.register_paint(&mut host, first.definition("probe", &[])),
        Ok(Registration::New)
    );
    started(&mut host, &mut engine);
    assert_eq!(first.len(), 1);

    let second = ProbeLog::new();
    assert_eq!(
        engine.register_paint(&mut host, second.definition("probe", &[])),
        Ok(Registration::Replaced)
    );
    settle(&mut engine, &mut host);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}

#[test]
fn strict_registration_rejects_duplicates() {
    let mut host = MemoryHost::new();
    let mut engine = Engine::new(EngineConfig::strict());
    engine
        .register_paint(&mut host, solid("fill", Color::BLACK))
        .unwrap();
    assert_eq!(
        engine.register_paint(&mut host, solid("fill", Color::rgb(255, 255, 255))),
        Err(RegistryError::AlreadyRegistered {
            name: "fill".into()
        })
    );
    assert!(matches!(
        engine.register_paint(&mut host, solid("1fill", Color::rgb(255, 255, 255))),
        Err(RegistryError::InvalidName { .. })
    ));
    assert_eq!(engine.registry().len(), 1);
}

#[test]
fn modules_register_what_they_define() {
    let (mut host, card, _) = scene(".card { background-image: paint(rip); }");
    let mut engine = Engine::new(EngineConfig::new());
    let mut realm = DemoRealm::new();
    assert_eq!(
        engine.add_module(
            &mut host,
            &mut realm,
            "registerPaint fill solid #00f\nregisterPaint rip ripple\n",
        ),
        Ok(2)
    );
    assert_eq!(engine.registry().len(), 2);

    let err = engine
        .add_module(&mut host, &mut realm, "registerPaint more faulty\nfetch()\n")
        .unwrap_err();
    assert!(matches!(err, ModuleError::Script(_)), "{err:?}");
    assert!(engine.registry().resolve("more").is_none());
    assert_eq!(realm.evaluated(), 1);

    started(&mut host, &mut engine);
    let value = host.override_declaration(card, "background-image").unwrap();
    assert!(value.contains("paint-rip"), "{value}");
}

#[test]
fn module_registrations_follow_the_policy() {
    let mut host = MemoryHost::new();
    let mut engine = Engine::new(EngineConfig::strict());
    let err = engine
        .add_module(
            &mut host,
            &mut DemoRealm::new(),
            "registerPaint fill solid red\nregisterPaint fill solid blue\n",
        )
        .unwrap_err();
    assert_eq!(
        err,
        ModuleError::Registry(RegistryError::AlreadyRegistered {
            name: "fill".into()
        })
    );
}
