// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory document implementing every host trait.
//!
//! [`MemoryHost`] keeps an element arena, a list of style sheets and the
//! engine's override sheet. Computed values come from a small cascade:
//! `!important` beats normal, inline beats sheet rules, then specificity,
//! then source order. Custom properties inherit; nothing else does, and
//! shorthands are not expanded. Like a host without native paint support,
//! it drops declarations that use raw `paint()` unless
//! [`set_native_paint`](MemoryHost::set_native_paint) is on.
//!
//! Host notifications are queued rather than delivered. A test (or
//! [`settle`](crate::settle)) takes them with [`take_mutations`],
//! [`take_resizes`], [`take_sheet_events`] and [`next_tick`] and forwards
//! them to the engine.
//!
//! [`take_mutations`]: MemoryHost::take_mutations
//! [`take_resizes`]: MemoryHost::take_resizes
//! [`take_sheet_events`]: MemoryHost::take_sheet_events
//! [`next_tick`]: MemoryHost::next_tick

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use kurbo::{Insets, Size};
use pigment_backend_skia::{ReferenceMode, SkiaConfig, SkiaSurface};
use pigment_core::host::{
    ComputedStyle, CssRule, Document, Geometry, MutationRecord, OverrideSurface, Preload,
    Priority, RasterFactory, ResizeEntry, StyleSurfaces, SurfaceContents, Tick, TickSource,
};
use pigment_core::intercept::InlineStyle;
use pigment_core::raster::RasterSurface;
use pigment_core::syntax::{TokenForm, paint_tokens};

use crate::css::{self, ElementTree, ParsedRule};

/// Handle to an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Handle to a style sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetId(u32);

/// Handle to a style rule, in an author sheet or the override sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SheetId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Loading state of an author sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SheetState {
    /// Parsed and readable.
    #[default]
    Ready,
    /// Still being fetched. Applies nothing.
    Loading,
    /// Applies to rendering but cannot be read, like a cross-origin sheet.
    Unreadable,
}

/// How [`RasterFactory::preload`] answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreloadMode {
    /// Every URL is usable at once.
    #[default]
    Immediate,
    /// Every request gets a ticket, collected with
    /// [`MemoryHost::take_preloads`].
    Deferred,
}

/// Running totals of engine-visible side effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostCounters {
    /// Declarations set on override rules.
    pub override_sets: usize,
    /// Declarations removed from override rules.
    pub override_removes: usize,
    /// Times the override sheet was switched off.
    pub override_disables: usize,
    /// Author rules rewritten.
    pub rule_rewrites: usize,
    /// Raster surfaces allocated.
    pub rasters: usize,
}

impl HostCounters {
    /// Declarations set or removed on override rules.
    #[must_use]
    pub fn override_writes(&self) -> usize {
        self.override_sets + self.override_removes
    }
}

#[derive(Clone, Debug)]
enum RuleNode {
    Style {
        id: RuleId,
        selector: String,
        text: String,
    },
    Media {
        condition: String,
        rules: Vec<RuleNode>,
    },
    Other,
}

#[derive(Clone, Debug)]
struct Element {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    border_box: Size,
    padding: Insets,
    foreign: bool,
    sheet: Option<SheetId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            border_box: Size::ZERO,
            padding: Insets::ZERO,
            foreign: false,
            sheet: None,
        }
    }
}

#[derive(Clone, Debug)]
struct Sheet {
    owner: Option<NodeId>,
    state: SheetState,
    pending_imports: bool,
    rules: Vec<RuleNode>,
}

/// Precedence of one candidate declaration: importance, inline, specificity,
/// source order.
type CascadeKey = (bool, bool, (u32, u32, u32), u32);

fn rule_text_mut(rules: &mut [RuleNode], target: RuleId) -> Option<&mut String> {
    for rule in rules {
        match rule {
            RuleNode::Style { id, text, .. } if *id == target => return Some(text),
            RuleNode::Media { rules, .. } => {
                if let Some(text) = rule_text_mut(rules, target) {
                    return Some(text);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_style<'a>(rules: &'a [RuleNode], wanted: &str) -> Option<&'a str> {
    rules.iter().find_map(|rule| match rule {
        RuleNode::Style { selector, text, .. } if selector == wanted => Some(text.as_str()),
        RuleNode::Media { rules, .. } => find_style(rules, wanted),
        _ => None,
    })
}

/// In-memory host. See the [module documentation](self).
#[derive(Debug)]
pub struct MemoryHost {
    elements: Vec<Element>,
    sheets: Vec<Sheet>,
    override_sheet: SheetId,
    override_enabled: bool,
    next_rule: u32,
    media: HashSet<String>,
    device_pixel_ratio: f64,
    native_paint: bool,

    suspended: bool,
    report_inline_style: bool,
    mutations: Vec<MutationRecord<NodeId>>,
    sheet_events: Vec<SheetId>,

    size_observation: bool,
    observed: HashSet<NodeId>,
    resizes: Vec<ResizeEntry<NodeId>>,

    ticks: VecDeque<Tick>,
    microtasks: bool,
    epoch: Instant,
    elapsed: Duration,

    raster: SkiaConfig,
    raster_limit: Option<u32>,
    preload_mode: PreloadMode,
    next_ticket: u64,
    preloads: Vec<(u64, Vec<String>)>,
    revoked: Vec<String>,
    counters: HostCounters,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Creates a document holding only an `html` root and an empty, enabled
    /// override sheet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: vec![Element::new("html")],
            sheets: vec![Sheet {
                owner: None,
                state: SheetState::Ready,
                pending_imports: false,
                rules: Vec::new(),
            }],
            override_sheet: SheetId(0),
            override_enabled: true,
            next_rule: 0,
            media: HashSet::new(),
            device_pixel_ratio: 1.0,
            native_paint: false,
            suspended: false,
            report_inline_style: true,
            mutations: Vec::new(),
            sheet_events: Vec::new(),
            size_observation: true,
            observed: HashSet::new(),
            resizes: Vec::new(),
            ticks: VecDeque::new(),
            microtasks: true,
            epoch: Instant::now(),
            elapsed: Duration::ZERO,
            raster: SkiaConfig::default(),
            raster_limit: None,
            preload_mode: PreloadMode::Immediate,
            next_ticket: 0,
            preloads: Vec::new(),
            revoked: Vec::new(),
            counters: HostCounters::default(),
        }
    }

    // -- Configuration --

    /// Sets the device pixel ratio.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = ratio;
    }

    /// Sets whether a media condition holds. Conditions compare as trimmed
    /// text.
    pub fn set_media(&mut self, condition: &str, holds: bool) {
        let condition = condition.trim().to_owned();
        if holds {
            self.media.insert(condition);
        } else {
            self.media.remove(&condition);
        }
    }

    /// Whether raw `paint()` values are accepted by the cascade.
    pub fn set_native_paint(&mut self, native: bool) {
        self.native_paint = native;
    }

    /// Whether size subscriptions are available.
    pub fn set_size_observation(&mut self, available: bool) {
        self.size_observation = available;
    }

    /// Whether inline `style` attribute changes are reported as mutations.
    pub fn set_report_inline_style(&mut self, report: bool) {
        self.report_inline_style = report;
    }

    /// Whether microtask ticks are available.
    pub fn set_microtasks(&mut self, available: bool) {
        self.microtasks = available;
    }

    /// Sets how raster surfaces encode their references.
    pub fn set_raster_config(&mut self, config: SkiaConfig) {
        self.raster = config;
    }

    /// Refuses raster surfaces larger than `limit` pixels on either side.
    pub fn set_raster_limit(&mut self, limit: Option<u32>) {
        self.raster_limit = limit;
    }

    /// Sets how preload requests are answered.
    pub fn set_preload_mode(&mut self, mode: PreloadMode) {
        self.preload_mode = mode;
    }

    // -- Tree --

    /// The `html` root.
    #[must_use]
    pub fn root_node(&self) -> NodeId {
        NodeId(0)
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(u32::try_from(self.elements.len()).unwrap_or(u32::MAX));
        self.elements.push(Element::new(tag));
        id
    }

    /// Appends `child` to `parent`, reporting the insertion if `parent` is
    /// connected.
    ///
    /// # Panics
    ///
    /// Panics if `child` already has a parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.elements[child.index()].parent.is_none(),
            "{child:?} is already attached"
        );
        self.elements[child.index()].parent = Some(parent);
        self.elements[parent.index()].children.push(child);
        if self.is_attached(parent) {
            self.record(MutationRecord::ChildList {
                added: vec![child],
                removed: Vec::new(),
            });
        }
    }

    /// Creates an element with `attributes` and appends it to `parent`.
    pub fn add_element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        for (name, value) in attributes {
            self.elements[node.index()]
                .attributes
                .insert((*name).to_owned(), (*value).to_owned());
        }
        self.append(parent, node);
        node
    }

    /// Detaches `node` from its parent. Its subtree stays intact.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.elements[node.index()].parent.take() else {
            return;
        };
        self.elements[parent.index()].children.retain(|c| *c != node);
        if self.is_attached(parent) {
            self.record(MutationRecord::ChildList {
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    /// Marks `node` as the root of a foreign island.
    pub fn set_foreign(&mut self, node: NodeId, foreign: bool) {
        self.elements[node.index()].foreign = foreign;
    }

    /// Reads an attribute.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.elements[node.index()]
            .attributes
            .get(name)
            .map(String::as_str)
    }

    /// Writes an attribute, reporting the change.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let old_value = self.elements[node.index()]
            .attributes
            .insert(name.to_owned(), value.to_owned());
        self.attribute_changed(node, name, old_value);
    }

    /// Removes an attribute, reporting the change.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        let old_value = self.elements[node.index()].attributes.remove(name);
        if old_value.is_some() {
            self.attribute_changed(node, name, old_value);
        }
    }

    /// Replaces the inline declarations of `node`.
    pub fn set_style(&mut self, node: NodeId, text: &str) {
        self.set_attr(node, "style", text);
    }

    /// An inline-style writer over this document.
    pub fn inline_style(&mut self) -> InlineStyleWriter<'_> {
        InlineStyleWriter { host: self }
    }

    fn attribute_changed(&mut self, node: NodeId, name: &str, old_value: Option<String>) {
        if name == "style" && !self.report_inline_style {
            return;
        }
        if self.is_attached(node) {
            self.record(MutationRecord::Attributes {
                target: node,
                name: name.to_owned(),
                old_value,
            });
        }
    }

    fn record(&mut self, record: MutationRecord<NodeId>) {
        if !self.suspended {
            self.mutations.push(record);
        }
    }

    fn is_attached(&self, mut node: NodeId) -> bool {
        loop {
            if node == self.root_node() {
                return true;
            }
            match self.elements[node.index()].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    // -- Geometry --

    /// Sets the border-box size of `node`, notifying a live subscription.
    pub fn set_size(&mut self, node: NodeId, size: Size) {
        let element = &mut self.elements[node.index()];
        element.border_box = size;
        let padding = element.padding;
        if self.observed.contains(&node) {
            // Reported the way a content-box observer would see it.
            self.resizes.push(ResizeEntry {
                node,
                border_box: None,
                content_box: Size::new(
                    size.width - padding.x_value(),
                    size.height - padding.y_value(),
                ),
                padding,
            });
        }
    }

    /// Sets the padding reported alongside content-box sizes.
    pub fn set_padding(&mut self, node: NodeId, padding: Insets) {
        self.elements[node.index()].padding = padding;
    }

    /// Whether `node` holds a size subscription.
    #[must_use]
    pub fn is_observed(&self, node: NodeId) -> bool {
        self.observed.contains(&node)
    }

    // -- Sheets --

    fn next_rule_id(&mut self) -> RuleId {
        self.next_rule += 1;
        RuleId(self.next_rule)
    }

    fn build_rules(&mut self, parsed: Vec<ParsedRule>) -> Vec<RuleNode> {
        parsed
            .into_iter()
            .map(|rule| match rule {
                ParsedRule::Style { selector, text } => RuleNode::Style {
                    id: self.next_rule_id(),
                    selector,
                    text,
                },
                ParsedRule::Media { condition, rules } => RuleNode::Media {
                    condition,
                    rules: self.build_rules(rules),
                },
                ParsedRule::Other => RuleNode::Other,
            })
            .collect()
    }

    fn push_sheet(&mut self, owner: Option<NodeId>, css_text: &str) -> SheetId {
        let rules = self.build_rules(css::parse_sheet(css_text));
        let id = SheetId(u32::try_from(self.sheets.len()).unwrap_or(u32::MAX));
        self.sheets.push(Sheet {
            owner,
            state: SheetState::Ready,
            pending_imports: false,
            rules,
        });
        id
    }

    /// Adds a sheet that is part of the document from the start, like a
    /// linked stylesheet present at load.
    pub fn add_sheet(&mut self, css_text: &str) -> SheetId {
        self.push_sheet(None, css_text)
    }

    /// Inserts a `style` element carrying `css_text` under `parent`.
    pub fn add_style_element(&mut self, parent: NodeId, css_text: &str) -> (NodeId, SheetId) {
        let node = self.create_element("style");
        let sheet = self.push_sheet(Some(node), css_text);
        self.elements[node.index()].sheet = Some(sheet);
        self.append(parent, node);
        (node, sheet)
    }

    /// Changes the loading state of a sheet.
    pub fn set_sheet_state(&mut self, sheet: SheetId, state: SheetState) {
        self.sheets[sheet.index()].state = state;
        self.sheet_events.push(sheet);
    }

    /// Sets whether a sheet still waits on nested imports.
    pub fn set_pending_imports(&mut self, sheet: SheetId, pending: bool) {
        self.sheets[sheet.index()].pending_imports = pending;
        self.sheet_events.push(sheet);
    }

    /// Replaces the text of a sheet. Every rule gets a fresh handle.
    pub fn set_sheet_text(&mut self, sheet: SheetId, css_text: &str) {
        let rules = self.build_rules(css::parse_sheet(css_text));
        self.sheets[sheet.index()].rules = rules;
        self.sheet_events.push(sheet);
    }

    /// Text of the first author rule with exactly `selector`.
    #[must_use]
    pub fn rule_text(&self, selector: &str) -> Option<&str> {
        self.author_sheets()
            .find_map(|id| find_style(&self.sheets[id.index()].rules, selector))
    }

    fn sheet_attached(&self, sheet: SheetId) -> bool {
        self.sheets[sheet.index()]
            .owner
            .is_none_or(|owner| self.is_attached(owner))
    }

    fn author_sheets(&self) -> impl Iterator<Item = SheetId> + '_ {
        (0..self.sheets.len())
            .filter_map(|i| u32::try_from(i).ok().map(SheetId))
            .filter(|id| *id != self.override_sheet && self.sheet_attached(*id))
    }

    fn export_rules(&self, rules: &[RuleNode]) -> Vec<CssRule<RuleId>> {
        rules
            .iter()
            .map(|rule| match rule {
                RuleNode::Style { id, selector, text } => CssRule::Style {
                    selector: selector.clone(),
                    text: text.clone(),
                    handle: *id,
                },
                RuleNode::Media { condition, rules } => CssRule::Group {
                    condition_holds: self.media.contains(condition.trim()),
                    rules: self.export_rules(rules),
                },
                RuleNode::Other => CssRule::Other,
            })
            .collect()
    }

    // -- Override sheet --

    /// The value the override sheet currently gives `name` on `node`, if
    /// any override rule matching `node` declares it.
    #[must_use]
    pub fn override_declaration(&self, node: NodeId, name: &str) -> Option<String> {
        let mut found = None;
        for rule in &self.sheets[self.override_sheet.index()].rules {
            let RuleNode::Style { selector, text, .. } = rule else {
                continue;
            };
            let matches = css::parse_selector_list(selector)
                .is_some_and(|list| list.iter().any(|s| s.matches(self, node)));
            if !matches {
                continue;
            }
            if let Some(d) = css::parse_declarations(text).into_iter().find(|d| d.name == name) {
                found = Some(d.value);
            }
        }
        found
    }

    /// Number of rules in the override sheet.
    #[must_use]
    pub fn override_rule_count(&self) -> usize {
        self.sheets[self.override_sheet.index()].rules.len()
    }

    /// Whether the override sheet currently applies.
    #[must_use]
    pub fn override_enabled(&self) -> bool {
        self.override_enabled
    }

    // -- Cascade --

    fn cascade(
        &self,
        rules: &[RuleNode],
        node: NodeId,
        property: &str,
        order: &mut u32,
        best: &mut Option<(CascadeKey, String)>,
    ) {
        for rule in rules {
            match rule {
                RuleNode::Style { selector, text, .. } => {
                    let Some(list) = css::parse_selector_list(selector) else {
                        continue;
                    };
                    let Some(specificity) = list
                        .iter()
                        .filter(|s| s.matches(self, node))
                        .map(css::Selector::specificity)
                        .max()
                    else {
                        continue;
                    };
                    for declaration in css::parse_declarations(text) {
                        *order += 1;
                        if declaration.name == property && self.parses(&declaration.value) {
                            let key = (declaration.important, false, specificity, *order);
                            consider(best, key, declaration.value);
                        }
                    }
                }
                RuleNode::Media { condition, rules } => {
                    if self.media.contains(condition.trim()) {
                        self.cascade(rules, node, property, order, best);
                    }
                }
                RuleNode::Other => {}
            }
        }
    }

    fn parses(&self, value: &str) -> bool {
        self.native_paint || !paint_tokens(value).any(|t| t.form == TokenForm::Paint)
    }

    /// The winning declared value of `property` on `node` itself.
    fn cascaded(&self, node: NodeId, property: &str) -> Option<String> {
        let mut best = None;
        let mut order = 0;
        for sheet in self.author_sheets() {
            if self.sheets[sheet.index()].state != SheetState::Loading {
                self.cascade(&self.sheets[sheet.index()].rules, node, property, &mut order, &mut best);
            }
        }
        if self.override_enabled {
            let rules = &self.sheets[self.override_sheet.index()].rules;
            self.cascade(rules, node, property, &mut order, &mut best);
        }
        if let Some(inline) = self.attr(node, "style") {
            for declaration in css::parse_declarations(inline) {
                order += 1;
                if declaration.name == property && self.parses(&declaration.value) {
                    let key = (declaration.important, true, (0, 0, 0), order);
                    consider(&mut best, key, declaration.value);
                }
            }
        }
        best.map(|(_, value)| value)
    }

    // -- Notifications --

    /// Takes the mutation records reported since the last call.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord<NodeId>> {
        core::mem::take(&mut self.mutations)
    }

    /// Takes the size notifications reported since the last call.
    pub fn take_resizes(&mut self) -> Vec<ResizeEntry<NodeId>> {
        core::mem::take(&mut self.resizes)
    }

    /// Takes the sheets that changed state or text since the last call.
    pub fn take_sheet_events(&mut self) -> Vec<SheetId> {
        let mut events = core::mem::take(&mut self.sheet_events);
        events.dedup();
        events
    }

    /// Takes outstanding preload tickets with the URLs they cover.
    pub fn take_preloads(&mut self) -> Vec<(u64, Vec<String>)> {
        core::mem::take(&mut self.preloads)
    }

    /// URLs the engine revoked, in order.
    #[must_use]
    pub fn revoked(&self) -> &[String] {
        &self.revoked
    }

    /// Running totals of engine writes.
    #[must_use]
    pub fn counters(&self) -> HostCounters {
        self.counters
    }

    // -- Ticks --

    /// Pops the next requested tick. Microtasks run before timers.
    pub fn next_tick(&mut self) -> Option<Tick> {
        match self.ticks.iter().position(|t| *t == Tick::Microtask) {
            Some(i) => self.ticks.remove(i),
            None => self.ticks.pop_front(),
        }
    }

    /// Number of requested ticks not yet delivered.
    #[must_use]
    pub fn pending_ticks(&self) -> usize {
        self.ticks.len()
    }

    /// Moves the clock forward.
    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }
}

fn consider(best: &mut Option<(CascadeKey, String)>, key: CascadeKey, value: String) {
    if best.as_ref().is_none_or(|(current, _)| key > *current) {
        *best = Some((key, value));
    }
}

impl ElementTree for MemoryHost {
    type Node = NodeId;

    fn tag(&self, node: NodeId) -> &str {
        &self.elements[node.index()].tag
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attr(node, name)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.elements[node.index()].parent
    }
}

impl Document for MemoryHost {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root_node()
    }

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(list) = css::parse_selector_list(selector) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut stack = vec![self.root_node()];
        while let Some(node) = stack.pop() {
            if list.iter().any(|s| s.matches(self, node)) {
                found.push(node);
            }
            stack.extend(self.elements[node.index()].children.iter().rev());
        }
        found
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.is_attached(*node)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.elements[node.index()].children.clone()
    }

    fn is_foreign_island(&self, node: &NodeId) -> bool {
        self.elements[node.index()].foreign
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr(*node, name).map(str::to_owned)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.set_attr(*node, name, value);
    }

    fn set_observation_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }
}

impl StyleSurfaces for MemoryHost {
    type Surface = SheetId;
    type Rule = RuleId;

    fn surfaces(&self) -> Vec<SheetId> {
        let mut surfaces: Vec<SheetId> = self.author_sheets().collect();
        surfaces.push(self.override_sheet);
        surfaces
    }

    fn surface_contents(&self, surface: &SheetId) -> SurfaceContents<RuleId> {
        let sheet = &self.sheets[surface.index()];
        match sheet.state {
            SheetState::Loading => SurfaceContents::Pending,
            SheetState::Unreadable => SurfaceContents::Unreadable,
            SheetState::Ready => SurfaceContents::Ready {
                rules: self.export_rules(&sheet.rules),
                pending_imports: sheet.pending_imports,
            },
        }
    }

    fn is_override_surface(&self, surface: &SheetId) -> bool {
        *surface == self.override_sheet
    }

    fn surface_owned_by(&self, node: &NodeId) -> Option<SheetId> {
        self.elements[node.index()].sheet
    }

    fn rewrite_rule(&mut self, rule: &RuleId, text: &str) {
        let sheets = self.sheets.iter_mut();
        if let Some(current) = sheets
            .into_iter()
            .find_map(|sheet| rule_text_mut(&mut sheet.rules, *rule))
        {
            text.clone_into(current);
            self.counters.rule_rewrites += 1;
        }
    }
}

impl ComputedStyle for MemoryHost {
    fn computed_value(&self, node: &NodeId, property: &str) -> String {
        if !property.starts_with("--") {
            return self.cascaded(*node, property).unwrap_or_default();
        }
        let mut current = Some(*node);
        while let Some(n) = current {
            if let Some(value) = self.cascaded(n, property) {
                return value;
            }
            current = self.elements[n.index()].parent;
        }
        String::new()
    }

    fn specified_value(&self, node: &NodeId, property: &str) -> Option<String> {
        self.cascaded(*node, property)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

impl Geometry for MemoryHost {
    fn border_box(&self, node: &NodeId) -> Size {
        self.elements[node.index()].border_box
    }

    fn observe_size(&mut self, node: &NodeId) -> bool {
        if !self.size_observation {
            return false;
        }
        self.observed.insert(*node);
        true
    }

    fn unobserve_size(&mut self, node: &NodeId) {
        self.observed.remove(node);
    }
}

impl OverrideSurface for MemoryHost {
    type OverrideRule = RuleId;

    fn insert_override_rule(&mut self, selector: &str) -> RuleId {
        let id = self.next_rule_id();
        self.sheets[self.override_sheet.index()]
            .rules
            .push(RuleNode::Style {
                id,
                selector: selector.to_owned(),
                text: String::new(),
            });
        id
    }

    fn set_override_property(&mut self, rule: &RuleId, name: &str, value: &str, priority: Priority) {
        let sheet = self.override_sheet.index();
        if let Some(text) = rule_text_mut(&mut self.sheets[sheet].rules, *rule) {
            *text = css::upsert_declaration(text, name, value, priority == Priority::Important);
            self.counters.override_sets += 1;
        }
    }

    fn remove_override_property(&mut self, rule: &RuleId, name: &str) {
        let sheet = self.override_sheet.index();
        if let Some(text) = rule_text_mut(&mut self.sheets[sheet].rules, *rule) {
            *text = css::remove_declaration(text, name).0;
            self.counters.override_removes += 1;
        }
    }

    fn set_override_surface_enabled(&mut self, enabled: bool) {
        if self.override_enabled && !enabled {
            self.counters.override_disables += 1;
        }
        self.override_enabled = enabled;
    }
}

impl RasterFactory for MemoryHost {
    fn create_raster(
        &mut self,
        width: u32,
        height: u32,
        native_id: &str,
    ) -> Option<Box<dyn RasterSurface>> {
        if self
            .raster_limit
            .is_some_and(|limit| width > limit || height > limit)
        {
            tracing::debug!(width, height, native_id, "raster request over the limit");
            return None;
        }
        self.counters.rasters += 1;
        Some(Box::new(SkiaSurface::new(width, height, native_id, &self.raster)))
    }

    fn preload(&mut self, urls: &[String]) -> Preload {
        match self.preload_mode {
            PreloadMode::Immediate => Preload::Ready,
            PreloadMode::Deferred => {
                self.next_ticket += 1;
                self.preloads.push((self.next_ticket, urls.to_vec()));
                Preload::Deferred(self.next_ticket)
            }
        }
    }

    fn revoke(&mut self, url: &str) {
        if let ReferenceMode::Blob(store) = &self.raster.references {
            store.revoke(url);
        }
        self.revoked.push(url.to_owned());
    }
}

impl TickSource for MemoryHost {
    fn request_tick(&mut self, tick: Tick) {
        self.ticks.push_back(tick);
    }

    fn supports_microtasks(&self) -> bool {
        self.microtasks
    }

    fn now(&self) -> Instant {
        self.epoch + self.elapsed
    }
}

/// Writes inline declarations through the `style` attribute of a
/// [`MemoryHost`] element.
#[derive(Debug)]
pub struct InlineStyleWriter<'h> {
    host: &'h mut MemoryHost,
}

impl InlineStyle for InlineStyleWriter<'_> {
    type Node = NodeId;

    fn set_property(&mut self, node: &NodeId, name: &str, value: &str, priority: Priority) {
        let current = self.host.attr(*node, "style").unwrap_or_default();
        let text = css::upsert_declaration(current, name, value, priority == Priority::Important);
        self.host.set_attr(*node, "style", &text);
    }

    fn remove_property(&mut self, node: &NodeId, name: &str) -> Option<String> {
        let current = self.host.attr(*node, "style")?;
        let (text, removed) = css::remove_declaration(current, name);
        if removed.is_some() {
            self.host.set_attr(*node, "style", &text);
        }
        removed
    }

    fn set_css_text(&mut self, node: &NodeId, text: &str) {
        self.host.set_attr(*node, "style", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_orders_by_importance_then_specificity() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "div", &[("class", "a"), ("id", "x")]);
        host.add_sheet("#x { color: red; } .a { color: blue; } div { color: green !important; }");
        assert_eq!(host.computed_value(&node, "color"), "green");

        host.set_style(node, "color: black");
        assert_eq!(host.computed_value(&node, "color"), "green");
        host.set_style(node, "color: black !important");
        assert_eq!(host.computed_value(&node, "color"), "black");
    }

    #[test]
    fn custom_properties_inherit() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let parent = host.add_element(root, "div", &[("style", "--x: 4; color: red")]);
        let child = host.add_element(parent, "span", &[]);
        assert_eq!(host.computed_value(&child, "--x"), "4");
        assert_eq!(host.computed_value(&child, "color"), "");
        assert_eq!(host.specified_value(&child, "--x"), None);
    }

    #[test]
    fn raw_paint_needs_native_support() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "p", &[]);
        host.add_sheet("p { background-image: paint(dots); mask-image: url(data:image/paint-m,=); }");
        assert_eq!(host.computed_value(&node, "background-image"), "");
        assert_eq!(
            host.computed_value(&node, "mask-image"),
            "url(data:image/paint-m,=)"
        );
        host.set_native_paint(true);
        assert_eq!(host.computed_value(&node, "background-image"), "paint(dots)");
    }

    #[test]
    fn media_groups_follow_conditions() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "p", &[]);
        let sheet = host.add_sheet("@media print { p { color: red; } }");
        assert_eq!(host.computed_value(&node, "color"), "");
        host.set_media("print", true);
        assert_eq!(host.computed_value(&node, "color"), "red");
        let SurfaceContents::Ready { rules, .. } = host.surface_contents(&sheet) else {
            panic!("sheet should be readable");
        };
        assert!(matches!(rules[0], CssRule::Group { condition_holds: true, .. }));
    }

    #[test]
    fn loading_sheets_apply_nothing() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "p", &[]);
        let sheet = host.add_sheet("p { color: red; }");
        host.set_sheet_state(sheet, SheetState::Loading);
        assert_eq!(host.computed_value(&node, "color"), "");
        assert!(matches!(host.surface_contents(&sheet), SurfaceContents::Pending));
        host.set_sheet_state(sheet, SheetState::Unreadable);
        assert_eq!(host.computed_value(&node, "color"), "red");
        assert_eq!(host.take_sheet_events(), [sheet]);
    }

    #[test]
    fn override_sheet_is_last_and_switchable() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "p", &[("data-t", "1")]);
        let sheet = host.add_sheet("p { color: red; }");
        assert_eq!(host.surfaces().last(), Some(&SheetId(0)));
        assert_eq!(host.surfaces()[0], sheet);

        let rule = host.insert_override_rule("[data-t=\"1\"]");
        host.set_override_property(&rule, "color", "blue", Priority::Important);
        assert_eq!(host.computed_value(&node, "color"), "blue");
        assert_eq!(host.override_declaration(node, "color").as_deref(), Some("blue"));

        host.set_override_surface_enabled(false);
        assert_eq!(host.computed_value(&node, "color"), "red");
        host.set_override_surface_enabled(true);
        host.remove_override_property(&rule, "color");
        assert_eq!(host.computed_value(&node, "color"), "red");
        assert_eq!(host.counters().override_writes(), 2);
        assert_eq!(host.counters().override_disables, 1);
    }

    #[test]
    fn mutations_are_reported_unless_suspended() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "div", &[]);
        host.set_attr(node, "class", "a");
        host.set_observation_suspended(true);
        host.set_attr(node, "class", "b");
        host.set_observation_suspended(false);

        let records = host.take_mutations();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], MutationRecord::ChildList { added, .. } if added == &[node]));
        assert!(matches!(
            &records[1],
            MutationRecord::Attributes { name, old_value: None, .. } if name == "class"
        ));
    }

    #[test]
    fn detached_nodes_report_nothing() {
        let mut host = MemoryHost::new();
        let node = host.create_element("div");
        let child = host.add_element(node, "span", &[]);
        host.set_attr(child, "class", "a");
        assert!(host.take_mutations().is_empty());
        assert!(!host.is_connected(&child));
    }

    #[test]
    fn inline_style_reporting_can_be_switched_off() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "div", &[]);
        host.take_mutations();
        host.set_report_inline_style(false);
        host.inline_style()
            .set_property(&node, "--x", "1", Priority::Normal);
        assert!(host.take_mutations().is_empty());
        assert_eq!(host.computed_value(&node, "--x"), "1");
        assert_eq!(
            host.inline_style().remove_property(&node, "--x").as_deref(),
            Some("1")
        );
    }

    #[test]
    fn query_selector_all_in_tree_order() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let a = host.add_element(root, "div", &[("class", "t")]);
        let b = host.add_element(a, "div", &[("class", "t")]);
        let c = host.add_element(root, "div", &[("class", "t")]);
        assert_eq!(host.query_selector_all(".t"), [a, b, c]);
        assert!(host.query_selector_all("::bogus").is_empty());
    }

    #[test]
    fn observed_resizes_report_content_box() {
        let mut host = MemoryHost::new();
        let root = host.root_node();
        let node = host.add_element(root, "div", &[]);
        host.set_padding(node, Insets::uniform(5.0));
        host.set_size(node, Size::new(50.0, 50.0));
        assert!(host.take_resizes().is_empty());

        assert!(host.observe_size(&node));
        host.set_size(node, Size::new(60.0, 40.0));
        let entries = host.take_resizes();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_box, Size::new(50.0, 30.0));
        assert_eq!(entries[0].resolved_border_box(), Size::new(60.0, 40.0));
    }

    #[test]
    fn microtasks_run_before_timers() {
        let mut host = MemoryHost::new();
        host.request_tick(Tick::Timer(Duration::from_millis(5)));
        host.request_tick(Tick::Microtask);
        assert_eq!(host.next_tick(), Some(Tick::Microtask));
        assert_eq!(host.next_tick(), Some(Tick::Timer(Duration::from_millis(5))));
        assert_eq!(host.next_tick(), None);
    }

    #[test]
    fn rewrite_replaces_rule_text() {
        let mut host = MemoryHost::new();
        let sheet = host.add_sheet("@media screen { .a { background: paint(x); } }");
        let SurfaceContents::Ready { rules, .. } = host.surface_contents(&sheet) else {
            panic!("sheet should be readable");
        };
        let CssRule::Group { rules, .. } = &rules[0] else {
            panic!("expected a group");
        };
        let CssRule::Style { handle, .. } = &rules[0] else {
            panic!("expected a style rule");
        };
        host.rewrite_rule(handle, "background: none;");
        assert_eq!(host.rule_text(".a"), Some("background: none;"));
        assert_eq!(host.counters().rule_rewrites, 1);
    }
}
