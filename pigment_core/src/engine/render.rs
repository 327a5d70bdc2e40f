// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render pipeline.
//!
//! Rendering one target walks the paintable properties in order. For each
//! value that mentions a procedure, every reference is painted into the
//! target's raster surface for that procedure, encoded, and spliced back into
//! the value. The result is compared with what was last written for that
//! property and only differences reach the override sheet.

use std::collections::BTreeMap;

use kurbo::{Rect, Size};

use super::{DeferredWrite, Engine, tracer};
use crate::geometry::{border_image_box, is_border_image};
use crate::host::{Host, Preload, Priority};
use crate::id::TargetId;
use crate::lock::{HostScope, Suppress};
use crate::properties::{Properties, PropertyCache};
use crate::raster::ImageReference;
use crate::registry::ContextOptions;
use crate::syntax::{PaintToken, paint_tokens};
use crate::target::PaintedProperty;
use crate::trace::{OverrideWriteEvent, PaintFaultEvent, RenderEvent, WriteKind};

/// Returns the box handed to the procedure and the factor from that box to
/// raster pixels.
fn raster_geometry(paint_box: Size, dpr: f64, options: ContextOptions) -> (Size, f64) {
    if options.native_pixels {
        (paint_box * dpr, 1.0)
    } else if options.scaling {
        (paint_box, dpr)
    } else {
        (paint_box, 1.0)
    }
}

/// Rounds a length to whole device pixels, never below one.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is clamped into u32 range first"
)]
fn device_pixels(length: f64) -> u32 {
    length.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Declarations written alongside a painted property.
///
/// At a device pixel ratio of one the raster already matches the box and
/// nothing extra is needed.
fn side_effects(property: &str, paint_box: Size, dpr: f64) -> BTreeMap<String, String> {
    let mut effects = BTreeMap::new();
    if dpr == 1.0 {
        return effects;
    }
    let size = format!("{}px {}px", paint_box.width, paint_box.height);
    if property.starts_with("background") {
        effects.insert("background-size".to_owned(), size);
    } else if property.starts_with("mask") || property.starts_with("-webkit-mask") {
        effects.insert("mask-size".to_owned(), size.clone());
        effects.insert("-webkit-mask-size".to_owned(), size);
    } else if is_border_image(property) {
        effects.insert("border-color".to_owned(), "transparent".to_owned());
        effects.insert("image-rendering".to_owned(), "pixelated".to_owned());
    }
    effects
}

impl<H: Host> Engine<H> {
    /// Renders one target and writes what changed.
    pub(super) fn render(&mut self, host: &mut H, id: TargetId) {
        let node = self.targets.node(id).clone();
        let geometry = self.targets.geometry(id);
        let size = match geometry.size {
            Some(size) if geometry.live => size,
            _ => {
                let size = host.border_box(&node);
                self.targets.set_size(id, size);
                size
            }
        };
        let dpr = host.device_pixel_ratio();
        let mut cache = core::mem::take(&mut self.property_cache);
        cache.clear();

        let mut dependencies: Vec<String> = Vec::new();
        let mut authored: Vec<(String, String)> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        let mut referenced: Vec<String> = Vec::new();
        let mut invocations = 0_u32;
        let mut writes = 0_u32;

        let paintable = self.config.paintable_properties;
        for &property in paintable {
            let value = host.computed_value(&node, property);
            authored.push((property.to_owned(), value.trim().to_owned()));
            let tokens: Vec<PaintToken<'_>> = paint_tokens(&value).collect();
            if tokens.is_empty() {
                writes += self.clear_property(host, id, property);
                continue;
            }

            let paint_box = if is_border_image(property) {
                border_image_box(
                    size,
                    &host.computed_value(&node, "border-image-slice"),
                    &host.computed_value(&node, "border-image-outset"),
                )
            } else {
                size
            };

            let mut output = String::with_capacity(value.len());
            let mut cursor = 0;
            let mut references: Vec<String> = Vec::new();
            let mut urls: Vec<String> = Vec::new();
            let mut revocable: Vec<String> = Vec::new();
            for token in &tokens {
                output.push_str(&value[cursor..token.range.start]);
                cursor = token.range.end;
                let authored_token = &value[token.range.clone()];

                let Some(definition) = self.registry.resolve(token.name) else {
                    tracing::trace!(id = %id, procedure = token.name, "unresolved procedure");
                    if !unresolved.iter().any(|n| n == token.name) {
                        unresolved.push(token.name.to_owned());
                    }
                    output.push_str(authored_token);
                    continue;
                };
                let mut options = definition.context_options();
                dependencies.extend_from_slice(definition.input_properties());
                if is_border_image(property) {
                    options.scaling = false;
                }

                invocations += 1;
                let Some(reference) =
                    self.paint_one(host, id, &node, token.name, options, paint_box, dpr, &mut cache)
                else {
                    output.push_str(authored_token);
                    continue;
                };
                output.push_str(&reference.to_css());
                if let ImageReference::Url { url, revocable: r } = &reference {
                    urls.push(url.clone());
                    if *r {
                        revocable.push(url.clone());
                    }
                }
                if !references.iter().any(|n| n == token.name) {
                    references.push(token.name.to_owned());
                }
            }
            output.push_str(&value[cursor..]);

            if references.is_empty() {
                writes += self.clear_property(host, id, property);
                continue;
            }
            for name in &references {
                if !referenced.contains(name) {
                    referenced.push(name.clone());
                }
            }

            let effects = side_effects(property, paint_box, dpr);
            let previous = self.targets.painted(id).get(property).cloned();
            if previous
                .as_ref()
                .is_some_and(|p| p.value == output && p.side_effects == effects)
            {
                continue;
            }

            let rule = self.ensure_override_rule(host, id, &node);
            if let Some(previous) = &previous {
                for name in previous.side_effects.keys() {
                    if !effects.contains_key(name) && !self.side_effect_in_use(id, property, name) {
                        self.remove_override(host, id, &rule, name);
                        writes += 1;
                    }
                }
            }
            for (name, effect) in &effects {
                self.set_override(host, id, &rule, name, effect);
                writes += 1;
            }

            // Parked writes for this property are superseded.
            self.deferred
                .retain(|_, w| !(w.target == id && w.property == property));
            let preload = if urls.is_empty() {
                Preload::Ready
            } else {
                host.preload(&urls)
            };
            match preload {
                Preload::Ready => {
                    self.set_override(host, id, &rule, property, &output);
                    writes += 1;
                }
                Preload::Deferred(ticket) => {
                    tracing::trace!(id = %id, property, ticket, "override write deferred");
                    self.deferred.insert(
                        ticket,
                        DeferredWrite {
                            target: id,
                            property: property.to_owned(),
                            value: output.clone(),
                        },
                    );
                }
            }

            if let Some(previous) = &previous {
                for url in previous.revocable.iter().filter(|u| !revocable.contains(*u)) {
                    host.revoke(url);
                }
            }
            self.targets.painted_mut(id).insert(
                property.to_owned(),
                PaintedProperty {
                    value: output,
                    side_effects: effects,
                    references,
                    revocable,
                },
            );
        }

        self.targets.set_unresolved(id, unresolved);
        self.targets.retain_rasters(id, &referenced);

        // New baseline: declared dependencies, then every authored paintable
        // value, so a reference appearing on another property is noticed.
        let mut seen = Vec::with_capacity(dependencies.len());
        let mut baseline = Vec::with_capacity(dependencies.len() + authored.len());
        {
            let mut view = cache.view(&*host, &node, &self.properties);
            for name in dependencies {
                if seen.contains(&name) {
                    continue;
                }
                let value = view.get(&name);
                seen.push(name.clone());
                baseline.push((name, value));
            }
        }
        baseline.extend(authored.into_iter().filter(|(name, _)| !seen.contains(name)));
        self.targets.set_baseline(id, baseline);
        self.targets.set_rendered_size(id, size);
        cache.clear();
        self.property_cache = cache;

        // Keep a size subscription exactly while something is painted.
        let painting = !self.targets.painted(id).is_empty();
        let live = self.targets.geometry(id).live;
        if painting && !live {
            let observed = host.observe_size(&node);
            self.targets.set_live(id, observed);
        } else if !painting && live {
            host.unobserve_size(&node);
            self.targets.set_live(id, false);
        }

        tracing::trace!(id = %id, invocations, writes, "rendered target");
        tracer(&mut self.trace).render(&RenderEvent {
            target: id,
            invocations,
            writes,
            width: size.width,
            height: size.height,
        });
    }

    /// Paints one procedure into the target's raster surface and encodes it.
    ///
    /// Returns `None` when no surface could be allocated or encoding failed;
    /// the caller leaves the authored reference in place.
    fn paint_one(
        &mut self,
        host: &mut H,
        id: TargetId,
        node: &H::Node,
        name: &str,
        options: ContextOptions,
        paint_box: Size,
        dpr: f64,
        cache: &mut PropertyCache,
    ) -> Option<ImageReference> {
        let (logical, ratio) = raster_geometry(paint_box, dpr, options);
        let width = device_pixels(logical.width * ratio);
        let height = device_pixels(logical.height * ratio);

        match self.targets.raster_mut(id, name).map(|s| s.size()) {
            Some(current) if current == (width, height) => {}
            Some(_) => {
                if let Some(surface) = self.targets.raster_mut(id, name) {
                    surface.resize(width, height);
                }
            }
            None => {
                let native_id = format!("paint-{}-{name}", id.tracking_value());
                let Some(surface) = host.create_raster(width, height, &native_id) else {
                    tracing::warn!(
                        id = %id,
                        procedure = name,
                        width,
                        height,
                        "host could not allocate a raster surface"
                    );
                    return None;
                };
                self.targets.insert_raster(id, name, surface);
            }
        }

        let surface = self.targets.raster_mut(id, name)?;
        let (slot, instance) = self.registry.instance(name)?;
        let result = {
            let ctx = surface.context();
            ctx.reset_transform();
            ctx.clear_rect(Rect::new(0.0, 0.0, f64::from(width), f64::from(height)));
            ctx.set_image_smoothing(false);
            if ratio != 1.0 {
                ctx.scale(ratio, ratio);
            }
            let mut properties = cache.view(&*host, node, &self.properties);
            // A stray open path must not leak into the next clear.
            ctx.save();
            ctx.begin_path();
            let result = instance.paint(&mut *ctx, logical, &mut properties);
            ctx.close_path();
            ctx.restore();
            result
        };
        tracing::trace!(id = %id, procedure = name, ?slot, width, height, "painted");

        if let Err(err) = result {
            let message = err.to_string();
            tracing::warn!(id = %id, procedure = name, %err, "paint procedure failed");
            tracer(&mut self.trace).paint_fault(&PaintFaultEvent {
                target: id,
                procedure: name,
                message: &message,
            });
        }

        match surface.encode(name) {
            Ok(reference) => Some(reference),
            Err(err) => {
                tracing::warn!(id = %id, procedure = name, %err, "raster encoding failed");
                None
            }
        }
    }

    /// Removes a property's override, if it has one. Returns the number of
    /// declarations removed.
    fn clear_property(&mut self, host: &mut H, id: TargetId, property: &str) -> u32 {
        let Some(previous) = self.targets.painted_mut(id).remove(property) else {
            return 0;
        };
        self.deferred
            .retain(|_, w| !(w.target == id && w.property == property));
        for url in &previous.revocable {
            host.revoke(url);
        }
        let Some(rule) = self.targets.override_rule(id).cloned() else {
            return 0;
        };
        let mut writes = 1;
        self.remove_override(host, id, &rule, property);
        for name in previous.side_effects.keys() {
            if !self.side_effect_in_use(id, property, name) {
                self.remove_override(host, id, &rule, name);
                writes += 1;
            }
        }
        writes
    }

    /// Whether a painted property other than `except` still needs the
    /// side-effect declaration `name`.
    fn side_effect_in_use(&self, id: TargetId, except: &str, name: &str) -> bool {
        self.targets
            .painted(id)
            .iter()
            .any(|(property, painted)| property != except && painted.side_effects.contains_key(name))
    }

    /// Returns the target's override rule, creating it and the tracking
    /// attribute it selects on first use.
    fn ensure_override_rule(&mut self, host: &mut H, id: TargetId, node: &H::Node) -> H::OverrideRule {
        if let Some(rule) = self.targets.override_rule(id) {
            return rule.clone();
        }
        let attribute = self.config.tracking_attribute;
        let value = id.tracking_value().to_string();
        let rule = {
            let mut scope = HostScope::new(host, &self.observation_lock, Suppress::Observation);
            if scope.attribute(node, attribute).as_deref() != Some(value.as_str()) {
                scope.set_attribute(node, attribute, &value);
            }
            scope.insert_override_rule(&format!("[{attribute}=\"{value}\"]"))
        };
        tracing::trace!(id = %id, "created override rule");
        self.targets.set_override_rule(id, rule.clone());
        rule
    }

    fn set_override(
        &mut self,
        host: &mut H,
        id: TargetId,
        rule: &H::OverrideRule,
        property: &str,
        value: &str,
    ) {
        {
            let mut scope = HostScope::new(host, &self.observation_lock, Suppress::Observation);
            scope.set_override_property(rule, property, value, Priority::Important);
        }
        tracing::trace!(id = %id, property, "override set");
        tracer(&mut self.trace).override_write(&OverrideWriteEvent {
            target: id,
            property,
            kind: WriteKind::Set,
        });
    }

    fn remove_override(&mut self, host: &mut H, id: TargetId, rule: &H::OverrideRule, property: &str) {
        {
            let mut scope = HostScope::new(host, &self.observation_lock, Suppress::Observation);
            scope.remove_override_property(rule, property);
        }
        tracing::trace!(id = %id, property, "override removed");
        tracer(&mut self.trace).override_write(&OverrideWriteEvent {
            target: id,
            property,
            kind: WriteKind::Remove,
        });
    }

    /// Applies an override write that was waiting for `ticket`.
    ///
    /// The write is dropped if a later render replaced or removed the value.
    pub fn images_ready(&mut self, host: &mut H, ticket: u64) {
        let Some(write) = self.deferred.remove(&ticket) else {
            return;
        };
        let current = self
            .targets
            .painted(write.target)
            .get(&write.property)
            .map(|p| p.value.as_str());
        if current != Some(write.value.as_str()) {
            tracing::trace!(ticket, "deferred write superseded");
            return;
        }
        let Some(rule) = self.targets.override_rule(write.target).cloned() else {
            return;
        };
        self.set_override(host, write.target, &rule, &write.property, &write.value);
    }
}
