// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sample paint procedures.

use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::Rc;

use kurbo::{Point, Rect, Size};
use pigment_core::geometry::resolve_length;
use pigment_core::properties::Properties;
use pigment_core::raster::{Color, PaintContext};
use pigment_core::{PaintDefinition, PaintError, PaintInstance};

fn whole_box(size: Size) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, size)
}

/// Fills the box with one color.
#[derive(Clone, Copy, Debug)]
pub struct SolidFill {
    color: Color,
}

impl PaintInstance for SolidFill {
    fn paint(
        &mut self,
        ctx: &mut dyn PaintContext,
        size: Size,
        _properties: &mut dyn Properties,
    ) -> Result<(), PaintError> {
        ctx.set_fill_style(self.color);
        ctx.fill_rect(whole_box(size));
        Ok(())
    }
}

/// A procedure filling its box with `color`. It reads no properties.
#[must_use]
pub fn solid(name: &str, color: Color) -> PaintDefinition {
    PaintDefinition::new(name, move || Box::new(SolidFill { color }))
}

/// Properties read by [`ripple`].
pub const RIPPLE_INPUTS: [&str; 5] = [
    "background-color",
    "--ripple-color",
    "--animation-tick",
    "--ripple-x",
    "--ripple-y",
];

/// The classic ripple: a background fill with a disc growing from
/// (`--ripple-x`, `--ripple-y`) and fading as `--animation-tick` runs from
/// 0 to 1000.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ripple;

impl PaintInstance for Ripple {
    fn paint(
        &mut self,
        ctx: &mut dyn PaintContext,
        size: Size,
        properties: &mut dyn Properties,
    ) -> Result<(), PaintError> {
        let background =
            Color::parse(&properties.get("background-color")).unwrap_or(Color::TRANSPARENT);
        let color = Color::parse(&properties.get("--ripple-color")).unwrap_or(Color::BLACK);
        let tick = properties
            .get("--animation-tick")
            .trim()
            .parse::<f32>()
            .unwrap_or(0.0)
            .clamp(0.0, 1000.0);
        let x = resolve_length(&properties.get("--ripple-x"), size.width);
        let y = resolve_length(&properties.get("--ripple-y"), size.height);

        ctx.set_fill_style(background);
        ctx.fill_rect(whole_box(size));
        if tick > 0.0 {
            ctx.set_fill_style(Color {
                a: color.a * (1.0 - tick / 1000.0),
                ..color
            });
            ctx.begin_path();
            ctx.arc(Point::new(x, y), size.width * f64::from(tick) / 1000.0, 0.0, TAU);
            ctx.fill();
        }
        Ok(())
    }
}

/// The ripple procedure under `name`.
#[must_use]
pub fn ripple(name: &str) -> PaintDefinition {
    PaintDefinition::new(name, || Box::new(Ripple)).with_input_properties(RIPPLE_INPUTS)
}

/// Draws half its box, then fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faulty;

impl PaintInstance for Faulty {
    fn paint(
        &mut self,
        ctx: &mut dyn PaintContext,
        size: Size,
        _properties: &mut dyn Properties,
    ) -> Result<(), PaintError> {
        ctx.set_fill_style(Color::rgb(255, 0, 0));
        ctx.fill_rect(Rect::new(0.0, 0.0, size.width / 2.0, size.height));
        // Left open on purpose: the engine closes it.
        ctx.begin_path();
        ctx.move_to(Point::ORIGIN);
        Err(PaintError::Fault("ran out of ink".to_owned()))
    }
}

/// The failing procedure under `name`.
#[must_use]
pub fn faulty(name: &str) -> PaintDefinition {
    PaintDefinition::new(name, || Box::new(Faulty))
}

/// One recorded [`Probe`] invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeCall {
    /// Serial number of the instance that ran, from 1 in construction order.
    pub instance: u32,
    /// Box handed to the procedure.
    pub size: Size,
    /// Input property values as the procedure read them.
    pub properties: Vec<(String, String)>,
}

/// Shared record of probe invocations.
///
/// Clones share the same log, so a test keeps one handle while the engine
/// owns the instances.
#[derive(Clone, Debug, Default)]
pub struct ProbeLog {
    calls: Rc<RefCell<Vec<ProbeCall>>>,
    instances: Rc<Cell<u32>>,
}

impl ProbeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A procedure under `name` that reads `inputs`, records each call here
    /// and fills its box black.
    #[must_use]
    pub fn definition(&self, name: &str, inputs: &[&str]) -> PaintDefinition {
        let inputs: Vec<String> = inputs.iter().map(|s| (*s).to_owned()).collect();
        let log = self.clone();
        let read = inputs.clone();
        PaintDefinition::new(name, move || {
            let serial = log.instances.get() + 1;
            log.instances.set(serial);
            Box::new(Probe {
                serial,
                inputs: read.clone(),
                log: log.clone(),
            })
        })
        .with_input_properties(inputs)
    }

    /// Every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.borrow().clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Whether nothing has been called.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of instances constructed.
    #[must_use]
    pub fn instances(&self) -> u32 {
        self.instances.get()
    }
}

/// A recording procedure built by [`ProbeLog::definition`].
#[derive(Debug)]
pub struct Probe {
    serial: u32,
    inputs: Vec<String>,
    log: ProbeLog,
}

impl PaintInstance for Probe {
    fn paint(
        &mut self,
        ctx: &mut dyn PaintContext,
        size: Size,
        properties: &mut dyn Properties,
    ) -> Result<(), PaintError> {
        let values = self
            .inputs
            .iter()
            .map(|name| (name.clone(), properties.get(name)))
            .collect();
        self.log.calls.borrow_mut().push(ProbeCall {
            instance: self.serial,
            size,
            properties: values,
        });
        ctx.set_fill_style(Color::BLACK);
        ctx.fill_rect(whole_box(size));
        Ok(())
    }
}
