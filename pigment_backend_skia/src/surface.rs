// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A `tiny-skia` pixmap with a canvas-style drawing state.
//!
//! Path points are mapped through the current transform when they are added,
//! so the path is always held in device space. Fills therefore draw with an
//! identity transform, and strokes scale their width by the transform in
//! effect when [`stroke`](PaintContext::stroke) is called.

use std::f64::consts::TAU;

use kurbo::{Affine, Arc, BezPath, PathEl, Point, Rect, Shape, Vec2};
use pigment_core::EncodeError;
use pigment_core::raster::{Color, ImageReference, PaintContext, RasterSurface};
use tiny_skia::{BlendMode, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::SkiaConfig;
use crate::encode::{ReferenceMode, reference};

/// Flattening tolerance for arcs, in device pixels.
const ARC_TOLERANCE: f64 = 0.1;

#[derive(Clone, Copy, Debug)]
struct DrawState {
    transform: Affine,
    fill: Color,
    stroke: Color,
    line_width: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
        }
    }
}

/// A raster surface backed by a `tiny_skia::Pixmap`.
///
/// A zero-area surface holds no pixmap: drawing into it does nothing and
/// encoding it fails with [`EncodeError::EmptySurface`].
#[derive(Debug)]
pub struct SkiaSurface {
    pixmap: Option<Pixmap>,
    width: u32,
    height: u32,
    native_id: String,
    anti_alias: bool,
    references: ReferenceMode,
    state: DrawState,
    stack: Vec<DrawState>,
    path: BezPath,
    current: Option<Point>,
    smoothing: bool,
}

impl SkiaSurface {
    /// Creates a transparent `width × height` surface.
    ///
    /// `native_id` is the identifier used for native references.
    #[must_use]
    pub fn new(width: u32, height: u32, native_id: &str, config: &SkiaConfig) -> Self {
        Self {
            pixmap: Pixmap::new(width, height),
            width,
            height,
            native_id: native_id.to_owned(),
            anti_alias: config.anti_alias,
            references: config.references.clone(),
            state: DrawState::default(),
            stack: Vec::new(),
            path: BezPath::new(),
            current: None,
            smoothing: true,
        }
    }

    /// Returns the un-premultiplied RGBA value at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Whether image smoothing is enabled.
    #[must_use]
    pub fn image_smoothing(&self) -> bool {
        self.smoothing
    }

    /// The identifier used for native references.
    #[must_use]
    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    fn paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(to_skia(color));
        paint.anti_alias = self.anti_alias;
        paint
    }

    fn push(&mut self, el: PathEl) {
        self.path.push(self.state.transform * el);
    }

    fn fill_device_path(&mut self, path: &BezPath, paint: &Paint<'_>) {
        let Some(path) = to_skia_path(path) else {
            return;
        };
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn rect_path(&self, rect: Rect) -> BezPath {
        self.state.transform * rect.to_path(0.0)
    }
}

impl PaintContext for SkiaSurface {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform *= Affine::scale_non_uniform(sx, sy);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform *= Affine::translate(Vec2::new(dx, dy));
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
    }

    fn clear_rect(&mut self, rect: Rect) {
        let mut paint = self.paint(Color::BLACK);
        paint.blend_mode = BlendMode::Clear;
        paint.anti_alias = false;
        let path = self.rect_path(rect);
        self.fill_device_path(&path, &paint);
    }

    fn begin_path(&mut self) {
        self.path = BezPath::new();
        self.current = None;
    }

    fn close_path(&mut self) {
        if self.current.is_some() {
            self.path.close_path();
        }
    }

    fn move_to(&mut self, p: Point) {
        self.push(PathEl::MoveTo(p));
        self.current = Some(p);
    }

    fn line_to(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_to(p);
            return;
        }
        self.push(PathEl::LineTo(p));
        self.current = Some(p);
    }

    fn rect(&mut self, rect: Rect) {
        self.move_to(Point::new(rect.x0, rect.y0));
        self.line_to(Point::new(rect.x1, rect.y0));
        self.line_to(Point::new(rect.x1, rect.y1));
        self.line_to(Point::new(rect.x0, rect.y1));
        self.path.close_path();
        self.current = Some(Point::new(rect.x0, rect.y0));
    }

    fn arc(&mut self, center: Point, radius: f64, start_angle: f64, end_angle: f64) {
        let sweep = end_angle - start_angle;
        let sweep = if sweep >= TAU { TAU } else { sweep.rem_euclid(TAU) };
        let arc = Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        let start = center + Vec2::from_angle(start_angle) * radius;
        self.line_to(start);
        for el in arc.append_iter(ARC_TOLERANCE) {
            self.push(el);
        }
        self.current = Some(center + Vec2::from_angle(start_angle + sweep) * radius);
    }

    fn set_fill_style(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_stroke_style(&mut self, color: Color) {
        self.state.stroke = color;
    }

    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    fn fill(&mut self) {
        let paint = self.paint(self.state.fill);
        let path = self.path.clone();
        self.fill_device_path(&path, &paint);
    }

    fn stroke(&mut self) {
        let Some(path) = to_skia_path(&self.path) else {
            return;
        };
        let paint = self.paint(self.state.stroke);
        let stroke = Stroke {
            width: to_f32(self.state.line_width * self.state.transform.determinant().abs().sqrt()),
            ..Stroke::default()
        };
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    fn fill_rect(&mut self, rect: Rect) {
        let paint = self.paint(self.state.fill);
        let path = self.rect_path(rect);
        self.fill_device_path(&path, &paint);
    }

    fn set_image_smoothing(&mut self, enabled: bool) {
        self.smoothing = enabled;
    }
}

impl RasterSurface for SkiaSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixmap = Pixmap::new(width, height);
        self.width = width;
        self.height = height;
        self.state = DrawState::default();
        self.stack.clear();
        self.begin_path();
    }

    fn context(&mut self) -> &mut dyn PaintContext {
        self
    }

    fn encode(&mut self, procedure: &str) -> Result<ImageReference, EncodeError> {
        let pixmap = self.pixmap.as_ref().ok_or(EncodeError::EmptySurface)?;
        let encoded = reference(&self.references, procedure, &self.native_id, || {
            pixmap.encode_png().map_err(|e| e.to_string())
        })
        .map_err(EncodeError::Png)?;
        tracing::trace!(
            procedure,
            width = self.width,
            height = self.height,
            "encoded surface"
        );
        Ok(encoded)
    }
}

fn to_skia(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
        color.a.clamp(0.0, 1.0),
    )
    .unwrap_or(tiny_skia::Color::TRANSPARENT)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32 device coordinates"
)]
fn to_f32(v: f64) -> f32 {
    v as f32
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    let p = |pt: Point| (to_f32(pt.x), to_f32(pt.y));
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(a) => {
                let (x, y) = p(a);
                builder.move_to(x, y);
            }
            PathEl::LineTo(a) => {
                let (x, y) = p(a);
                builder.line_to(x, y);
            }
            PathEl::QuadTo(a, b) => {
                let ((x1, y1), (x, y)) = (p(a), p(b));
                builder.quad_to(x1, y1, x, y);
            }
            PathEl::CurveTo(a, b, c) => {
                let ((x1, y1), (x2, y2), (x, y)) = (p(a), p(b), p(c));
                builder.cubic_to(x1, y1, x2, y2, x, y);
            }
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}
