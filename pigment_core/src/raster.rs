// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster surface contract.
//!
//! Backends implement [`RasterSurface`] for whatever pixel store they render
//! into, and hand the engine a [`PaintContext`] to draw with. The drawing
//! vocabulary is deliberately small: it is the subset of a 2D canvas context
//! the engine itself relies on (path brackets, state stack, scaling, clears)
//! plus enough primitives for procedures to draw shapes.

use core::fmt;

use kurbo::{Point, Rect};

use crate::error::EncodeError;

/// A straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red, 0–255.
    pub r: u8,
    /// Green, 0–255.
    pub g: u8,
    /// Blue, 0–255.
    pub b: u8,
    /// Alpha, 0.0–1.0.
    pub a: f32,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// A color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and a
    /// handful of keywords.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = text
            .strip_prefix("rgba(")
            .or_else(|| text.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            let channel = |s: &str| s.parse::<u8>().ok();
            return match parts.as_slice() {
                [r, g, b] => Some(Self::rgb(channel(r)?, channel(g)?, channel(b)?)),
                [r, g, b, a] => Some(Self::rgba(
                    channel(r)?,
                    channel(g)?,
                    channel(b)?,
                    a.parse::<f32>().ok()?.clamp(0.0, 1.0),
                )),
                _ => None,
            };
        }
        match text.to_ascii_lowercase().as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::rgb(255, 255, 255)),
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "hotpink" => Some(Self::rgb(255, 105, 180)),
            _ => None,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        6 => Some(Color::rgb(pair(0)?, pair(2)?, pair(4)?)),
        _ => None,
    }
}

/// Drawing operations available to a paint procedure.
///
/// Coordinates are in logical pixels; the engine applies the device pixel
/// ratio with [`scale`](Self::scale) before the procedure runs.
pub trait PaintContext {
    /// Pushes the current transform, styles and line width.
    fn save(&mut self);
    /// Pops state pushed by [`save`](Self::save). Unbalanced calls are ignored.
    fn restore(&mut self);
    /// Post-multiplies the current transform by a scale.
    fn scale(&mut self, sx: f64, sy: f64);
    /// Post-multiplies the current transform by a translation.
    fn translate(&mut self, dx: f64, dy: f64);
    /// Resets the current transform to identity.
    fn reset_transform(&mut self);
    /// Clears `rect` to transparent.
    fn clear_rect(&mut self, rect: Rect);
    /// Starts a new, empty path.
    fn begin_path(&mut self);
    /// Closes the current subpath.
    fn close_path(&mut self);
    /// Starts a subpath at `p`.
    fn move_to(&mut self, p: Point);
    /// Adds a line to `p`.
    fn line_to(&mut self, p: Point);
    /// Adds a closed rectangle subpath.
    fn rect(&mut self, rect: Rect);
    /// Adds a circular arc around `center`, angles in radians, clockwise.
    fn arc(&mut self, center: Point, radius: f64, start_angle: f64, end_angle: f64);
    /// Sets the fill color.
    fn set_fill_style(&mut self, color: Color);
    /// Sets the stroke color.
    fn set_stroke_style(&mut self, color: Color);
    /// Sets the stroke width.
    fn set_line_width(&mut self, width: f64);
    /// Fills the current path.
    fn fill(&mut self);
    /// Strokes the current path.
    fn stroke(&mut self);
    /// Fills `rect` without touching the current path.
    fn fill_rect(&mut self, rect: Rect);
    /// Enables or disables smoothing when images are scaled.
    fn set_image_smoothing(&mut self, enabled: bool);
}

/// A resource the host can reference from a declaration value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageReference {
    /// A complete CSS value the host resolves natively, such as
    /// `-webkit-canvas(paint-3-dots)`.
    Native(String),
    /// A URL, wrapped in `url("…")` when written.
    Url {
        /// The URL.
        url: String,
        /// Whether the host must be told once the URL is superseded.
        revocable: bool,
    },
}

impl ImageReference {
    /// Returns the CSS value that references this resource.
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Native(css) => css.clone(),
            Self::Url { url, .. } => format!("url(\"{url}\")"),
        }
    }

    /// Returns the URL if this is a URL reference.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Native(_) => None,
            Self::Url { url, .. } => Some(url),
        }
    }
}

/// A pixel buffer owned by one target and reused across its renders.
pub trait RasterSurface: fmt::Debug {
    /// Current size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Reallocates to `width × height`, discarding contents and drawing state.
    fn resize(&mut self, width: u32, height: u32);

    /// Returns the drawing context.
    fn context(&mut self) -> &mut dyn PaintContext;

    /// Encodes the current contents into a resource named after `procedure`.
    fn encode(&mut self, procedure: &str) -> Result<ImageReference, EncodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Color::parse("#f00"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse(" #336699 "), Some(Color::rgb(0x33, 0x66, 0x99)));
        assert_eq!(Color::parse("#12345"), None);
    }

    #[test]
    fn parses_functional_colors() {
        assert_eq!(Color::parse("rgb(1, 2, 3)"), Some(Color::rgb(1, 2, 3)));
        assert_eq!(
            Color::parse("rgba(10,20,30,0.5)"),
            Some(Color::rgba(10, 20, 30, 0.5))
        );
        assert_eq!(Color::parse("rgb(300, 0, 0)"), None);
    }

    #[test]
    fn parses_keywords() {
        assert_eq!(Color::parse("HotPink"), Some(Color::rgb(255, 105, 180)));
        assert_eq!(Color::parse("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn reference_css() {
        let url = ImageReference::Url {
            url: "data:image/paint-dots;base64,AAAA".into(),
            revocable: false,
        };
        assert_eq!(url.to_css(), r#"url("data:image/paint-dots;base64,AAAA")"#);
        assert_eq!(url.url(), Some("data:image/paint-dots;base64,AAAA"));

        let native = ImageReference::Native("-webkit-canvas(paint-1-dots)".into());
        assert_eq!(native.to_css(), "-webkit-canvas(paint-1-dots)");
        assert_eq!(native.url(), None);
    }
}
