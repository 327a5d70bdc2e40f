// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint box resolution for property families with their own geometry.

use kurbo::{Insets, Size};

/// Resolves one length against `base`.
///
/// Pixel values are taken as-is and percentages scale `base`. Anything else,
/// including unitless numbers and the empty string, contributes nothing.
#[must_use]
pub fn resolve_length(value: &str, base: f64) -> f64 {
    let value = value.trim();
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse::<f64>().unwrap_or(0.0);
    }
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f64>().map_or(0.0, |p| base * p / 100.0);
    }
    0.0
}

/// Parses a 1–4 value side shorthand (`top right bottom left`) into insets.
///
/// Horizontal sides resolve against the box width, vertical sides against its
/// height. The `fill` keyword of `border-image-slice` is ignored.
#[must_use]
pub fn resolve_sides(value: &str, size: Size) -> Insets {
    let parts: Vec<&str> = value
        .split_whitespace()
        .filter(|part| !part.eq_ignore_ascii_case("fill"))
        .collect();
    let (top, right, bottom, left) = match parts.as_slice() {
        [] => return Insets::ZERO,
        [all] => (*all, *all, *all, *all),
        [v, h] => (*v, *h, *v, *h),
        [t, h, b] => (*t, *h, *b, *h),
        [t, r, b, l, ..] => (*t, *r, *b, *l),
    };
    Insets::new(
        resolve_length(left, size.width),
        resolve_length(top, size.height),
        resolve_length(right, size.width),
        resolve_length(bottom, size.height),
    )
}

/// Returns the box a `border-image` procedure paints into.
///
/// The slice insets are removed from every side of `size` and the outset is
/// added back. The result never goes negative.
#[must_use]
pub fn border_image_box(size: Size, slice: &str, outset: &str) -> Size {
    let slice = resolve_sides(slice, size);
    let outset = resolve_sides(outset, size);
    Size::new(
        (size.width - slice.x_value() + outset.x_value()).max(0.0),
        (size.height - slice.y_value() + outset.y_value()).max(0.0),
    )
}

/// Whether `property` belongs to the `border-image` family.
#[must_use]
pub fn is_border_image(property: &str) -> bool {
    property.starts_with("border-image")
}
