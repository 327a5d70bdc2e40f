// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `tiny-skia` raster backend for pigment.
//!
//! This crate provides:
//!
//! - [`SkiaSurface`]: a [`RasterSurface`](pigment_core::raster::RasterSurface)
//!   and [`PaintContext`](pigment_core::raster::PaintContext) over a
//!   `tiny_skia::Pixmap`.
//! - [`SkiaConfig`] and [`ReferenceMode`]: how encoded images are referenced.
//! - [`BlobStore`]: the shared byte store behind revocable references.
//!
//! A host typically keeps one [`SkiaConfig`] and builds a surface from it in
//! its `create_raster`:
//!
//! ```
//! use pigment_backend_skia::{SkiaConfig, SkiaSurface};
//! use pigment_core::raster::RasterSurface;
//!
//! let config = SkiaConfig::default();
//! let mut surface = SkiaSurface::new(16, 8, "paint-1-dots", &config);
//! assert_eq!(surface.size(), (16, 8));
//! let reference = surface.encode("dots").unwrap();
//! assert!(reference.to_css().starts_with("url(\"data:image/paint-dots;base64,"));
//! ```

mod encode;
mod surface;

pub use encode::{BlobStore, ReferenceMode, SkiaConfig};
pub use surface::SkiaSurface;
