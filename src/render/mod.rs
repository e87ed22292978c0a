//! Rendering collaborators: layout computation (tree → SVG markup) and
//! rasterization (SVG markup → PNG bytes).
//!
//! The pipeline only talks to the [`LayoutEngine`] and [`Rasterizer`] traits.
//! With the `render` feature (default) the crate ships [`SvgLayoutEngine`]
//! (flexbox via `taffy`, text as glyph outlines via `skrifa`) and
//! [`ResvgRasterizer`].

use crate::font::FontResource;
use crate::layout::LayoutNode;
use crate::{Canvas, Result};
use futures::future::BoxFuture;

#[cfg(feature = "render")]
pub mod flex;
#[cfg(feature = "render")]
pub mod glyphs;
#[cfg(feature = "render")]
pub mod paint;
#[cfg(feature = "render")]
pub mod raster;
#[cfg(feature = "render")]
pub mod svg;

#[cfg(feature = "render")]
pub use raster::ResvgRasterizer;

/// Public-domain Tuffy face used by the text tests.
#[cfg(all(test, feature = "render"))]
pub(crate) const TEST_FONT: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/Tuffy.ttf"));
#[cfg(feature = "render")]
pub use svg::SvgLayoutEngine;

/// How the rasterizer sizes its output relative to the markup.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FitMode {
    /// Native declared size, no scaling
    #[default]
    Original,
    Width(u32),
    Height(u32),
    Zoom(f32),
}

/// Turns a layout tree into vector markup at a given canvas size.
pub trait LayoutEngine: Send + Sync {
    fn compute<'a>(
        &'a self,
        tree: LayoutNode,
        canvas: Canvas,
        fonts: &'a [FontResource],
    ) -> BoxFuture<'a, Result<String>>;
}

/// Turns vector markup into PNG bytes.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, fit: FitMode) -> Result<Vec<u8>>;
}
