//! SVG rasterization with resvg.

use super::{FitMode, Rasterizer};
use crate::{Error, Result};
use resvg::{tiny_skia, usvg};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResvgRasterizer;

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, fit: FitMode) -> Result<Vec<u8>> {
        let options = usvg::Options::default();
        let tree = usvg::Tree::from_str(svg, &options).map_err(|e| Error::RasterError(e.to_string()))?;

        let native = tree.size().to_int_size();
        let target = match fit {
            FitMode::Original => Some(native),
            FitMode::Width(w) => native.scale_to_width(w),
            FitMode::Height(h) => native.scale_to_height(h),
            FitMode::Zoom(z) => native.scale_by(z),
        }
        .ok_or_else(|| Error::RasterError(format!("cannot fit {:?} to {:?}", native, fit)))?;

        let mut pixmap = tiny_skia::Pixmap::new(target.width(), target.height())
            .ok_or_else(|| Error::RasterError(format!("cannot allocate {}x{} pixmap", target.width(), target.height())))?;

        let transform = tiny_skia::Transform::from_scale(
            target.width() as f32 / tree.size().width(),
            target.height() as f32 / tree.size().height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap.encode_png().map_err(|e| Error::RasterError(e.to_string()))
    }
}

/// Read width/height from a PNG IHDR chunk.
pub fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    if png.len() < 24 || !png.starts_with(b"\x89PNG\r\n\x1a\n") || &png[12..16] != b"IHDR" {
        return None;
    }
    let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    Some((w, h))
}
