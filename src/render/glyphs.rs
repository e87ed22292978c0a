//! Font metrics and glyph outlines via skrifa.

use crate::{Error, Result};
use kurbo::{BezPath, Point};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::{FontRef, GlyphId, MetadataProvider};

/// A parsed face used for measuring and outlining caption text.
pub struct FontFace<'a> {
    font: FontRef<'a>,
}

/// Vertical metrics scaled to a font size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from the top of the line box to the baseline
    pub ascent: f32,
    pub line_height: f32,
}

impl<'a> FontFace<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let font = FontRef::new(bytes).map_err(|e| Error::LayoutError(format!("unreadable font data: {}", e)))?;
        Ok(Self { font })
    }

    fn glyph_id(&self, ch: char) -> GlyphId {
        self.font.charmap().map(ch).unwrap_or(GlyphId::NOTDEF)
    }

    pub fn advance(&self, ch: char, size: f32) -> f32 {
        if ch == '\n' {
            return 0.0;
        }
        self.font
            .glyph_metrics(Size::new(size), LocationRef::default())
            .advance_width(self.glyph_id(ch))
            .unwrap_or(0.0)
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let metrics = self.font.glyph_metrics(Size::new(size), LocationRef::default());
        text.chars()
            .filter(|c| *c != '\n')
            .map(|c| metrics.advance_width(self.glyph_id(c)).unwrap_or(0.0))
            .sum()
    }

    pub fn line_metrics(&self, size: f32) -> LineMetrics {
        let m = self.font.metrics(Size::new(size), LocationRef::default());
        let height = m.ascent - m.descent + m.leading;
        let line_height = if height > 0.0 { height } else { size * 1.2 };
        LineMetrics {
            ascent: m.ascent + m.leading / 2.0,
            line_height,
        }
    }

    /// Outline a run of text starting at `origin` (baseline-left), in canvas
    /// coordinates (y grows downwards).
    pub fn text_path(&self, text: &str, size: f32, origin: Point) -> BezPath {
        let outlines = self.font.outline_glyphs();
        let metrics = self.font.glyph_metrics(Size::new(size), LocationRef::default());
        let mut pen = CanvasPen {
            path: BezPath::new(),
            origin,
        };

        for ch in text.chars() {
            let gid = self.glyph_id(ch);
            if let Some(glyph) = outlines.get(gid) {
                let settings = DrawSettings::unhinted(Size::new(size), LocationRef::default());
                if let Err(e) = glyph.draw(settings, &mut pen) {
                    log::warn!("failed to outline glyph for {:?}: {}", ch, e);
                }
            }
            pen.origin.x += metrics.advance_width(gid).unwrap_or(0.0) as f64;
        }
        pen.path
    }
}

/// Records scaled outline commands, flipping the y axis around the baseline.
struct CanvasPen {
    path: BezPath,
    origin: Point,
}

impl CanvasPen {
    fn pt(&self, x: f32, y: f32) -> Point {
        Point::new(self.origin.x + x as f64, self.origin.y - y as f64)
    }
}

impl OutlinePen for CanvasPen {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.pt(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.pt(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let (c, p) = (self.pt(cx0, cy0), self.pt(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (c0, c1, p) = (self.pt(cx0, cy0), self.pt(cx1, cy1), self.pt(x, y));
        self.path.curve_to(c0, c1, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}
