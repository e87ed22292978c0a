//! Paint commands derived from positioned layout boxes.

use super::flex::{BoxKind, LayoutBox, Rect};
use super::glyphs::FontFace;
use crate::layout::{Color, Radius};
use kurbo::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Filled (optionally rounded) rectangle
    FillRect { rect: Rect, radius: f32, color: Color },
    /// Stroke drawn inside the rectangle's border box
    StrokeRect {
        rect: Rect,
        radius: f32,
        width: f32,
        color: Color,
    },
    /// Raster image clipped to a rounded rectangle
    Image { rect: Rect, radius: f32, href: String },
    /// Glyph outlines as SVG path data
    Glyphs { path: String, color: Color },
}

fn corner_radius(radius: Option<Radius>, rect: &Rect) -> f32 {
    match radius {
        None => 0.0,
        Some(Radius::Px(r)) => r,
        Some(Radius::Percent(p)) => rect.width.min(rect.height) * p / 100.0,
    }
    .min(rect.width.min(rect.height) / 2.0)
    .max(0.0)
}

/// Flatten a box tree into painter's-order commands (parents before children).
pub fn paint(root: &LayoutBox, face: Option<&FontFace<'_>>) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    paint_box(root, face, &mut out);
    out
}

fn paint_box(b: &LayoutBox, face: Option<&FontFace<'_>>, out: &mut Vec<PaintCommand>) {
    let radius = corner_radius(b.style.border_radius, &b.rect);

    if let Some(color) = b.style.background {
        out.push(PaintCommand::FillRect {
            rect: b.rect,
            radius,
            color,
        });
    }

    match &b.kind {
        BoxKind::Container => {}
        BoxKind::Image { src } => out.push(PaintCommand::Image {
            rect: b.rect,
            radius,
            href: src.clone(),
        }),
        BoxKind::Text { lines, text_style } => {
            if let Some(face) = face {
                let metrics = face.line_metrics(text_style.font_size);
                let mut path = kurbo::BezPath::new();
                for (i, line) in lines.iter().enumerate() {
                    let baseline = b.rect.y + metrics.ascent + i as f32 * metrics.line_height;
                    let origin = Point::new(b.rect.x as f64, baseline as f64);
                    let run = face.text_path(&line.text, text_style.font_size, origin);
                    path.extend(run.elements().iter().copied());
                }
                if !path.elements().is_empty() {
                    out.push(PaintCommand::Glyphs {
                        path: path.to_svg(),
                        color: text_style.color,
                    });
                }
            }
        }
    }

    if let Some(border) = b.style.border {
        if border.width > 0.0 {
            out.push(PaintCommand::StrokeRect {
                rect: b.rect,
                radius,
                width: border.width,
                color: border.color,
            });
        }
    }

    for child in &b.children {
        paint_box(child, face, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Border, Style};

    fn image_box() -> LayoutBox {
        LayoutBox {
            rect: Rect { x: 10.0, y: 20.0, width: 150.0, height: 150.0 },
            style: Style {
                border: Some(Border { width: 1.0, color: Color::BLACK }),
                border_radius: Some(Radius::Percent(50.0)),
                ..Style::default()
            },
            kind: BoxKind::Image { src: "data:image/png;base64,AAAA".into() },
            children: Vec::new(),
        }
    }

    #[test]
    fn image_is_clipped_to_circle_and_bordered() {
        let cmds = paint(&image_box(), None);
        assert_eq!(cmds.len(), 2);
        match &cmds[0] {
            PaintCommand::Image { radius, .. } => assert_eq!(*radius, 75.0),
            other => panic!("unexpected {:?}", other),
        }
        match &cmds[1] {
            PaintCommand::StrokeRect { width, color, .. } => {
                assert_eq!(*width, 1.0);
                assert_eq!(*color, Color::BLACK);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn background_is_painted_before_children() {
        let root = LayoutBox {
            rect: Rect { x: 0.0, y: 0.0, width: 1200.0, height: 630.0 },
            style: Style {
                background: Some(Color::LIGHT_BLUE),
                ..Style::default()
            },
            kind: BoxKind::Container,
            children: vec![image_box()],
        };
        let cmds = paint(&root, None);
        assert!(matches!(cmds[0], PaintCommand::FillRect { color: Color::LIGHT_BLUE, .. }));
        assert!(matches!(cmds[1], PaintCommand::Image { .. }));
    }
}
