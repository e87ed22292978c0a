//! Flexbox layout of a [`LayoutNode`] tree using taffy.
//!
//! Produces absolutely positioned [`LayoutBox`]es. Text spans are measured
//! with the caption face and wrap inside themselves only when a single span
//! is wider than the space it is given.

use super::glyphs::FontFace;
use crate::layout::{self, Color, Dimension, LayoutNode, Style};
use crate::{Canvas, Error, Result};
use taffy::prelude::{AvailableSpace, NodeId, Rect as TRect, Size, TaffyTree};
use taffy::style::{
    AlignItems, Dimension as TDimension, Display, FlexDirection, FlexWrap, LengthPercentage,
    LengthPercentageAuto,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Text properties after inheritance.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            color: Color::BLACK,
        }
    }
}

impl TextStyle {
    fn inherit(&self, style: &Style) -> Self {
        Self {
            font_size: style.font_size.unwrap_or(self.font_size),
            color: style.color.unwrap_or(self.color),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxKind {
    Container,
    Image { src: String },
    Text { lines: Vec<TextLine>, text_style: TextStyle },
}

/// A node with its final border-box geometry in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub style: Style,
    pub kind: BoxKind,
    pub children: Vec<LayoutBox>,
}

struct TextLeaf {
    text: String,
    text_style: TextStyle,
}

/// Slack allowed when comparing measured text against a box width.
const WRAP_TOLERANCE: f32 = 0.5;

/// Greedy per-character wrapping of one span. `max_width` of `None` means
/// unbounded (a single line). A span that fits is never split.
pub fn wrap_text(face: &FontFace<'_>, text: &str, size: f32, max_width: Option<f32>) -> Vec<TextLine> {
    let total = face.text_width(text, size);
    if max_width.map_or(true, |max| total <= max + WRAP_TOLERANCE) {
        return vec![TextLine {
            text: text.to_string(),
            width: total,
        }];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0f32;

    for ch in text.chars() {
        let advance = face.advance(ch, size);
        let overflow = max_width.map_or(false, |max| width + advance > max + WRAP_TOLERANCE);
        if overflow && !current.is_empty() && !ch.is_whitespace() {
            lines.push(TextLine {
                text: std::mem::take(&mut current),
                width,
            });
            width = 0.0;
        }
        current.push(ch);
        width += advance;
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(TextLine { text: current, width });
    }
    lines
}

fn to_dimension(d: Dimension) -> TDimension {
    match d {
        Dimension::Auto => TDimension::auto(),
        Dimension::Px(v) => TDimension::length(v),
        Dimension::Percent(p) => TDimension::percent(p / 100.0),
    }
}

fn to_taffy_style(style: &Style) -> taffy::Style {
    let border = style.border.map(|b| b.width).unwrap_or(0.0);
    taffy::Style {
        display: Display::Flex,
        flex_direction: match style.flex_direction {
            layout::FlexDirection::Row => FlexDirection::Row,
            layout::FlexDirection::Column => FlexDirection::Column,
        },
        flex_wrap: match style.flex_wrap {
            layout::FlexWrap::NoWrap => FlexWrap::NoWrap,
            layout::FlexWrap::Wrap => FlexWrap::Wrap,
        },
        align_items: style.align_items.map(|a| match a {
            layout::AlignItems::Start => AlignItems::FlexStart,
            layout::AlignItems::Center => AlignItems::Center,
            layout::AlignItems::End => AlignItems::FlexEnd,
            layout::AlignItems::Stretch => AlignItems::Stretch,
        }),
        size: Size {
            width: to_dimension(style.width),
            height: to_dimension(style.height),
        },
        padding: TRect {
            left: LengthPercentage::length(style.padding.left),
            right: LengthPercentage::length(style.padding.right),
            top: LengthPercentage::length(style.padding.top),
            bottom: LengthPercentage::length(style.padding.bottom),
        },
        margin: TRect {
            left: LengthPercentageAuto::length(style.margin.left),
            right: LengthPercentageAuto::length(style.margin.right),
            top: LengthPercentageAuto::length(style.margin.top),
            bottom: LengthPercentageAuto::length(style.margin.bottom),
        },
        border: TRect {
            left: LengthPercentage::length(border),
            right: LengthPercentage::length(border),
            top: LengthPercentage::length(border),
            bottom: LengthPercentage::length(border),
        },
        ..taffy::Style::default()
    }
}

fn build(
    taffy: &mut TaffyTree<TextLeaf>,
    node: &LayoutNode,
    inherited: &TextStyle,
) -> std::result::Result<NodeId, taffy::TaffyError> {
    let text_style = inherited.inherit(node.style());
    let style = to_taffy_style(node.style());
    match node {
        LayoutNode::Container { children, .. } => {
            let ids = children
                .iter()
                .map(|child| build(taffy, child, &text_style))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            taffy.new_with_children(style, &ids)
        }
        LayoutNode::Image { .. } => taffy.new_leaf(style),
        LayoutNode::TextSpan { text, .. } => taffy.new_leaf_with_context(
            style,
            TextLeaf {
                text: text.clone(),
                text_style,
            },
        ),
    }
}

fn collect(
    taffy: &TaffyTree<TextLeaf>,
    id: NodeId,
    node: &LayoutNode,
    origin: (f32, f32),
    inherited: &TextStyle,
    face: Option<&FontFace<'_>>,
) -> Result<LayoutBox> {
    let l = taffy.layout(id).map_err(|e| Error::LayoutError(e.to_string()))?;
    let rect = Rect {
        x: origin.0 + l.location.x,
        y: origin.1 + l.location.y,
        width: l.size.width,
        height: l.size.height,
    };
    let text_style = inherited.inherit(node.style());

    let (kind, children) = match node {
        LayoutNode::Container { children, .. } => {
            let child_ids = taffy.children(id).map_err(|e| Error::LayoutError(e.to_string()))?;
            let boxes = child_ids
                .into_iter()
                .zip(children)
                .map(|(cid, child)| collect(taffy, cid, child, (rect.x, rect.y), &text_style, face))
                .collect::<Result<Vec<_>>>()?;
            (BoxKind::Container, boxes)
        }
        LayoutNode::Image { src, .. } => (BoxKind::Image { src: src.clone() }, Vec::new()),
        LayoutNode::TextSpan { text, .. } => {
            let face = face.ok_or_else(|| Error::LayoutError("no font available for text".into()))?;
            let lines = wrap_text(face, text, text_style.font_size, Some(rect.width));
            (BoxKind::Text { lines, text_style }, Vec::new())
        }
    };

    Ok(LayoutBox {
        rect,
        style: node.style().clone(),
        kind,
        children,
    })
}

/// Compute the flex layout of `tree` inside `canvas`.
pub fn compute_boxes(tree: &LayoutNode, canvas: Canvas, face: Option<&FontFace<'_>>) -> Result<LayoutBox> {
    let mut has_text = false;
    tree.walk(&mut |n| has_text |= matches!(n, LayoutNode::TextSpan { .. }));
    if has_text && face.is_none() {
        return Err(Error::LayoutError("no font available for text".into()));
    }

    let mut taffy: TaffyTree<TextLeaf> = TaffyTree::new();
    // Text is wrapped against the final box width, which must match what the
    // measure pass saw.
    taffy.disable_rounding();
    let root_style = TextStyle::default();
    let root = build(&mut taffy, tree, &root_style).map_err(|e| Error::LayoutError(e.to_string()))?;

    let available = Size {
        width: AvailableSpace::Definite(canvas.width as f32),
        height: AvailableSpace::Definite(canvas.height as f32),
    };
    taffy
        .compute_layout_with_measure(root, available, |known, available, _id, ctx, _style| {
            let (Some(leaf), Some(face)) = (ctx, face) else {
                return Size {
                    width: known.width.unwrap_or(0.0),
                    height: known.height.unwrap_or(0.0),
                };
            };
            let max_width = known.width.or(match available.width {
                AvailableSpace::Definite(w) => Some(w),
                AvailableSpace::MinContent => Some(0.0),
                AvailableSpace::MaxContent => None,
            });
            let size = leaf.text_style.font_size;
            let lines = wrap_text(face, &leaf.text, size, max_width);
            let widest = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
            let line_height = face.line_metrics(size).line_height;
            Size {
                width: known.width.unwrap_or(widest),
                height: known.height.unwrap_or(lines.len() as f32 * line_height),
            }
        })
        .map_err(|e| Error::LayoutError(e.to_string()))?;

    collect(&taffy, root, tree, (0.0, 0.0), &root_style, face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontDescriptor;
    use crate::layout::{build_card, CAPTION_FONT_SIZE, ICON_MARGIN, ICON_SIZE, TEXT_WIDTH};
    use crate::segment::Segmenter;
    use url::Url;

    #[test]
    fn card_without_text_places_icon() {
        let icon = Url::parse("https://example.com/a.png").unwrap();
        let tree = build_card(Some(&icon), &[], &FontDescriptor::default());
        let root = compute_boxes(&tree, crate::CARD_CANVAS, None).unwrap();

        assert_eq!(root.rect.width, 1200.0);
        assert_eq!(root.rect.height, 630.0);

        let panel = &root.children[0];
        // Outer padding is 60px vertical, 30px horizontal.
        assert_eq!(panel.rect.x, 30.0);
        assert_eq!(panel.rect.y, 60.0);
        assert_eq!(panel.rect.width, 1140.0);
        assert_eq!(panel.rect.height, 510.0);

        let image = &panel.children[0];
        assert!(matches!(image.kind, BoxKind::Image { .. }));
        assert_eq!(image.rect.width, ICON_SIZE);
        assert_eq!(image.rect.height, ICON_SIZE);
        assert_eq!(image.rect.x, 30.0 + ICON_MARGIN);
        // Vertically centred in the panel.
        assert_eq!(image.rect.y, 60.0 + (510.0 - ICON_SIZE) / 2.0);
    }

    #[test]
    fn text_without_font_is_a_layout_error() {
        let units = crate::segment::WhitespaceSegmenter.segment("hello");
        let tree = build_card(None, &units, &FontDescriptor::default());
        let err = compute_boxes(&tree, crate::CARD_CANVAS, None).unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)));
    }

    fn text_boxes(b: &LayoutBox, out: &mut Vec<LayoutBox>) {
        if matches!(b.kind, BoxKind::Text { .. }) {
            out.push(b.clone());
        }
        for child in &b.children {
            text_boxes(child, out);
        }
    }

    fn lines_of(b: &LayoutBox) -> Vec<String> {
        match &b.kind {
            BoxKind::Text { lines, .. } => lines.iter().map(|l| l.text.clone()).collect(),
            _ => Vec::new(),
        }
    }

    fn laid_out(caption: &str) -> Vec<LayoutBox> {
        let face = FontFace::parse(crate::render::TEST_FONT).unwrap();
        let units = crate::segment::IcuSegmenter::new().segment(caption);
        let icon = Url::parse("https://example.com/a.png").unwrap();
        let tree = build_card(Some(&icon), &units, &FontDescriptor::default());
        let root = compute_boxes(&tree, crate::CARD_CANVAS, Some(&face)).unwrap();
        let mut out = Vec::new();
        text_boxes(&root, &mut out);
        out
    }

    #[test]
    fn fitting_word_is_never_split() {
        let boxes = laid_out("hello");
        assert_eq!(boxes.len(), 1);
        assert_eq!(lines_of(&boxes[0]), vec!["hello"]);

        let face = FontFace::parse(crate::render::TEST_FONT).unwrap();
        let line_height = face.line_metrics(CAPTION_FONT_SIZE).line_height;
        assert!((boxes[0].rect.height - line_height).abs() < 0.01);
    }

    #[test]
    fn every_unit_of_a_sentence_keeps_one_line() {
        let caption = "the quick brown fox jumps over the lazy dog cccccccccccc again and again";
        for b in laid_out(caption) {
            assert_eq!(lines_of(&b).len(), 1, "{:?} was split", lines_of(&b));
            assert!(b.rect.x + b.rect.width <= 1200.0);
        }
    }

    #[test]
    fn overlong_span_wraps_within_text_block() {
        let word = "c".repeat(100);
        let boxes = laid_out(&word);
        assert_eq!(boxes.len(), 1);
        let BoxKind::Text { lines, .. } = &boxes[0].kind else {
            panic!("expected text");
        };
        assert!(lines.len() > 1);
        assert_eq!(lines.iter().map(|l| l.text.as_str()).collect::<String>(), word);
        for line in lines {
            assert!(line.width <= TEXT_WIDTH + WRAP_TOLERANCE, "line of {}px", line.width);
        }
    }

    #[test]
    fn wrap_text_tolerates_subpixel_shortfall() {
        let face = FontFace::parse(crate::render::TEST_FONT).unwrap();
        let exact = face.text_width("hello", 25.0);
        // A box a fraction of a pixel narrower than the text still holds it.
        let lines = wrap_text(&face, "hello", 25.0, Some(exact - 0.3));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "hello");
    }
}
