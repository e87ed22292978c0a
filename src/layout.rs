//! Declarative layout tree for the preview card.
//!
//! The tree is backend independent: it only records node kinds and their
//! style attributes. Turning it into geometry and pixels is the job of the
//! [`crate::render`] collaborators.

use crate::font::{FontDescriptor, FontStyle};
use crate::segment::WordUnit;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Px(f32),
    Percent(f32),
}

/// Per-side lengths in pixels (padding, margin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const fn all(v: f32) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    pub const fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// `#ADD8E6`
    pub const LIGHT_BLUE: Color = Color::rgb(0xad, 0xd8, 0xe6);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Radius {
    Px(f32),
    /// Percentage of the box size (50% on a square box is a circle)
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum FlexWrap {
    #[default]
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignItems {
    Start,
    Center,
    End,
    Stretch,
}

/// Style attributes shared by every node kind. Text properties (`font_*`,
/// `color`) are inherited by descendants when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Style {
    pub width: Dimension,
    pub height: Dimension,
    pub padding: Edges,
    pub margin: Edges,
    pub background: Option<Color>,
    pub border: Option<Border>,
    pub border_radius: Option<Radius>,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub align_items: Option<AlignItems>,
    pub font_family: Option<String>,
    pub font_weight: Option<u16>,
    pub font_style: Option<FontStyle>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
}

/// A node of the layout tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayoutNode {
    Container { style: Style, children: Vec<LayoutNode> },
    Image { style: Style, src: String },
    TextSpan { style: Style, text: String },
}

impl LayoutNode {
    pub fn style(&self) -> &Style {
        match self {
            LayoutNode::Container { style, .. }
            | LayoutNode::Image { style, .. }
            | LayoutNode::TextSpan { style, .. } => style,
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Container { children, .. } => children,
            _ => &[],
        }
    }

    /// Depth-first, pre-order walk of the tree.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a LayoutNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn image_count(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |node| {
            if matches!(node, LayoutNode::Image { .. }) {
                n += 1;
            }
        });
        n
    }

    /// Text of every span, in document order.
    pub fn text_spans(&self) -> Vec<&str> {
        let mut spans = Vec::new();
        self.walk(&mut |node| {
            if let LayoutNode::TextSpan { text, .. } = node {
                spans.push(text.as_str());
            }
        });
        spans
    }
}

pub const CARD_BACKGROUND: Color = Color::LIGHT_BLUE;
pub const CARD_PADDING: Edges = Edges::symmetric(60.0, 30.0);
pub const ICON_SIZE: f32 = 150.0;
pub const ICON_MARGIN: f32 = 30.0;
pub const TEXT_WIDTH: f32 = 800.0;
pub const CAPTION_FONT_SIZE: f32 = 25.0;

/// Build the card tree: background → white row panel → icon + wrapping
/// caption block with one span per word unit.
pub fn build_card(icon: Option<&Url>, units: &[WordUnit], font: &FontDescriptor) -> LayoutNode {
    let canvas = crate::CARD_CANVAS;

    let mut panel_children = Vec::with_capacity(2);
    if let Some(icon) = icon {
        panel_children.push(LayoutNode::Image {
            style: Style {
                width: Dimension::Px(ICON_SIZE),
                height: Dimension::Px(ICON_SIZE),
                margin: Edges::all(ICON_MARGIN),
                border: Some(Border {
                    width: 1.0,
                    color: Color::BLACK,
                }),
                border_radius: Some(Radius::Percent(50.0)),
                ..Style::default()
            },
            src: icon.to_string(),
        });
    }

    let spans = units
        .iter()
        .map(|unit| LayoutNode::TextSpan {
            style: Style::default(),
            text: unit.text.clone(),
        })
        .collect();

    panel_children.push(LayoutNode::Container {
        style: Style {
            width: Dimension::Px(TEXT_WIDTH),
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::Wrap,
            font_family: Some(font.family.clone()),
            font_weight: Some(font.weight),
            font_style: Some(font.style),
            font_size: Some(CAPTION_FONT_SIZE),
            color: Some(Color::BLACK),
            ..Style::default()
        },
        children: spans,
    });

    let panel = LayoutNode::Container {
        style: Style {
            width: Dimension::Percent(100.0),
            height: Dimension::Percent(100.0),
            background: Some(Color::WHITE),
            flex_direction: FlexDirection::Row,
            align_items: Some(AlignItems::Center),
            ..Style::default()
        },
        children: panel_children,
    };

    LayoutNode::Container {
        style: Style {
            width: Dimension::Px(canvas.width as f32),
            height: Dimension::Px(canvas.height as f32),
            padding: CARD_PADDING,
            background: Some(CARD_BACKGROUND),
            align_items: Some(AlignItems::Center),
            ..Style::default()
        },
        children: vec![panel],
    }
}
