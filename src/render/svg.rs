//! Layout engine producing standalone SVG markup.
//!
//! Remote image sources are downloaded and inlined as `data:` URIs and text
//! is emitted as glyph outlines, so the markup needs neither network access
//! nor fonts to rasterize.

use super::flex::{compute_boxes, Rect};
use super::glyphs::FontFace;
use super::paint::{paint, PaintCommand};
use super::LayoutEngine;
use crate::font::FontResource;
use crate::layout::LayoutNode;
use crate::{Canvas, Error, Result};
use base64::Engine as _;
use futures::future::BoxFuture;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt::Write as _;

pub struct SvgLayoutEngine {
    client: Client,
}

impl SvgLayoutEngine {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_image(&self, src: &str) -> Result<String> {
        let resp = self
            .client
            .get(src)
            .send()
            .await
            .map_err(|e| Error::LayoutError(format!("failed to load image {}: {}", src, e)))?;
        if !resp.status().is_success() {
            return Err(Error::LayoutError(format!(
                "failed to load image {}: status {}",
                src,
                resp.status()
            )));
        }
        let declared = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::LayoutError(format!("failed to read image {}: {}", src, e)))?;

        let mime = sniff_image_type(&bytes)
            .map(str::to_string)
            .or(declared.filter(|m| m.starts_with("image/")))
            .ok_or_else(|| Error::LayoutError(format!("unsupported image type at {}", src)))?;

        log::debug!("inlined image {} ({}, {} bytes)", src, mime, bytes.len());
        Ok(format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        ))
    }

    async fn resolve_images(&self, tree: &LayoutNode) -> Result<HashMap<String, String>> {
        let mut sources = Vec::new();
        tree.walk(&mut |node| {
            if let LayoutNode::Image { src, .. } = node {
                if !src.starts_with("data:") && !sources.contains(src) {
                    sources.push(src.clone());
                }
            }
        });

        let mut resolved = HashMap::new();
        for src in sources {
            let data = self.fetch_image(&src).await?;
            resolved.insert(src, data);
        }
        Ok(resolved)
    }
}

impl LayoutEngine for SvgLayoutEngine {
    fn compute<'a>(
        &'a self,
        mut tree: LayoutNode,
        canvas: Canvas,
        fonts: &'a [FontResource],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let resolved = self.resolve_images(&tree).await?;
            inline_sources(&mut tree, &resolved);
            render_markup(&tree, canvas, fonts)
        })
    }
}

fn inline_sources(node: &mut LayoutNode, resolved: &HashMap<String, String>) {
    match node {
        LayoutNode::Image { src, .. } => {
            if let Some(data) = resolved.get(src.as_str()) {
                *src = data.clone();
            }
        }
        LayoutNode::Container { children, .. } => {
            for child in children {
                inline_sources(child, resolved);
            }
        }
        LayoutNode::TextSpan { .. } => {}
    }
}

fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Lay out an already self-contained tree and serialize it. The first font
/// is used for every text span.
pub fn render_markup(tree: &LayoutNode, canvas: Canvas, fonts: &[FontResource]) -> Result<String> {
    let face = fonts.first().map(|f| FontFace::parse(&f.bytes)).transpose()?;
    let root = compute_boxes(tree, canvas, face.as_ref())?;
    let commands = paint(&root, face.as_ref());
    Ok(to_svg(&commands, canvas))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn rect_attrs(rect: &Rect, radius: f32) -> String {
    let mut attrs = format!(
        r#"x="{}" y="{}" width="{}" height="{}""#,
        rect.x, rect.y, rect.width, rect.height
    );
    if radius > 0.0 {
        let _ = write!(attrs, r#" rx="{radius}" ry="{radius}""#);
    }
    attrs
}

/// Serialize paint commands into an SVG document of the canvas size.
pub fn to_svg(commands: &[PaintCommand], canvas: Canvas) -> String {
    let mut out = format!(
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"#,
        w = canvas.width,
        h = canvas.height
    );
    let mut clip_id = 0usize;

    for cmd in commands {
        match cmd {
            PaintCommand::FillRect { rect, radius, color } => {
                let _ = write!(out, r#"<rect {} fill="{}"/>"#, rect_attrs(rect, *radius), color.to_hex());
            }
            PaintCommand::StrokeRect {
                rect,
                radius,
                width,
                color,
            } => {
                let half = width / 2.0;
                let inset = Rect {
                    x: rect.x + half,
                    y: rect.y + half,
                    width: (rect.width - width).max(0.0),
                    height: (rect.height - width).max(0.0),
                };
                let _ = write!(
                    out,
                    r#"<rect {} fill="none" stroke="{}" stroke-width="{}"/>"#,
                    rect_attrs(&inset, (radius - half).max(0.0)),
                    color.to_hex(),
                    width
                );
            }
            PaintCommand::Image { rect, radius, href } => {
                clip_id += 1;
                let _ = write!(
                    out,
                    r#"<clipPath id="clip{id}"><rect {clip}/></clipPath><image x="{x}" y="{y}" width="{w}" height="{h}" preserveAspectRatio="none" clip-path="url(#clip{id})" href="{href}"/>"#,
                    id = clip_id,
                    clip = rect_attrs(rect, *radius),
                    x = rect.x,
                    y = rect.y,
                    w = rect.width,
                    h = rect.height,
                    href = escape_attr(href)
                );
            }
            PaintCommand::Glyphs { path, color } => {
                let _ = write!(out, r#"<path d="{}" fill="{}"/>"#, path, color.to_hex());
            }
        }
    }

    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontDescriptor;
    use crate::layout::build_card;
    use crate::segment::Segmenter;
    use url::Url;

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0xf8,
        0xcf, 0xc0, 0xf0, 0x1f, 0x00, 0x05, 0x00, 0x01, 0xff, 0x89, 0x99, 0x3d, 0x1d, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    fn spawn_icon_host(status: u16) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr());
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let response = tiny_http::Response::from_data(PNG_1X1.to_vec())
                    .with_status_code(status)
                    .with_header("Content-Type: image/png".parse::<tiny_http::Header>().unwrap());
                let _ = request.respond(response);
            }
        });
        base
    }

    fn engine() -> SvgLayoutEngine {
        SvgLayoutEngine::new(Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_image_type(PNG_1X1), Some("image/png"));
        assert_eq!(sniff_image_type(&[0xff, 0xd8, 0xff, 0xe0]), Some("image/jpeg"));
        assert_eq!(sniff_image_type(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_image_type(b"<svg/>"), None);
    }

    #[tokio::test]
    async fn icon_is_inlined_into_markup() {
        let base = spawn_icon_host(200);
        let icon = Url::parse(&format!("{}/avatar.png", base)).unwrap();
        let tree = build_card(Some(&icon), &[], &FontDescriptor::default());

        let svg = engine().compute(tree, crate::CARD_CANVAS, &[]).await.unwrap();

        assert!(svg.starts_with(r#"<svg width="1200" height="630""#));
        assert!(svg.contains(r#"href="data:image/png;base64,"#));
        assert!(!svg.contains(&base));
        assert!(svg.contains(r##"fill="#add8e6""##));
        assert!(svg.contains(r#"rx="75""#));
    }

    #[tokio::test]
    async fn unreachable_icon_is_a_layout_error() {
        let base = spawn_icon_host(404);
        let icon = Url::parse(&format!("{}/missing.png", base)).unwrap();
        let tree = build_card(Some(&icon), &[], &FontDescriptor::default());

        let err = engine().compute(tree, crate::CARD_CANVAS, &[]).await.unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)), "{err}");
    }

    #[test]
    fn invalid_font_bytes_fail_layout() {
        let font = FontResource::new(&FontDescriptor::default(), b"nope".to_vec(), "mem://".into());
        let units = crate::segment::WhitespaceSegmenter.segment("hello");
        let tree = build_card(None, &units, &FontDescriptor::default());
        let err = render_markup(&tree, crate::CARD_CANVAS, &[font]).unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)));
    }

    #[test]
    fn real_font_caption_renders_as_glyph_paths() {
        use crate::render::raster::png_dimensions;
        use crate::render::{FitMode, Rasterizer, ResvgRasterizer};

        let font = FontResource::new(
            &FontDescriptor::default(),
            crate::render::TEST_FONT.to_vec(),
            "file://tests/fixtures/Tuffy.ttf".into(),
        );
        let units = crate::segment::IcuSegmenter::new().segment("hello world");
        let tree = build_card(None, &units, &FontDescriptor::default());

        let svg = render_markup(&tree, crate::CARD_CANVAS, &[font]).unwrap();
        assert!(svg.contains(r#"<path d="M"#), "no glyph outlines in {svg}");
        assert!(svg.contains(r##"fill="#000000""##));

        let png = ResvgRasterizer::new().rasterize(&svg, FitMode::Original).unwrap();
        assert_eq!(png_dimensions(&png), Some((1200, 630)));
    }
}
