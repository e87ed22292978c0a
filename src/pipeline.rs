//! Per-request orchestration: font → segments → tree → markup → PNG.

use crate::font::{FontDescriptor, FontSource};
use crate::layout::build_card;
use crate::render::{FitMode, LayoutEngine, Rasterizer};
use crate::request::RenderRequest;
use crate::response::RenderedImage;
use crate::segment::Segmenter;
use crate::{Error, Result, CARD_CANVAS};
use std::sync::Arc;

/// The card rendering pipeline.
///
/// Collaborators are shared handles; nothing request-specific is stored on
/// the pipeline, so one instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct CardPipeline {
    font_source: Arc<dyn FontSource>,
    segmenter: Arc<dyn Segmenter>,
    layout: Arc<dyn LayoutEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    font: FontDescriptor,
}

impl CardPipeline {
    pub fn new(
        font_source: Arc<dyn FontSource>,
        segmenter: Arc<dyn Segmenter>,
        layout: Arc<dyn LayoutEngine>,
        rasterizer: Arc<dyn Rasterizer>,
        font: FontDescriptor,
    ) -> Self {
        Self {
            font_source,
            segmenter,
            layout,
            rasterizer,
            font,
        }
    }

    /// Wire up the built-in collaborators from a config.
    #[cfg(feature = "render")]
    pub fn from_config(config: &crate::ServiceConfig) -> Result<Self> {
        use crate::render::{ResvgRasterizer, SvgLayoutEngine};
        use crate::segment::IcuSegmenter;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::new(
            crate::font::from_config(config, client.clone())?,
            Arc::new(IcuSegmenter::new()),
            Arc::new(SvgLayoutEngine::new(client)),
            Arc::new(ResvgRasterizer::new()),
            config.font.clone(),
        ))
    }

    pub fn font(&self) -> &FontDescriptor {
        &self.font
    }

    /// Run every stage for one request. The first failing stage aborts the
    /// rest and its error is returned unchanged.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedImage> {
        log::info!(
            "rendering card icon={} caption_chars={}",
            request.icon_url,
            request.caption.chars().count()
        );

        let font = self.font_source.resolve(&self.font).await.map_err(|e| {
            log::warn!("font resolution failed: {}", e);
            e
        })?;
        log::debug!("resolved font {} ({} bytes)", font.source_url, font.bytes.len());

        let units = self.segmenter.segment(&request.caption);
        log::debug!("segmented caption into {} units", units.len());

        let tree = build_card(Some(&request.icon_url), &units, &self.font);
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&tree) {
                log::trace!("layout tree: {}", json);
            }
        }

        let fonts = [font];
        let svg = self.layout.compute(tree, CARD_CANVAS, &fonts).await.map_err(|e| {
            log::warn!("layout failed: {}", e);
            e
        })?;
        log::debug!("layout produced {} bytes of markup", svg.len());

        let rasterizer = Arc::clone(&self.rasterizer);
        let png = tokio::task::spawn_blocking(move || rasterizer.rasterize(&svg, FitMode::Original))
            .await
            .map_err(|e| Error::RasterError(format!("raster task failed: {}", e)))??;

        log::info!("rendered card ({} bytes)", png.len());
        Ok(RenderedImage::png(png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontResource;
    use crate::layout::LayoutNode;
    use crate::segment::{WhitespaceSegmenter, WordUnit};
    use crate::Canvas;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Counts resolutions; fails like a stylesheet outage when `fail` is set.
    struct StubFonts {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubFonts {
        fn ok() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
        }
    }

    impl FontSource for StubFonts {
        fn resolve<'a>(&'a self, d: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(Error::StylesheetUnavailable("GET css2 returned 503".into()));
                }
                Ok(FontResource::new(d, b"FONT".to_vec(), "mem://font".into()))
            })
        }
    }

    /// Records the tree it was handed and returns a blank card.
    #[derive(Default)]
    struct RecordingLayout {
        trees: Mutex<Vec<LayoutNode>>,
    }

    impl LayoutEngine for RecordingLayout {
        fn compute<'a>(
            &'a self,
            tree: LayoutNode,
            canvas: Canvas,
            fonts: &'a [FontResource],
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                assert_eq!(fonts.len(), 1);
                let spans = tree.text_spans().join("|");
                self.trees.lock().unwrap().push(tree);
                // Yield so concurrent renders interleave.
                tokio::task::yield_now().await;
                Ok(format!(
                    r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg"><desc>{spans}</desc></svg>"#,
                    w = canvas.width,
                    h = canvas.height,
                ))
            })
        }
    }

    /// Returns the markup itself so the caller can see what reached raster.
    struct EchoRaster;

    impl Rasterizer for EchoRaster {
        fn rasterize(&self, svg: &str, fit: FitMode) -> Result<Vec<u8>> {
            assert_eq!(fit, FitMode::Original);
            Ok(svg.as_bytes().to_vec())
        }
    }

    fn pipeline(fonts: Arc<StubFonts>, layout: Arc<RecordingLayout>) -> CardPipeline {
        CardPipeline::new(
            fonts,
            Arc::new(WhitespaceSegmenter),
            layout,
            Arc::new(EchoRaster),
            FontDescriptor::default(),
        )
    }

    #[tokio::test]
    async fn tree_has_one_image_and_one_span_per_unit() {
        let layout = Arc::new(RecordingLayout::default());
        let p = pipeline(StubFonts::ok(), layout.clone());
        let req = RenderRequest::new("https://example.com/me.png", "hello big world").unwrap();

        let image = p.render(&req).await.unwrap();
        assert_eq!(image.media_type, "image/png");

        let trees = layout.trees.lock().unwrap();
        let units: Vec<WordUnit> = WhitespaceSegmenter.segment(&req.caption);
        assert_eq!(trees[0].image_count(), 1);
        assert_eq!(
            trees[0].text_spans(),
            units.iter().map(|u| u.as_str()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn font_outage_aborts_before_layout() {
        let fonts = Arc::new(StubFonts { calls: AtomicUsize::new(0), fail: true });
        let layout = Arc::new(RecordingLayout::default());
        let p = pipeline(fonts.clone(), layout.clone());
        let req = RenderRequest::new("https://example.com/me.png", "hello").unwrap();

        let err = p.render(&req).await.unwrap_err();
        assert!(matches!(err, Error::StylesheetUnavailable(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(fonts.calls.load(Ordering::SeqCst), 1);
        assert!(layout.trees.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_state() {
        let fonts = StubFonts::ok();
        let layout = Arc::new(RecordingLayout::default());
        let p = pipeline(fonts.clone(), layout.clone());
        let a = RenderRequest::new("https://a.example/a.png", "alpha beta").unwrap();
        let b = RenderRequest::new("https://b.example/b.png", "猫と犬").unwrap();

        let (ra, rb) = tokio::join!(p.render(&a), p.render(&b));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        let ra = String::from_utf8(ra.bytes).unwrap();
        let rb = String::from_utf8(rb.bytes).unwrap();
        assert!(ra.contains("alpha |beta") && !ra.contains("猫"));
        assert!(rb.contains("猫と犬") && !rb.contains("alpha"));
        // One fetch per request, no sharing.
        assert_eq!(fonts.calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(feature = "render")]
    #[tokio::test]
    async fn output_is_always_card_sized() {
        use crate::render::raster::png_dimensions;
        use crate::render::ResvgRasterizer;

        let p = CardPipeline::new(
            StubFonts::ok(),
            Arc::new(WhitespaceSegmenter),
            Arc::new(RecordingLayout::default()),
            Arc::new(ResvgRasterizer::new()),
            FontDescriptor::default(),
        );
        let long = "x".repeat(100);
        for caption in ["a", "a caption that goes on and on", long.as_str()] {
            let req = RenderRequest::new("https://example.com/me.png", caption).unwrap();
            let image = p.render(&req).await.unwrap();
            assert_eq!(png_dimensions(&image.bytes), Some((1200, 630)));
        }
    }
}
