//! ogcard
//!
//! Renders a fixed-size social preview card (1200×630 PNG) from an avatar URL
//! and a short caption, on demand over HTTP.
//!
//! # Pipeline
//!
//! - **Font**: the caption typeface is resolved per request through a
//!   swappable [`font::FontSource`] (type-service stylesheet by default)
//! - **Segment**: the caption is split into wrap-safe word units, using
//!   dictionary/LSTM models for scripts without spaces
//! - **Layout tree**: a declarative node tree is built from the avatar and units
//! - **Render**: layout computation (tree → SVG) and rasterization (SVG → PNG)
//!   are collaborators behind traits, with built-in `taffy` and `resvg` backends
//!
//! # Example
//!
//! ```no_run
//! use ogcard::{pipeline::CardPipeline, request::RenderRequest, ServiceConfig};
//!
//! # async fn run() -> ogcard::Result<()> {
//! let pipeline = CardPipeline::from_config(&ServiceConfig::default())?;
//! let request = RenderRequest::from_query("icon=https://example.com/a.png&text=hello")?;
//! let image = pipeline.render(&request).await?;
//! assert_eq!(image.media_type, "image/png");
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Issue, Result};

pub mod font;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod response;
pub mod segment;
pub mod server;

pub use font::{FontDescriptor, FontResource, FontStyle};
pub use layout::LayoutNode;
pub use pipeline::CardPipeline;
pub use request::RenderRequest;
pub use response::RenderedImage;
pub use segment::WordUnit;

/// Default type-service endpoint serving per-family stylesheets.
pub const DEFAULT_STYLESHEET_ENDPOINT: &str = "https://fonts.googleapis.com/css2";

/// Where the caption font bytes come from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FontOrigin {
    /// Scrape a resource URL out of the type service stylesheet (per request)
    #[default]
    RemoteStylesheet,
    /// Fetch a fixed font URL directly
    PinnedUrl(url::Url),
    /// Read a font file from disk
    LocalFile(PathBuf),
}

/// Configuration for the card service
///
/// The defaults reproduce the reference behavior: the caption font is
/// re-fetched from the public type service on every request and nothing is
/// cached between requests.
///
/// # Examples
///
/// ```
/// let cfg = ogcard::ServiceConfig::default();
/// assert_eq!(cfg.font.family, "Noto Sans JP");
/// assert!(!cfg.cache_fonts);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to
    pub bind: String,
    /// Caption typeface
    pub font: FontDescriptor,
    /// Strategy used to obtain the font bytes
    pub font_origin: FontOrigin,
    /// Stylesheet endpoint used by [`FontOrigin::RemoteStylesheet`]
    pub stylesheet_endpoint: String,
    /// Keep resolved fonts in a process-wide read-through cache
    pub cache_fonts: bool,
    /// User agent sent to the type service and icon hosts
    pub user_agent: String,
    /// Number of tokio worker threads
    pub worker_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            font: FontDescriptor::default(),
            font_origin: FontOrigin::default(),
            stylesheet_endpoint: DEFAULT_STYLESHEET_ENDPOINT.to_string(),
            cache_fonts: false,
            user_agent: concat!("ogcard/", env!("CARGO_PKG_VERSION")).to_string(),
            worker_threads: num_cpus::get().max(1),
        }
    }
}

/// Canvas dimensions in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Every card is rendered at this size.
pub const CARD_CANVAS: Canvas = Canvas {
    width: 1200,
    height: 630,
};

impl Default for Canvas {
    fn default() -> Self {
        CARD_CANVAS
    }
}
