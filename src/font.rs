//! Caption font resolution.
//!
//! A [`FontSource`] turns a [`FontDescriptor`] into raw font bytes. The default
//! strategy scrapes a type-service stylesheet for its opentype/truetype
//! resource URL and downloads it, on every request. Other strategies fetch a
//! pinned URL or read a local file, and [`CachedFontSource`] can wrap any of
//! them with a process-wide read-through cache.

use crate::{Error, FontOrigin, Result, ServiceConfig};
use futures::future::BoxFuture;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use url::Url;

static RESOURCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn resource_regex() -> &'static Regex {
    RESOURCE_REGEX.get_or_init(|| {
        Regex::new(r"src:\s*url\(([^)]+)\)\s*format\('(opentype|truetype)'\)")
            .expect("RESOURCE_REGEX is a valid static regex pattern")
    })
}

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }
}

/// Which face of which family to use for the caption.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontDescriptor {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: "Noto Sans JP".to_string(),
            weight: 700,
            style: FontStyle::Normal,
        }
    }
}

/// Font bytes plus the metadata they were resolved for.
#[derive(Debug, Clone)]
pub struct FontResource {
    pub family_name: String,
    pub weight: u16,
    pub style: FontStyle,
    pub bytes: Arc<[u8]>,
    /// Where the bytes were read from (URL or `file://` path)
    pub source_url: String,
}

impl FontResource {
    pub fn new(descriptor: &FontDescriptor, bytes: Vec<u8>, source_url: String) -> Self {
        Self {
            family_name: descriptor.family.clone(),
            weight: descriptor.weight,
            style: descriptor.style,
            bytes: Arc::from(bytes),
            source_url,
        }
    }
}

/// Strategy for obtaining font bytes.
pub trait FontSource: Send + Sync {
    fn resolve<'a>(&'a self, descriptor: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>>;
}

/// Build the configured font source (wrapped in a cache when enabled).
pub fn from_config(config: &ServiceConfig, client: Client) -> Result<Arc<dyn FontSource>> {
    let source: Arc<dyn FontSource> = match &config.font_origin {
        FontOrigin::RemoteStylesheet => Arc::new(StylesheetFontSource::new(
            client,
            &config.stylesheet_endpoint,
        )?),
        FontOrigin::PinnedUrl(url) => Arc::new(PinnedUrlFontSource::new(client, url.clone())),
        FontOrigin::LocalFile(path) => Arc::new(LocalFileFontSource::new(path.clone())),
    };

    if config.cache_fonts {
        Ok(Arc::new(CachedFontSource::new(source)))
    } else {
        Ok(source)
    }
}

/// Extract the first opentype/truetype resource URL from a stylesheet body.
pub fn extract_resource_url(css: &str) -> Option<String> {
    resource_regex().captures(css).map(|caps| {
        caps[1]
            .trim()
            .trim_matches(|c| c == '\'' || c == '"')
            .to_string()
    })
}

/// Scrapes the type-service stylesheet for the family/weight and downloads
/// the referenced font resource.
pub struct StylesheetFontSource {
    client: Client,
    endpoint: Url,
}

impl StylesheetFontSource {
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::ConfigError(format!("invalid stylesheet endpoint {}: {}", endpoint, e)))?;
        Ok(Self { client, endpoint })
    }

    /// Stylesheet URL for a descriptor, e.g. `css2?family=Noto+Sans+JP:wght@700`.
    pub fn stylesheet_url(&self, descriptor: &FontDescriptor) -> String {
        let family = descriptor.family.split_whitespace().collect::<Vec<_>>().join("+");
        let axis = match descriptor.style {
            FontStyle::Normal => format!("wght@{}", descriptor.weight),
            FontStyle::Italic => format!("ital,wght@1,{}", descriptor.weight),
        };
        let mut base = self.endpoint.clone();
        base.set_query(None);
        format!("{}?family={}:{}", base, family, axis)
    }

    async fn fetch_stylesheet(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::StylesheetUnavailable(format!("GET {} failed: {}", url, e)))?;
        if !resp.status().is_success() {
            return Err(Error::StylesheetUnavailable(format!(
                "GET {} returned {}",
                url,
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| Error::StylesheetUnavailable(format!("failed to read stylesheet body: {}", e)))
    }
}

impl FontSource for StylesheetFontSource {
    fn resolve<'a>(&'a self, descriptor: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>> {
        Box::pin(async move {
            let stylesheet_url = self.stylesheet_url(descriptor);
            log::debug!("fetching font stylesheet {}", stylesheet_url);
            let css = self.fetch_stylesheet(&stylesheet_url).await?;

            let resource = extract_resource_url(&css).ok_or_else(|| {
                Error::ResourceNotFound(format!(
                    "no opentype/truetype src in stylesheet for {} {}",
                    descriptor.family, descriptor.weight
                ))
            })?;

            let bytes = fetch_font_bytes(&self.client, &resource).await?;
            log::debug!("font data {} bytes from {}", bytes.len(), resource);
            Ok(FontResource::new(descriptor, bytes, resource))
        })
    }
}

/// Downloads a fixed font URL, skipping the stylesheet.
pub struct PinnedUrlFontSource {
    client: Client,
    url: Url,
}

impl PinnedUrlFontSource {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

impl FontSource for PinnedUrlFontSource {
    fn resolve<'a>(&'a self, descriptor: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>> {
        Box::pin(async move {
            let bytes = fetch_font_bytes(&self.client, self.url.as_str()).await?;
            Ok(FontResource::new(descriptor, bytes, self.url.to_string()))
        })
    }
}

/// Reads font bytes from disk.
pub struct LocalFileFontSource {
    path: PathBuf,
}

impl LocalFileFontSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FontSource for LocalFileFontSource {
    fn resolve<'a>(&'a self, descriptor: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                Error::FontBytesUnavailable(format!("failed to read {}: {}", self.path.display(), e))
            })?;
            Ok(FontResource::new(
                descriptor,
                bytes,
                format!("file://{}", self.path.display()),
            ))
        })
    }
}

async fn fetch_font_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::FontBytesUnavailable(format!("GET {} failed: {}", url, e)))?;
    if !resp.status().is_success() {
        return Err(Error::FontBytesUnavailable(format!(
            "GET {} returned {}",
            url,
            resp.status()
        )));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| Error::FontBytesUnavailable(format!("failed to read font body: {}", e)))?;
    Ok(bytes.to_vec())
}

/// Read-through cache keyed by descriptor. Entries never expire; failures
/// are not cached, so a miss always falls through to the inner source.
pub struct CachedFontSource {
    inner: Arc<dyn FontSource>,
    entries: RwLock<HashMap<FontDescriptor, FontResource>>,
}

impl CachedFontSource {
    pub fn new(inner: Arc<dyn FontSource>) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl FontSource for CachedFontSource {
    fn resolve<'a>(&'a self, descriptor: &'a FontDescriptor) -> BoxFuture<'a, Result<FontResource>> {
        Box::pin(async move {
            if let Some(hit) = self.entries.read().await.get(descriptor) {
                log::debug!("font cache hit for {} {}", descriptor.family, descriptor.weight);
                return Ok(hit.clone());
            }

            // Concurrent misses may both fetch; the last insert wins.
            let resource = self.inner.resolve(descriptor).await?;
            self.entries
                .write()
                .await
                .insert(descriptor.clone(), resource.clone());
            Ok(resource)
        })
    }
}
