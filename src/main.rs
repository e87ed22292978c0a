use anyhow::Context;
use clap::Parser;
use ogcard::font::{FontDescriptor, FontStyle};
use ogcard::server::Server;
use ogcard::{CardPipeline, FontOrigin, ServiceConfig, DEFAULT_STYLESHEET_ENDPOINT};
use std::path::PathBuf;
use std::sync::Arc;

/// Serve 1200x630 PNG preview cards at `GET /image?icon=<url>&text=<caption>`.
#[derive(Parser, Debug)]
#[command(name = "ogcard", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787", env = "OGCARD_BIND")]
    bind: String,

    /// Caption font family
    #[arg(long, default_value = "Noto Sans JP")]
    font_family: String,

    /// Caption font weight
    #[arg(long, default_value_t = 700)]
    font_weight: u16,

    /// Use the italic face
    #[arg(long)]
    italic: bool,

    /// Fetch the font from this URL instead of the type service stylesheet
    #[arg(long, conflicts_with = "font_file")]
    font_url: Option<url::Url>,

    /// Read the font from a local file
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Stylesheet endpoint of the type service
    #[arg(long, default_value = DEFAULT_STYLESHEET_ENDPOINT)]
    stylesheet_endpoint: String,

    /// Keep resolved fonts in memory across requests
    #[arg(long)]
    cache_fonts: bool,

    /// Tokio worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        let font_origin = match (self.font_url, self.font_file) {
            (Some(url), _) => FontOrigin::PinnedUrl(url),
            (None, Some(path)) => FontOrigin::LocalFile(path),
            (None, None) => FontOrigin::RemoteStylesheet,
        };
        ServiceConfig {
            bind: self.bind,
            font: FontDescriptor {
                family: self.font_family,
                weight: self.font_weight,
                style: if self.italic { FontStyle::Italic } else { FontStyle::Normal },
            },
            font_origin,
            stylesheet_endpoint: self.stylesheet_endpoint,
            cache_fonts: self.cache_fonts,
            worker_threads: self.workers.unwrap_or(defaults.worker_threads).max(1),
            ..defaults
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    log::debug!("config: {:?}", config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let pipeline = {
        let _guard = runtime.enter();
        Arc::new(CardPipeline::from_config(&config).context("failed to build pipeline")?)
    };
    log::info!(
        "caption font: {} {} {}",
        pipeline.font().family,
        pipeline.font().weight,
        pipeline.font().style.as_str()
    );
    let server = Server::bind(&config.bind).with_context(|| format!("failed to bind {}", config.bind))?;

    server.serve(runtime.handle().clone(), pipeline);
    Ok(())
}
