//! HTTP front end.
//!
//! `tiny_http` accepts connections on a dedicated thread; each request is
//! handed to the tokio runtime as its own task and answered from the
//! blocking pool.

use crate::pipeline::CardPipeline;
use crate::request::RenderRequest;
use crate::response::{self, HttpResponse};
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::Method;
use tokio::runtime::Handle;

pub const IMAGE_ROUTE: &str = "/image";

pub struct Server {
    inner: tiny_http::Server,
}

impl Server {
    pub fn bind(addr: &str) -> Result<Self> {
        let inner = tiny_http::Server::http(addr)
            .map_err(|e| Error::ConfigError(format!("failed to bind {}: {}", addr, e)))?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server_addr().to_ip()
    }

    /// Accept requests until the listener shuts down. Blocks the calling
    /// thread; request work runs on `handle`.
    pub fn serve(self, handle: Handle, pipeline: Arc<CardPipeline>) {
        if let Some(addr) = self.local_addr() {
            log::info!("listening on http://{}", addr);
        }
        for request in self.inner.incoming_requests() {
            let pipeline = Arc::clone(&pipeline);
            handle.spawn(async move {
                let method = request.method().clone();
                let url = request.url().to_string();
                let response = handle_request(&method, &url, &pipeline).await;
                let status = response.status_code().0;

                let written = tokio::task::spawn_blocking(move || request.respond(response)).await;
                match written {
                    Ok(Ok(())) => log::info!("{} {} -> {}", method, url, status),
                    Ok(Err(e)) => log::warn!("{} {}: failed to write response: {}", method, url, e),
                    Err(e) => log::error!("{} {}: response task failed: {}", method, url, e),
                }
            });
        }
    }
}

/// Route and answer one request.
///
/// Query validation happens here, before the pipeline is touched, so an
/// invalid request never reaches the network.
pub async fn handle_request(method: &Method, url: &str, pipeline: &CardPipeline) -> HttpResponse {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    if path != IMAGE_ROUTE {
        return response::not_found();
    }
    if *method != Method::Get {
        return response::method_not_allowed();
    }

    let request = match RenderRequest::from_query(query) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("rejected {}: {}", url, e);
            return response::error_response(&e);
        }
    };

    match pipeline.render(&request).await {
        Ok(image) => response::image_response(image),
        Err(e) => {
            log::error!("render failed for {}: {}", url, e);
            response::error_response(&e)
        }
    }
}
