//! Kroki-backed render service client.
//!
//! Kroki accepts raw diagram source via POST and returns the rendered image.
//! A 4xx status with a plain-text body is how it reports syntax errors, so
//! those become [`RenderError::Diagram`] rather than transport failures.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use crate::{DiagramRenderer, RasterConverter, RenderError};

/// Renders D2 source through `POST {endpoint}/d2/svg`.
pub struct KrokiRenderer {
    endpoint: String,
    client: reqwest::Client,
}

impl KrokiRenderer {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl DiagramRenderer for KrokiRenderer {
    async fn render(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        let url = format!("{}/d2/svg", self.endpoint);
        debug!(bytes = source.len(), "rendering diagram");

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(source.to_string())
            .send()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| RenderError::Transport(e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        let body = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            // Kroki reports diagram syntax errors as 400 with a text body.
            warn!(%status, "renderer rejected diagram");
            Err(RenderError::Diagram {
                message: if body.is_empty() {
                    format!("renderer rejected the diagram (HTTP {status})")
                } else {
                    body
                },
            })
        } else {
            Err(RenderError::Transport(format!("HTTP {status}: {body}")))
        }
    }
}

/// Rasterizes SVG bytes through a configurable conversion endpoint.
///
/// Any service accepting `image/svg+xml` and answering with PNG bytes works;
/// Kroki deployments typically sit next to one.
pub struct HttpRasterizer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRasterizer {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl RasterConverter for HttpRasterizer {
    async fn to_raster_base64(&self, image: &[u8]) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "image/svg+xml")
            .body(image.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("raster conversion failed (HTTP {status}): {body}");
        }

        let bytes = resp.bytes().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
    }
}
