//! Renderer collaborator contracts.
//!
//! The orchestration core never parses or validates D2 itself; it hands the
//! canvas source to a [`DiagramRenderer`] and treats the outcome as data. The
//! production implementations in [`kroki`] talk to a Kroki-compatible render
//! service over HTTP.

use async_trait::async_trait;
use thiserror::Error;

pub mod kroki;

pub use kroki::{HttpRasterizer, KrokiRenderer};

/// Why a render attempt produced no image.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer rejected the diagram source. This is the expected,
    /// recoverable outcome while the model iterates on a diagram; the message
    /// is fed back into the conversation verbatim.
    #[error("{message}")]
    Diagram { message: String },

    /// The render service could not be reached or returned garbage.
    #[error("render service unavailable: {0}")]
    Transport(String),
}

/// Renders diagram DSL text to vector image bytes.
///
/// Implementations must be deterministic for identical input and free of side
/// effects of their own.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, source: &str) -> Result<Vec<u8>, RenderError>;
}

/// Converts vector image bytes into a base64-encoded raster (PNG).
///
/// May fail on malformed input; callers treat failure as recoverable and fall
/// back to text-only feedback.
#[async_trait]
pub trait RasterConverter: Send + Sync {
    async fn to_raster_base64(&self, image: &[u8]) -> anyhow::Result<String>;
}
