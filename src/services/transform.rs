use async_trait::async_trait;

use crate::models::image::{ImageHandle, SourceImage};

/// A remote image-to-image call: one source photo plus a textual directive in,
/// one styled image out.
///
/// Implementations carry their own timeouts; callers treat the future as
/// "eventually settles".
#[async_trait]
pub trait ImageTransform: Send + Sync {
    async fn transform(
        &self,
        source: &SourceImage,
        directive: &str,
    ) -> Result<ImageHandle, TransformError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Model returned no image data")]
    EmptyResult,

    #[error("Model returned an unreadable image")]
    InvalidImage,

    #[error("{0}")]
    Remote(String),
}
