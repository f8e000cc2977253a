use std::fmt;
use std::sync::Arc;

use image::ImageFormat;

/// Formats accepted for uploaded source images.
const ACCEPTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Shared, immutable image bytes with their MIME type.
///
/// Cloning is cheap and clones are identity-equal, which lets callers check
/// that an untouched job still holds the exact result it had before.
#[derive(Clone)]
pub struct ImageHandle {
    bytes: Arc<[u8]>,
    content_type: &'static str,
}

impl ImageHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Wrap bytes whose format is sniffed from the payload itself.
    pub fn sniffed(bytes: Vec<u8>) -> Result<Self, SourceImageError> {
        let format = image::guess_format(&bytes).map_err(|_| SourceImageError::Unrecognized)?;
        Ok(Self::new(bytes, format.to_mime_type()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension matching the content type, `jpg` when unknown.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(self.content_type)
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("jpg")
    }

    /// True when both handles share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type && self.bytes == other.bytes
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The uploaded photo every job in a session transforms.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: ImageHandle,
}

impl SourceImage {
    /// Validate an upload. Only PNG, JPEG and WebP payloads are accepted.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SourceImageError> {
        if bytes.is_empty() {
            return Err(SourceImageError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|_| SourceImageError::Unrecognized)?;
        if !ACCEPTED_FORMATS.contains(&format) {
            return Err(SourceImageError::Unsupported(format.to_mime_type()));
        }
        Ok(Self {
            image: ImageHandle::new(bytes, format.to_mime_type()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        self.image.bytes()
    }

    pub fn content_type(&self) -> &'static str {
        self.image.content_type()
    }

    pub fn handle(&self) -> &ImageHandle {
        &self.image
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceImageError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Image format could not be recognized")]
    Unrecognized,

    #[error("Unsupported image format: {0}")]
    Unsupported(&'static str),
}
