//! Error types for the sticker-extractor crate.

/// Errors that can occur while detecting and extracting stickers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes could not be decoded into an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A pixel buffer could not be constructed for rendering.
    #[error("render surface unavailable: {0}")]
    RenderSurface(String),

    /// No foreground region passed the noise filter.
    #[error("no stickers detected, try an image with a clearer background")]
    NoRegionsDetected,

    /// A bounding box violates `0 <= min < max <= 1` on some axis.
    #[error("invalid bounding box: {0}")]
    InvalidBox(String),

    /// A box list from an external detector could not be parsed.
    #[error("malformed box list: {0}")]
    BoxList(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while encoding or saving an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether the caller can reasonably retry with a different image or settings.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::NoRegionsDetected)
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
