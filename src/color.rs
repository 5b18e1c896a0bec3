//! Background color estimation and foreground/background pixel classification.
//!
//! The reference background is sampled from the top-left corner. Sticker sheets
//! are expected to have a uniform border, so a single sample is enough; noisy or
//! gradient backgrounds degrade detection and are not corrected for.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::PixelBuffer;

/// Color distance threshold used when detecting regions.
pub const DETECT_THRESHOLD: u32 = 35;

/// Color distance threshold used when keying out the background of a crop.
///
/// Kept larger than [`DETECT_THRESHOLD`] so fringe pixels that detection
/// attributed to a sticker are still cleared during removal.
pub const REMOVE_THRESHOLD: u32 = 45;

/// Pixels with alpha below this are treated as transparent during classification.
pub const TRANSPARENT_ALPHA: u8 = 20;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Create a color from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether this color, taken as a background reference, marks a
    /// transparent-background source.
    #[must_use]
    pub fn is_transparent(self) -> bool {
        self.a < TRANSPARENT_ALPHA
    }

    /// Manhattan distance over the RGB channels, ignoring alpha.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        u32::from(self.r.abs_diff(other.r))
            + u32::from(self.g.abs_diff(other.g))
            + u32::from(self.b.abs_diff(other.b))
    }
}

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        Self { r, g, b, a }
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Sample the reference background color from the top-left pixel.
///
/// Returns `None` only for an empty buffer.
#[must_use]
pub fn estimate_background(image: &PixelBuffer) -> Option<Color> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    Some(Color::from(*image.get_pixel(0, 0)))
}

/// Decides whether a pixel belongs to the background.
#[derive(Debug, Clone, Copy)]
pub struct PixelClassifier {
    reference: Color,
    transparent: bool,
    threshold: u32,
}

impl PixelClassifier {
    /// Build a classifier against `reference`, deriving transparent-background
    /// mode from the reference's alpha.
    #[must_use]
    pub fn new(reference: Color, threshold: u32) -> Self {
        Self {
            reference,
            transparent: reference.is_transparent(),
            threshold,
        }
    }

    /// The reference background color.
    #[must_use]
    pub fn reference(&self) -> Color {
        self.reference
    }

    /// Whether the classifier runs in transparent-background mode.
    #[must_use]
    pub fn is_transparent_mode(&self) -> bool {
        self.transparent
    }

    /// Classify a single pixel.
    ///
    /// Near-transparent pixels are always background. In transparent-background
    /// mode that is the only rule; otherwise a pixel is also background when its
    /// RGB distance to the reference is strictly below the threshold.
    #[must_use]
    pub fn is_background(&self, px: Rgba<u8>) -> bool {
        let color = Color::from(px);
        if color.a < TRANSPARENT_ALPHA {
            return true;
        }
        if self.transparent {
            return false;
        }
        color.distance(self.reference) < self.threshold
    }
}
