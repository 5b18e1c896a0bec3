//! Cropping detected regions out of a source image.

use image::imageops;

use crate::bbox::BoundingBox;
use crate::PixelBuffer;

/// Padding added on every side of a box before cropping, as a fraction of the image.
pub const CROP_PADDING: f64 = 0.01;

/// Copy the padded region of `bbox` out of `source` at 1:1 scale.
///
/// `source` may have a different resolution from the image the box was
/// detected on. Returns `None` when the padded box covers no whole pixel.
#[must_use]
pub fn crop_region(
    source: &PixelBuffer,
    bbox: &BoundingBox,
    padding: f64,
) -> Option<PixelBuffer> {
    let rect = bbox.to_pixel_rect(source.width(), source.height(), padding)?;
    Some(imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image())
}
