//! Color-keyed background removal.
//!
//! Pixels close to the reference background color get their alpha zeroed. The
//! operation is idempotent: keyed pixels fall under [`KEYED_ALPHA`] and are
//! skipped on any later pass.

use crate::color::Color;
use crate::PixelBuffer;

/// Pixels with alpha below this are considered already removed.
pub const KEYED_ALPHA: u8 = 10;

/// Zero the alpha of every pixel within `threshold` of `reference`.
///
/// With no reference the buffer is left untouched, and so it is when the
/// reference marks a transparent-background source. Returns the number of
/// pixels keyed out.
pub fn key_background(image: &mut PixelBuffer, reference: Option<Color>, threshold: u32) -> usize {
    let Some(reference) = reference else {
        return 0;
    };
    if reference.is_transparent() {
        return 0;
    }

    let mut keyed = 0;
    for px in image.pixels_mut() {
        let color = Color::from(*px);
        if color.a < KEYED_ALPHA {
            continue;
        }
        if color.distance(reference) < threshold {
            px[3] = 0;
            keyed += 1;
        }
    }
    keyed
}
