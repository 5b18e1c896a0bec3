//! Normalized bounding boxes.
//!
//! Boxes are stored as fractions of the image size at detection time, so the
//! same box can be applied to a higher-resolution copy of the image. The JSON
//! shape matches what external detectors return: required `ymin`, `xmin`,
//! `ymax`, `xmax` in `[0, 1]` and an optional `label`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Label given to regions found by the scanner.
pub const DEFAULT_LABEL: &str = "Sticker";

/// A rectangle normalized to `[0, 1]` on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top edge.
    pub ymin: f64,
    /// Left edge.
    pub xmin: f64,
    /// Bottom edge (exclusive).
    pub ymax: f64,
    /// Right edge (exclusive).
    pub xmax: f64,
    /// Optional description of the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An integer pixel rectangle inside a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Create a box, checking `0 <= min < max <= 1` on both axes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBox`] when an edge is out of range or inverted.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, label: Option<String>) -> Result<Self> {
        let bbox = Self {
            ymin,
            xmin,
            ymax,
            xmax,
            label,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Build a box from an inclusive pixel rectangle in an image of `width` x `height`.
    ///
    /// The max edges are made exclusive by adding one pixel.
    #[must_use]
    pub fn from_pixel_bounds(
        (min_x, min_y): (u32, u32),
        (max_x, max_y): (u32, u32),
        (width, height): (u32, u32),
        label: Option<String>,
    ) -> Self {
        let w = f64::from(width);
        let h = f64::from(height);
        Self {
            xmin: f64::from(min_x) / w,
            ymin: f64::from(min_y) / h,
            xmax: f64::from(max_x + 1) / w,
            ymax: f64::from(max_y + 1) / h,
            label,
        }
    }

    /// Check the range invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBox`] describing the first violated edge.
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        for (name, v) in [
            ("xmin", self.xmin),
            ("ymin", self.ymin),
            ("xmax", self.xmax),
            ("ymax", self.ymax),
        ] {
            if !unit.contains(&v) {
                return Err(Error::InvalidBox(format!("{name} {v} outside [0, 1]")));
            }
        }
        if self.xmin >= self.xmax {
            return Err(Error::InvalidBox(format!(
                "xmin {} >= xmax {}",
                self.xmin, self.xmax
            )));
        }
        if self.ymin >= self.ymax {
            return Err(Error::InvalidBox(format!(
                "ymin {} >= ymax {}",
                self.ymin, self.ymax
            )));
        }
        Ok(())
    }

    /// Label, falling back to [`DEFAULT_LABEL`].
    #[must_use]
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    /// Expand by `padding` on every side and clamp to `[0, 1]`.
    ///
    /// Returns `(xmin, ymin, xmax, ymax)`.
    #[must_use]
    pub fn padded(&self, padding: f64) -> (f64, f64, f64, f64) {
        (
            (self.xmin - padding).max(0.0),
            (self.ymin - padding).max(0.0),
            (self.xmax + padding).min(1.0),
            (self.ymax + padding).min(1.0),
        )
    }

    /// Map the padded box onto an image of `width` x `height`.
    ///
    /// The origin is floored, and so is the padded extent, so float error can
    /// shave a pixel off the far edge. Returns `None` when the result has no area.
    ///
    /// ```
    /// use sticker_extractor::{BoundingBox, PixelRect};
    ///
    /// let b = BoundingBox::new(0.1, 0.1, 0.3, 0.3, None).unwrap();
    /// let r = b.to_pixel_rect(100, 100, 0.01).unwrap();
    /// // (0.31 - 0.09) * 100 evaluates to 21.999..., floored to 21.
    /// assert_eq!(r, PixelRect { x: 9, y: 9, width: 21, height: 21 });
    /// ```
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::similar_names
    )]
    pub fn to_pixel_rect(&self, width: u32, height: u32, padding: f64) -> Option<PixelRect> {
        let (xmin, ymin, xmax, ymax) = self.padded(padding);
        let w = f64::from(width);
        let h = f64::from(height);

        let floor_px = |v: f64| v.floor().max(0.0) as u32;

        let x = floor_px(xmin * w).min(width);
        let y = floor_px(ymin * h).min(height);
        let pw = floor_px((xmax - xmin) * w).min(width - x);
        let ph = floor_px((ymax - ymin) * h).min(height - y);

        if pw == 0 || ph == 0 {
            return None;
        }
        Some(PixelRect {
            x,
            y,
            width: pw,
            height: ph,
        })
    }
}

/// Parse a JSON array of boxes as returned by an external detector.
///
/// Every box is validated; a single bad entry rejects the whole list.
///
/// # Errors
///
/// Returns [`Error::BoxList`] for malformed JSON or missing fields, and
/// [`Error::InvalidBox`] for boxes outside the unit square.
pub fn parse_box_list(json: &str) -> Result<Vec<BoundingBox>> {
    let boxes: Vec<BoundingBox> = serde_json::from_str(json)?;
    for (i, b) in boxes.iter().enumerate() {
        b.validate()
            .map_err(|e| Error::InvalidBox(format!("box {i}: {e}")))?;
    }
    Ok(boxes)
}
