//! Connected-component scan over a classified image.
//!
//! Pixels are visited in row-major order. Each unvisited foreground pixel seeds
//! an iterative 4-connected flood fill that accumulates the region's bounding
//! rectangle and pixel count. Regions that fail the noise filter are dropped;
//! the rest become normalized [`BoundingBox`] values in discovery order.

use crate::bbox::{BoundingBox, DEFAULT_LABEL};
use crate::color::PixelClassifier;
use crate::PixelBuffer;

/// Default minimum span (exclusive) of a region on each axis, in pixels.
pub const MIN_EXTENT: u32 = 10;

/// Default minimum pixel count (exclusive) of a region.
pub const MIN_PIXELS: usize = 50;

/// Noise gate applied to every region after its fill completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFilter {
    /// `max_x - min_x` and `max_y - min_y` must both exceed this.
    pub min_extent: u32,
    /// The pixel count must exceed this.
    pub min_pixels: usize,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            min_extent: MIN_EXTENT,
            min_pixels: MIN_PIXELS,
        }
    }
}

impl RegionFilter {
    /// Whether `region` is large enough to be kept.
    #[must_use]
    pub fn accepts(&self, region: &Region) -> bool {
        region.max_x - region.min_x > self.min_extent
            && region.max_y - region.min_y > self.min_extent
            && region.pixel_count > self.min_pixels
    }
}

/// One connected foreground component, reduced to its bounds and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Leftmost column (inclusive).
    pub min_x: u32,
    /// Topmost row (inclusive).
    pub min_y: u32,
    /// Rightmost column (inclusive).
    pub max_x: u32,
    /// Bottom row (inclusive).
    pub max_y: u32,
    /// Number of pixels in the component.
    pub pixel_count: usize,
}

/// Find every connected foreground component, in scan order of its first pixel.
///
/// Every pixel is classified at most once. Components are reported unfiltered.
#[must_use]
pub fn find_regions(image: &PixelBuffer, classifier: &PixelClassifier) -> Vec<Region> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut visited = vec![false; width * height];
    let mut stack: Vec<usize> = Vec::new();
    let mut regions = Vec::new();

    let is_background = |idx: usize| {
        #[allow(clippy::cast_possible_truncation)]
        let (x, y) = ((idx % width) as u32, (idx / width) as u32);
        classifier.is_background(*image.get_pixel(x, y))
    };

    for idx in 0..width * height {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        if is_background(idx) {
            continue;
        }

        let (mut min_x, mut max_x) = (idx % width, idx % width);
        let (mut min_y, mut max_y) = (idx / width, idx / width);
        let mut pixel_count = 0usize;
        stack.push(idx);

        while let Some(curr) = stack.pop() {
            let cx = curr % width;
            let cy = curr / width;
            pixel_count += 1;

            min_x = min_x.min(cx);
            max_x = max_x.max(cx);
            min_y = min_y.min(cy);
            max_y = max_y.max(cy);

            let mut neighbors = [None; 4];
            if cx > 0 {
                neighbors[0] = Some(curr - 1);
            }
            if cx + 1 < width {
                neighbors[1] = Some(curr + 1);
            }
            if cy > 0 {
                neighbors[2] = Some(curr - width);
            }
            if cy + 1 < height {
                neighbors[3] = Some(curr + width);
            }

            for n in neighbors.into_iter().flatten() {
                if visited[n] {
                    continue;
                }
                // Background neighbors are marked too: their class cannot change.
                visited[n] = true;
                if !is_background(n) {
                    stack.push(n);
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let region = Region {
            min_x: min_x as u32,
            min_y: min_y as u32,
            max_x: max_x as u32,
            max_y: max_y as u32,
            pixel_count,
        };
        regions.push(region);
    }

    regions
}

/// Scan `image` and return one normalized box per component that passes `filter`.
///
/// Boxes carry `label` when given, otherwise [`DEFAULT_LABEL`].
#[must_use]
pub fn scan(
    image: &PixelBuffer,
    classifier: &PixelClassifier,
    filter: &RegionFilter,
    label: Option<&str>,
) -> Vec<BoundingBox> {
    let dims = image.dimensions();
    let label = label.unwrap_or(DEFAULT_LABEL);

    find_regions(image, classifier)
        .into_iter()
        .filter(|region| {
            let keep = filter.accepts(region);
            if !keep {
                log::trace!(
                    "dropping region at ({}, {}) {}x{} with {} px",
                    region.min_x,
                    region.min_y,
                    region.max_x - region.min_x + 1,
                    region.max_y - region.min_y + 1,
                    region.pixel_count,
                );
            }
            keep
        })
        .map(|region| {
            log::debug!(
                "region ({}, {})..=({}, {}) {} px",
                region.min_x,
                region.min_y,
                region.max_x,
                region.max_y,
                region.pixel_count,
            );
            BoundingBox::from_pixel_bounds(
                (region.min_x, region.min_y),
                (region.max_x, region.max_y),
                dims,
                Some(label.to_string()),
            )
        })
        .collect()
}
