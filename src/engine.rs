//! Sticker extraction pipeline: decode, detect, crop and key.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops, ImageFormat};
use serde::Serialize;

use crate::bbox::{BoundingBox, DEFAULT_LABEL};
use crate::color::{self, Color, PixelClassifier, DETECT_THRESHOLD, REMOVE_THRESHOLD};
use crate::crop::{self, CROP_PADDING};
use crate::error::{Error, Result};
use crate::keying;
use crate::scan::{self, RegionFilter, MIN_EXTENT, MIN_PIXELS};
use crate::PixelBuffer;

/// Largest side, in pixels, of the buffer the scanner runs on.
pub const MAX_DETECT_DIMENSION: u32 = 2048;

/// Options controlling detection and extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Color distance below which a pixel is background during detection.
    pub detect_threshold: u32,
    /// Color distance below which a pixel is keyed out of a crop.
    pub remove_threshold: u32,
    /// Minimum region span (exclusive) on each axis, in detection pixels.
    pub min_extent: u32,
    /// Minimum region pixel count (exclusive).
    pub min_pixels: usize,
    /// Padding added around each box before cropping, normalized.
    pub padding: f64,
    /// Downscale images larger than this before scanning. `None` scans at full size.
    pub max_detect_dimension: Option<u32>,
    /// Label attached to scanned regions.
    pub label: String,
    /// Make background-colored pixels transparent in the output.
    pub remove_background: bool,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            detect_threshold: DETECT_THRESHOLD,
            remove_threshold: REMOVE_THRESHOLD,
            min_extent: MIN_EXTENT,
            min_pixels: MIN_PIXELS,
            padding: CROP_PADDING,
            max_detect_dimension: Some(MAX_DETECT_DIMENSION),
            label: DEFAULT_LABEL.to_string(),
            remove_background: true,
            verbose: false,
            quiet: false,
        }
    }
}

impl ExtractOptions {
    fn region_filter(&self) -> RegionFilter {
        RegionFilter {
            min_extent: self.min_extent,
            min_pixels: self.min_pixels,
        }
    }
}

/// Output of [`StickerExtractor::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// One box per accepted region, in scan order.
    pub boxes: Vec<BoundingBox>,
    /// Reference background color sampled during detection.
    pub background: Color,
}

/// One extracted sticker.
#[derive(Debug, Clone)]
pub struct StickerResult {
    /// Identifier of the form `sticker-{index}`, where `index` is the box position.
    pub id: String,
    /// The cropped and keyed pixels.
    pub image: PixelBuffer,
    /// The box the sticker was cut from.
    pub bbox: BoundingBox,
}

impl StickerResult {
    /// Encode the sticker as PNG, preserving alpha.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Number of stickers written.
    pub sticker_count: usize,
    /// Human-readable status message.
    pub message: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    source: String,
    background: Color,
    stickers: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    id: &'a str,
    file: String,
    width: u32,
    height: u32,
    bbox: &'a BoundingBox,
}

/// Splits sticker sheets into individual stickers.
///
/// Holds only configuration; every call works on buffers local to that call,
/// so one extractor can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct StickerExtractor {
    options: ExtractOptions,
}

impl StickerExtractor {
    /// Create an extractor with the given options.
    #[must_use]
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// The options this extractor was built with.
    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Find sticker regions in `image`.
    ///
    /// Large images are downscaled first; returned boxes are normalized and
    /// apply to the original resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RenderSurface`] for an empty buffer and
    /// [`Error::NoRegionsDetected`] when nothing passes the noise filter.
    pub fn detect(&self, image: &PixelBuffer) -> Result<Detection> {
        let scaled = self.detection_buffer(image)?;
        let target = scaled.as_ref().unwrap_or(image);

        let background = color::estimate_background(target)
            .ok_or_else(|| Error::RenderSurface("empty detection buffer".to_string()))?;
        let classifier = PixelClassifier::new(background, self.options.detect_threshold);
        log::debug!(
            "background {background:?} (transparent: {}), scanning {}x{}",
            classifier.is_transparent_mode(),
            target.width(),
            target.height(),
        );

        let boxes = scan::scan(
            target,
            &classifier,
            &self.options.region_filter(),
            Some(&self.options.label),
        );
        if boxes.is_empty() {
            return Err(Error::NoRegionsDetected);
        }
        log::debug!("detected {} regions", boxes.len());

        Ok(Detection { boxes, background })
    }

    /// Downscaled copy of `image` for scanning, or `None` if it is small enough.
    fn detection_buffer(&self, image: &PixelBuffer) -> Result<Option<PixelBuffer>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::RenderSurface(format!("image has no area ({w}x{h})")));
        }
        let Some(max_dim) = self.options.max_detect_dimension else {
            return Ok(None);
        };
        if w <= max_dim && h <= max_dim {
            return Ok(None);
        }

        let scale = (f64::from(max_dim) / f64::from(w)).min(f64::from(max_dim) / f64::from(h));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (sw, sh) = (
            ((f64::from(w) * scale).floor() as u32).max(1),
            ((f64::from(h) * scale).floor() as u32).max(1),
        );
        log::debug!("downscaling {w}x{h} to {sw}x{sh} for detection");
        Ok(Some(imageops::resize(
            image,
            sw,
            sh,
            imageops::FilterType::Triangle,
        )))
    }

    /// Crop every box out of `source` and key out `background`.
    ///
    /// Boxes that cover no whole pixel of `source` are dropped, so the result
    /// may be shorter than `boxes`. Order follows `boxes`. With the `parallel`
    /// feature regions are processed on the rayon pool.
    #[must_use]
    pub fn extract(
        &self,
        source: &PixelBuffer,
        boxes: &[BoundingBox],
        background: Option<Color>,
    ) -> Vec<StickerResult> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            boxes
                .par_iter()
                .enumerate()
                .filter_map(|(i, bbox)| self.extract_one(source, i, bbox, background))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            boxes
                .iter()
                .enumerate()
                .filter_map(|(i, bbox)| self.extract_one(source, i, bbox, background))
                .collect()
        }
    }

    fn extract_one(
        &self,
        source: &PixelBuffer,
        index: usize,
        bbox: &BoundingBox,
        background: Option<Color>,
    ) -> Option<StickerResult> {
        let Some(mut image) = crop::crop_region(source, bbox, self.options.padding) else {
            log::warn!(
                "box {index} covers no pixels at {}x{}, skipped",
                source.width(),
                source.height()
            );
            return None;
        };
        let keyed = keying::key_background(&mut image, background, self.options.remove_threshold);
        log::debug!(
            "sticker-{index}: {}x{}, {keyed} px keyed",
            image.width(),
            image.height()
        );
        Some(StickerResult {
            id: format!("sticker-{index}"),
            image,
            bbox: bbox.clone(),
        })
    }

    /// Run the whole pipeline on encoded bytes.
    ///
    /// When `boxes` is given (e.g. from an external detector) it replaces the
    /// scanner's output; the background is still sampled for keying.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Decode`], [`Error::RenderSurface`] and
    /// [`Error::NoRegionsDetected`].
    pub fn process_bytes(
        &self,
        bytes: &[u8],
        mime_type: &str,
        boxes: Option<&[BoundingBox]>,
    ) -> Result<(Detection, Vec<StickerResult>)> {
        let image = decode(bytes, mime_type)?;
        self.process_image(&image, boxes)
    }

    /// Run detection (unless `boxes` is given) and extraction on a decoded image.
    ///
    /// # Errors
    ///
    /// Same as [`StickerExtractor::process_bytes`], minus decoding.
    pub fn process_image(
        &self,
        image: &PixelBuffer,
        boxes: Option<&[BoundingBox]>,
    ) -> Result<(Detection, Vec<StickerResult>)> {
        let detection = match boxes {
            Some(boxes) if boxes.is_empty() => return Err(Error::NoRegionsDetected),
            Some(boxes) => Detection {
                boxes: boxes.to_vec(),
                background: color::estimate_background(image)
                    .ok_or_else(|| Error::RenderSurface("empty image".to_string()))?,
            },
            None => self.detect(image)?,
        };

        let key = self.options.remove_background.then_some(detection.background);
        let stickers = self.extract(image, &detection.boxes, key);
        Ok((detection, stickers))
    }

    /// Process a single image file: load, detect, extract, write PNGs and a manifest.
    ///
    /// Stickers are written as `<stem>_<id>.png` in `output_dir`, alongside
    /// `<stem>_manifest.json`.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
        boxes: Option<&[BoundingBox]>,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            sticker_count: 0,
            message: String::new(),
        };

        match self.write_stickers(input, output_dir, boxes) {
            Ok(count) => {
                log::debug!("{}: {count} stickers", input.display());
                result.success = true;
                result.sticker_count = count;
                result.message = format!("{count} stickers extracted");
            }
            Err(e) => {
                log::debug!("{}: {e}", input.display());
                result.message = e.to_string();
            }
        }

        result
    }

    fn write_stickers(
        &self,
        input: &Path,
        output_dir: &Path,
        boxes: Option<&[BoundingBox]>,
    ) -> Result<usize> {
        let bytes = std::fs::read(input)?;
        let (detection, stickers) = self.process_bytes(&bytes, mime_for_path(input), boxes)?;

        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
        }

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let mut entries = Vec::with_capacity(stickers.len());
        for sticker in &stickers {
            let file = format!("{stem}_{}.png", sticker.id);
            std::fs::write(output_dir.join(&file), sticker.encode_png()?)?;
            entries.push(ManifestEntry {
                id: &sticker.id,
                file,
                width: sticker.image.width(),
                height: sticker.image.height(),
                bbox: &sticker.bbox,
            });
        }

        let manifest = Manifest {
            source: input.display().to_string(),
            background: detection.background,
            stickers: entries,
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(output_dir.join(format!("{stem}_manifest.json")), json)?;

        Ok(stickers.len())
    }

    /// Process all supported images in a directory into `output_dir`.
    ///
    /// Uses parallel iteration when the `parallel` feature is enabled.
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    sticker_count: 0,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };
        entries.sort();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|path| self.process_file(path, output_dir, None))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries
                .iter()
                .map(|path| self.process_file(path, output_dir, None))
                .collect()
        }
    }
}

/// Decode encoded image bytes into an RGBA buffer.
///
/// The format is sniffed from the bytes, falling back to `mime_type`.
///
/// # Errors
///
/// Returns [`Error::Decode`] for unrecognized, malformed or empty images.
pub fn decode(bytes: &[u8], mime_type: &str) -> Result<PixelBuffer> {
    let format = image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_mime_type(mime_type))
        .ok_or_else(|| Error::Decode(format!("unrecognized image data ({mime_type})")))?;

    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| Error::Decode(e.to_string()))?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Decode("image has no pixels".to_string()));
    }
    Ok(image)
}

/// Wrap raw row-major RGBA bytes as a pixel buffer.
///
/// # Errors
///
/// Returns [`Error::RenderSurface`] if a dimension is zero or `bytes` is not
/// exactly `width * height * 4` long.
pub fn pixel_buffer_from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(Error::RenderSurface(format!(
            "buffer must be at least 1x1, got {width}x{height}"
        )));
    }
    let len = bytes.len();
    let expected = u64::from(width) * u64::from(height) * 4;
    if len as u64 != expected {
        return Err(Error::RenderSurface(format!(
            "{len} bytes do not match a {width}x{height} RGBA buffer"
        )));
    }
    PixelBuffer::from_raw(width, height, bytes).ok_or_else(|| {
        Error::RenderSurface(format!("cannot allocate a {width}x{height} RGBA buffer"))
    })
}

/// Guess a MIME type from a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path).map_or("application/octet-stream", |f| f.to_mime_type())
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif"
        ),
        None => false,
    }
}

/// Generate a default output directory from an input path.
///
/// Example: `"sheet.png"` becomes `"sheet_stickers"`.
#[must_use]
pub fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_stickers"))
}
