//! Split sticker sheets into individual stickers with transparent backgrounds.
//!
//! A sheet is expected to have a roughly uniform background. The background
//! color is sampled from the top-left corner, every pixel is classified against
//! it, and contiguous foreground pixels are grouped into regions by an
//! iterative flood fill. Regions that survive the noise filter are cropped out
//! with a little padding and the background color is keyed to transparent.
//!
//! # Quick Start
//!
//! ```no_run
//! use sticker_extractor::{ExtractOptions, StickerExtractor};
//!
//! let extractor = StickerExtractor::new(ExtractOptions::default());
//! let sheet = image::open("sheet.png").unwrap().to_rgba8();
//! let detection = extractor.detect(&sheet).expect("no stickers found");
//! let stickers = extractor.extract(&sheet, &detection.boxes, Some(detection.background));
//! for sticker in &stickers {
//!     std::fs::write(format!("{}.png", sticker.id), sticker.encode_png().unwrap()).unwrap();
//! }
//! ```
//!
//! # External boxes
//!
//! Boxes from another detector can replace the scanner's output, as long as
//! they follow the same normalized shape:
//!
//! ```no_run
//! use sticker_extractor::{parse_box_list, StickerExtractor};
//!
//! let boxes = parse_box_list(r#"[{"ymin":0.1,"xmin":0.1,"ymax":0.4,"xmax":0.3,"label":"cat"}]"#)
//!     .unwrap();
//! let bytes = std::fs::read("sheet.jpg").unwrap();
//! let (_, stickers) = StickerExtractor::default()
//!     .process_bytes(&bytes, "image/jpeg", Some(&boxes))
//!     .unwrap();
//! println!("{} stickers", stickers.len());
//! ```

#![deny(missing_docs)]

pub mod bbox;
pub mod color;
pub mod crop;
mod engine;
pub mod error;
pub mod keying;
pub mod scan;

pub use bbox::{parse_box_list, BoundingBox, PixelRect};
pub use color::{Color, PixelClassifier};
pub use engine::{
    decode, default_output_dir, is_supported_image, mime_for_path, pixel_buffer_from_raw,
    Detection, ExtractOptions, ProcessResult, StickerExtractor, StickerResult,
    MAX_DETECT_DIMENSION,
};
pub use error::{Error, Result};

/// A decoded image: row-major RGBA, 8 bits per channel.
pub type PixelBuffer = image::RgbaImage;
