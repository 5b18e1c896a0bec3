use image::{imageops, Rgba, RgbaImage};
use sticker_extractor::{
    decode, keying, parse_box_list, BoundingBox, Color, Error, ExtractOptions, StickerExtractor,
};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn fill(img: &mut RgbaImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32), px: Rgba<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, px);
        }
    }
}

fn two_block_sheet() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(100, 100, WHITE);
    fill(&mut img, (10, 10), (30, 30), RED);
    fill(&mut img, (60, 60), (90, 90), BLUE);
    img
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 0.01 + 1e-9,
        "expected ~{expected}, got {actual}"
    );
}

#[test]
fn end_to_end_two_blocks() {
    let sheet = two_block_sheet();
    let extractor = StickerExtractor::default();

    let detection = extractor.detect(&sheet).unwrap();
    assert_eq!(detection.background, Color::new(255, 255, 255, 255));
    assert_eq!(detection.boxes.len(), 2);

    let (a, b) = (&detection.boxes[0], &detection.boxes[1]);
    assert_close(a.xmin, 0.10);
    assert_close(a.ymin, 0.10);
    assert_close(a.xmax, 0.30);
    assert_close(a.ymax, 0.30);
    assert_close(b.xmin, 0.60);
    assert_close(b.ymin, 0.60);
    assert_close(b.xmax, 0.90);
    assert_close(b.ymax, 0.90);

    let stickers = extractor.extract(&sheet, &detection.boxes, Some(detection.background));
    assert_eq!(stickers.len(), 2);
    // Flooring the padded extent loses the red crop's far padding column and row.
    assert_eq!(stickers[0].image.dimensions(), (21, 21));
    assert_eq!(stickers[1].image.dimensions(), (32, 32));
    for sticker in &stickers {
        let (w, h) = sticker.image.dimensions();
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1)] {
            assert_eq!(sticker.image.get_pixel(x, y)[3], 0, "corner ({x}, {y})");
        }
        assert_eq!(sticker.image.get_pixel(w / 2, h / 2)[3], 255);
    }
    assert_eq!(stickers[0].image.get_pixel(20, 20), &RED);
    assert_eq!(stickers[1].image.get_pixel(31, 31)[3], 0);
    assert_eq!(stickers[1].id, "sticker-1");
}

#[test]
fn disjoint_rectangles_yield_one_box_each_in_scan_order() {
    let mut img = RgbaImage::from_pixel(120, 90, Rgba([20, 120, 60, 255]));
    let rects = [
        ((70, 5), (90, 20)),
        ((5, 8), (25, 40)),
        ((40, 30), (60, 60)),
        ((5, 60), (30, 85)),
        ((80, 62), (115, 80)),
    ];
    for &(from, to) in &rects {
        fill(&mut img, from, to, Rgba([240, 240, 10, 255]));
    }

    let det = StickerExtractor::default().detect(&img).unwrap();
    let mins: Vec<(f64, f64)> = det.boxes.iter().map(|b| (b.xmin, b.ymin)).collect();
    let expected: Vec<(f64, f64)> = rects
        .iter()
        .map(|&((x, y), _)| (f64::from(x) / 120.0, f64::from(y) / 90.0))
        .collect();
    assert_eq!(mins, expected);

    for b in &det.boxes {
        assert!(0.0 <= b.xmin && b.xmin < b.xmax && b.xmax <= 1.0);
        assert!(0.0 <= b.ymin && b.ymin < b.ymax && b.ymax <= 1.0);
    }
}

#[test]
fn detection_is_deterministic() {
    let sheet = two_block_sheet();
    let extractor = StickerExtractor::default();
    let first = extractor.detect(&sheet).unwrap();
    let second = extractor.detect(&sheet).unwrap();
    assert_eq!(first, second);
}

#[test]
fn boxes_apply_to_higher_resolution_source() {
    let low = two_block_sheet();
    let high = imageops::resize(&low, 400, 400, imageops::FilterType::Nearest);
    let extractor = StickerExtractor::default();

    let det = extractor.detect(&low).unwrap();
    let stickers = extractor.extract(&high, &det.boxes, Some(det.background));
    assert_eq!(stickers.len(), 2);

    let (w, h) = stickers[0].image.dimensions();
    assert!((86..=90).contains(&w), "width {w}");
    assert!((86..=90).contains(&h), "height {h}");
    assert_eq!(stickers[0].image.get_pixel(0, 0)[3], 0);
    assert_eq!(stickers[0].image.get_pixel(w / 2, h / 2), &RED);
}

#[test]
fn transparent_sheet_is_segmented_by_alpha() {
    let mut img = RgbaImage::new(60, 60);
    // Opaque white sticker on a fully transparent sheet.
    fill(&mut img, (15, 15), (45, 45), WHITE);
    let extractor = StickerExtractor::default();

    let det = extractor.detect(&img).unwrap();
    assert!(det.background.is_transparent());
    assert_eq!(det.boxes.len(), 1);

    let stickers = extractor.extract(&img, &det.boxes, Some(det.background));
    let s = &stickers[0].image;
    // White content survives even though it would match a white background.
    assert_eq!(s.get_pixel(s.width() / 2, s.height() / 2), &WHITE);
}

#[test]
fn near_background_fringe_is_detected_then_keyed() {
    // Distance 40 from white: above the detection threshold, below the removal one.
    let fringe = Rgba([215, 255, 255, 255]);
    let mut img = RgbaImage::from_pixel(60, 60, WHITE);
    fill(&mut img, (15, 15), (45, 45), fringe);
    let extractor = StickerExtractor::default();

    let det = extractor.detect(&img).unwrap();
    assert_eq!(det.boxes.len(), 1);

    let stickers = extractor.extract(&img, &det.boxes, Some(det.background));
    let s = &stickers[0].image;
    let center = s.get_pixel(s.width() / 2, s.height() / 2);
    assert_eq!(center[3], 0);
    assert_eq!(center[0], 215);
}

#[test]
fn keying_twice_matches_keying_once() {
    let sheet = two_block_sheet();
    let bg = Some(Color::new(255, 255, 255, 255));
    let mut once = sheet.clone();
    keying::key_background(&mut once, bg, 45);
    let mut twice = once.clone();
    keying::key_background(&mut twice, bg, 45);
    assert_eq!(once, twice);
}

#[test]
fn external_boxes_feed_extraction() {
    let sheet = two_block_sheet();
    let boxes = parse_box_list(
        r#"[{"ymin": 0.6, "xmin": 0.6, "ymax": 0.9, "xmax": 0.9, "label": "blue square"}]"#,
    )
    .unwrap();
    let (det, stickers) = StickerExtractor::default()
        .process_image(&sheet, Some(&boxes))
        .unwrap();
    assert_eq!(det.background, Color::new(255, 255, 255, 255));
    assert_eq!(stickers.len(), 1);
    assert_eq!(stickers[0].bbox.label_or_default(), "blue square");
}

#[test]
fn blank_sheet_reports_no_regions() {
    let blank = RgbaImage::from_pixel(50, 50, WHITE);
    let err = StickerExtractor::default()
        .process_image(&blank, None)
        .unwrap_err();
    assert!(matches!(err, Error::NoRegionsDetected));
    assert!(err.is_retryable());
}

#[test]
fn process_bytes_decodes_png() {
    let sheet = two_block_sheet();
    let mut png = std::io::Cursor::new(Vec::new());
    sheet.write_to(&mut png, image::ImageFormat::Png).unwrap();

    let (det, stickers) = StickerExtractor::default()
        .process_bytes(png.get_ref(), "image/png", None)
        .unwrap();
    assert_eq!(det.boxes.len(), 2);

    let encoded = stickers[0].encode_png().unwrap();
    let back = decode(&encoded, "image/png").unwrap();
    assert_eq!(back, stickers[0].image);
}

#[test]
fn process_file_writes_stickers_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("sheet.png");
    two_block_sheet().save(&input).unwrap();
    let out = dir.path().join("out");

    let result = StickerExtractor::default().process_file(&input, &out, None);
    assert!(result.success, "{}", result.message);
    assert_eq!(result.sticker_count, 2);

    for id in ["sticker-0", "sticker-1"] {
        let sticker = image::open(out.join(format!("sheet_{id}.png")))
            .unwrap()
            .to_rgba8();
        assert_eq!(sticker.get_pixel(0, 0)[3], 0);
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("sheet_manifest.json")).unwrap())
            .unwrap();
    let stickers = manifest["stickers"].as_array().unwrap();
    assert_eq!(stickers.len(), 2);
    assert_eq!(stickers[0]["file"], "sheet_sticker-0.png");
    assert_eq!(stickers[1]["bbox"]["label"], "Sticker");
    assert_eq!(manifest["background"]["r"], 255);
}

#[test]
fn process_file_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"not a png").unwrap();

    let result = StickerExtractor::default().process_file(&input, dir.path(), None);
    assert!(!result.success);
    assert!(result.message.contains("decode"), "{}", result.message);
}

#[test]
fn process_directory_handles_each_image() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    two_block_sheet().save(input.join("a.png")).unwrap();
    RgbaImage::from_pixel(40, 40, WHITE)
        .save(input.join("b.png"))
        .unwrap();
    std::fs::write(input.join("notes.txt"), "ignored").unwrap();
    let out = dir.path().join("out");

    let opts = ExtractOptions {
        remove_background: false,
        ..ExtractOptions::default()
    };
    let results = StickerExtractor::new(opts).process_directory(&input, &out);
    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].sticker_count, 2);
    assert!(!results[1].success);

    let kept = image::open(out.join("a_sticker-0.png")).unwrap().to_rgba8();
    assert_eq!(kept.get_pixel(0, 0)[3], 255);
}

#[test]
fn explicit_box_must_be_valid() {
    assert!(BoundingBox::new(0.2, 0.2, 0.1, 0.4, None).is_err());
}
