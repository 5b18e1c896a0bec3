use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use sticker_extractor::{
    default_output_dir, parse_box_list, ExtractOptions, ProcessResult, StickerExtractor,
    MAX_DETECT_DIMENSION,
};

#[derive(Parser)]
#[command(
    name = "sticker-extract",
    about = "Split a sticker sheet into individual transparent stickers",
    version,
    after_help = "Simple usage: sticker-extract <sheet.png>  (writes <sheet>_stickers/)\n\n\
                  The background color is sampled from the top-left pixel, so sheets\n\
                  should have a uniform border."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output directory (default: {name}_stickers)
    #[arg(short, long)]
    output: Option<String>,

    /// JSON box list from an external detector, used instead of scanning
    #[arg(short, long)]
    boxes: Option<String>,

    /// Color distance below which a pixel counts as background when detecting
    #[arg(long, default_value = "35")]
    detect_threshold: u32,

    /// Color distance below which a pixel is made transparent
    #[arg(long, default_value = "45")]
    remove_threshold: u32,

    /// Regions must span more than this many pixels on each axis
    #[arg(long, default_value = "10")]
    min_extent: u32,

    /// Regions must contain more than this many pixels
    #[arg(long, default_value = "50")]
    min_pixels: usize,

    /// Padding around each crop, as a fraction of the image (0.0-0.5)
    #[arg(short, long, default_value = "0.01")]
    padding: f64,

    /// Downscale larger images to this size before scanning (0 disables)
    #[arg(long, default_value_t = MAX_DETECT_DIMENSION)]
    max_detect_dim: u32,

    /// Label given to detected stickers
    #[arg(long, default_value = "Sticker")]
    label: String,

    /// Keep the original background instead of making it transparent
    #[arg(long)]
    keep_background: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.detect_threshold == 0 || cli.remove_threshold == 0 {
        eprintln!("Error: Thresholds must be at least 1");
        process::exit(1);
    }

    if !(0.0..0.5).contains(&cli.padding) {
        eprintln!("Error: Padding must be in [0.0, 0.5)");
        process::exit(1);
    }

    let opts = ExtractOptions {
        detect_threshold: cli.detect_threshold,
        remove_threshold: cli.remove_threshold,
        min_extent: cli.min_extent,
        min_pixels: cli.min_pixels,
        padding: cli.padding,
        max_detect_dimension: (cli.max_detect_dim > 0).then_some(cli.max_detect_dim),
        label: cli.label,
        remove_background: !cli.keep_background,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let boxes = cli.boxes.as_deref().map(|path| {
        let loaded = std::fs::read_to_string(path)
            .map_err(sticker_extractor::Error::from)
            .and_then(|json| parse_box_list(&json));
        match loaded {
            Ok(boxes) => boxes,
            Err(e) => {
                eprintln!("Error: Failed to load boxes from {path}: {e}");
                process::exit(1);
            }
        }
    });

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let extractor = StickerExtractor::new(opts);

    let results = if input_path.is_dir() {
        if boxes.is_some() {
            eprintln!("Error: --boxes applies to a single image, not a directory");
            process::exit(1);
        }
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: sticker-extract <input_dir> -o <output_dir>");
            process::exit(1);
        };
        extractor.process_directory(input_path, &output_dir)
    } else {
        let output_dir = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_dir(input_path),
        };
        vec![extractor.process_file(input_path, &output_dir, boxes.as_deref())]
    };

    let opts = extractor.options();
    let mut success_count = 0u32;
    let mut fail_count = 0u32;
    let mut sticker_total = 0usize;

    for r in &results {
        print_result(r, opts);
        if r.success {
            success_count += 1;
            sticker_total += r.sticker_count;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {}, Stickers: {sticker_total})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ExtractOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        eprintln!("[OK] {filename} ({} stickers)", result.sticker_count);
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
