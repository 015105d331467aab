use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info, warn};

use pathology_annotator_lib::{
    get_image_files_in_dir, load_image, process_input, write_summary_csv, Config, ImageReport,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Pathology annotator - marks candidate inflammation regions")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to an optional TOML parameter file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of regions to mark per image (overrides config)
    #[clap(short = 'n', long)]
    max_arrows: Option<usize>,

    /// Regions must be larger than this many pixels (overrides config)
    #[clap(long)]
    min_area: Option<u32>,

    /// Save a 2x2 debug panel per image and log every region
    #[clap(short, long)]
    debug: bool,

    /// Process images one at a time instead of in parallel
    #[clap(long)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }
    if let Some(max_arrows) = args.max_arrows {
        config.ranking.max_arrows = max_arrows;
    }
    if let Some(min_area) = args.min_area {
        config.ranking.min_region_area = min_area;
    }
    if args.sequential {
        config.use_parallel = false;
    }

    // Fail before touching any image
    config.validate()?;
    config
        .prepare_paths()
        .with_context(|| format!("cannot prepare input {} / output {}", config.input_path, config.output_base_dir))?;

    let start_time = Instant::now();

    let input_path = PathBuf::from(&config.input_path);
    let image_files = if input_path.is_file() {
        vec![input_path]
    } else {
        get_image_files_in_dir(&input_path)?
    };

    if image_files.is_empty() {
        warn!(
            "No images found in {} (supported: jpg, jpeg, png, bmp, tiff, tif)",
            config.input_path
        );
        return Ok(());
    }
    info!("Found {} images, processing...", image_files.len());

    let process = |path: &PathBuf| -> Option<ImageReport> {
        let result = load_image(path).and_then(|input| process_input(input, &config, args.debug));
        match result {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    };

    let mut reports: Vec<ImageReport> = if config.use_parallel {
        image_files.par_iter().filter_map(process).collect()
    } else {
        image_files.iter().filter_map(process).collect()
    };
    reports.sort_by(|a, b| a.filename.cmp(&b.filename));

    let failed = image_files.len() - reports.len();
    let total_regions: usize = reports.iter().map(|r| r.region_count).sum();

    let summary_path = write_summary_csv(&reports, &config.output_base_dir)?;

    info!("{}", "=".repeat(50));
    info!(
        "Processed {} of {} images, {} candidate regions",
        reports.len(),
        image_files.len(),
        total_regions
    );
    info!("Annotated images saved to: {}", config.output_base_dir);
    info!("Summary written to: {}", summary_path.display());
    info!("Processing completed in {:.2} seconds", start_time.elapsed().as_secs_f64());

    if reports.is_empty() {
        bail!("none of the {} input images could be processed", failed);
    }

    Ok(())
}
