// Per-image pipeline: segment -> rank -> annotate, plus the batch item wrapper that writes outputs

use std::path::PathBuf;

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::annotation::annotate;
use crate::blur::IntensityField;
use crate::config::Config;
use crate::debug_panel::render_debug_panel;
use crate::errors::Result;
use crate::image_io::{save_image, InputImage};
use crate::output::{write_region_csv, ImageReport};
use crate::ranking::{rank, RankedRegion};
use crate::segmentation::segment;

/// Everything computed for one image
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub mask: GrayImage,
    pub intensity: IntensityField,
    /// All qualifying regions, not just the ones that received a marker
    pub regions: Vec<RankedRegion>,
    pub annotated: RgbImage,
}

/// Run segmentation, ranking and annotation with the configured limits
pub fn analyze_image(image: &RgbImage, config: &Config) -> Result<ImageAnalysis> {
    analyze_with_limit(image, config.ranking.max_arrows, config)
}

/// Annotate the most severe regions of one image, marking at most `max_arrows` of them
pub fn process_image(image: &RgbImage, max_arrows: usize, config: &Config) -> Result<RgbImage> {
    Ok(analyze_with_limit(image, max_arrows, config)?.annotated)
}

fn analyze_with_limit(image: &RgbImage, max_arrows: usize, config: &Config) -> Result<ImageAnalysis> {
    config.validate()?;
    let segmentation = segment(image, &config.segmentation)?;
    let regions = rank(
        &segmentation.mask,
        &segmentation.intensity,
        config.ranking.min_region_area,
    )?;
    let annotated = annotate(image, &regions, max_arrows, &config.annotation)?;

    Ok(ImageAnalysis {
        mask: segmentation.mask,
        intensity: segmentation.intensity,
        regions,
        annotated,
    })
}

/// Process one batch item and write its outputs.
///
/// The annotated image is written only after annotation has fully succeeded,
/// so a failed image leaves nothing behind.
pub fn process_input(input_image: InputImage, config: &Config, debug: bool) -> Result<ImageReport> {
    let InputImage { image, path, filename } = input_image;
    debug!(path = %path.display(), "processing image");

    let analysis = analyze_image(&image, config)?;
    info!("{}: found {} candidate inflammation regions", filename, analysis.regions.len());

    let output_dir = PathBuf::from(&config.output_base_dir);
    let output_path = output_dir.join(format!("annotated_{}", filename));
    save_image(&analysis.annotated, &output_path)?;
    info!("{}: saved to {}", filename, output_path.display());

    if config.write_region_csv {
        let csv_path = write_region_csv(&analysis.regions, &output_dir, &filename)?;
        debug!(path = %csv_path.display(), "wrote region report");
    }

    if debug {
        for (rank, region) in analysis.regions.iter().enumerate() {
            debug!(
                rank = rank + 1,
                x = region.x,
                y = region.y,
                severity = region.severity,
                area = region.area,
                "region"
            );
        }

        let panel = render_debug_panel(&image, &analysis);
        let panel_path = output_dir.join(format!("debug_{}.png", file_stem(&filename)));
        save_image(&panel, &panel_path)?;
        info!("{}: debug panel saved to {}", filename, panel_path.display());
    }

    Ok(ImageReport {
        filename,
        region_count: analysis.regions.len(),
        output_path,
    })
}

fn file_stem(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename)
}
