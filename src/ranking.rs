use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::blur::IntensityField;
use crate::errors::{AnnotatorError, Result};

/// A candidate region that passed the area filter, ready for annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedRegion {
    /// Centroid column, rounded to the nearest pixel
    pub x: u32,
    /// Centroid row, rounded to the nearest pixel
    pub y: u32,
    /// Mean intensity over the region's own pixels
    pub severity: f32,
    /// Pixel count
    pub area: u32,
}

impl RankedRegion {
    /// Combined clinical weight: large and locally intense regions come first
    #[inline]
    pub fn weight(&self) -> f64 {
        f64::from(self.severity) * f64::from(self.area)
    }
}

/// Running sums for one connected component
#[derive(Debug, Clone, Copy, Default)]
struct ComponentStats {
    area: u32,
    sum_x: u64,
    sum_y: u64,
    sum_intensity: f64,
}

/// Label the mask, drop regions with `area <= min_area`, and order the rest by weight.
///
/// The sort is stable, so equal weights keep label-scan order. Severity is the
/// mean of the blurred field over the region, so dense neighbours raise it too.
pub fn rank(mask: &GrayImage, intensity: &IntensityField, min_area: u32) -> Result<Vec<RankedRegion>> {
    if mask.dimensions() != intensity.dimensions() {
        return Err(AnnotatorError::DimensionMismatch {
            mask: mask.dimensions(),
            field: intensity.dimensions(),
        });
    }

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut stats: Vec<ComponentStats> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if label > stats.len() {
            stats.resize(label, ComponentStats::default());
        }

        let entry = &mut stats[label - 1];
        entry.area += 1;
        entry.sum_x += u64::from(x);
        entry.sum_y += u64::from(y);
        entry.sum_intensity += f64::from(intensity.get_pixel(x, y)[0]);
    }

    let component_count = stats.len();
    let mut regions: Vec<RankedRegion> = stats
        .into_iter()
        .filter(|s| s.area > min_area)
        .map(|s| {
            let area = f64::from(s.area);
            RankedRegion {
                x: (s.sum_x as f64 / area).round() as u32,
                y: (s.sum_y as f64 / area).round() as u32,
                severity: (s.sum_intensity / area) as f32,
                area: s.area,
            }
        })
        .collect();

    // `sort_by` is stable
    regions.sort_by(|a, b| b.weight().total_cmp(&a.weight()));

    debug!(
        components = component_count,
        kept = regions.len(),
        min_area,
        "ranked regions"
    );

    Ok(regions)
}
