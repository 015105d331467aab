use std::fs;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::errors::Result;
use crate::ranking::RankedRegion;

/// Outcome of one successfully processed image, for the batch summary
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub filename: String,
    pub region_count: usize,
    pub output_path: PathBuf,
}

/// Write the ranked regions of one image to `<output_dir>/regions/<filename>.csv`
pub fn write_region_csv<P: AsRef<Path>>(
    regions: &[RankedRegion],
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("regions").join(format!("{}.csv", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;
    writer.write_record(["Rank", "X", "Y", "Severity", "Area", "Weight"])?;

    for (rank, region) in regions.iter().enumerate() {
        writer.write_record(&[
            (rank + 1).to_string(),
            region.x.to_string(),
            region.y.to_string(),
            format!("{:.6}", region.severity),
            region.area.to_string(),
            format!("{:.3}", region.weight()),
        ])?;
    }

    writer.flush()?;
    Ok(output_path)
}

/// Write one row per processed image to `<output_dir>/summary.csv`
pub fn write_summary_csv<P: AsRef<Path>>(reports: &[ImageReport], output_dir: P) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("summary.csv");
    fs::create_dir_all(output_dir.as_ref())?;

    let mut writer = Writer::from_path(&output_path)?;
    writer.write_record(["Image", "Regions", "Output"])?;

    for report in reports {
        writer.write_record(&[
            report.filename.clone(),
            report.region_count.to_string(),
            report.output_path.display().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(output_path)
}
