// Config structs for the annotator: detection bands, ranking limits and marker geometry

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AnnotatorError, Result};

/// Largest structuring element `imageproc` can express (radius must fit in a `u8`)
const MAX_MORPH_KERNEL_SIZE: u32 = 2 * u8::MAX as u32 + 1;

/// Configuration for the pathology annotator
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Write a per-image CSV of ranked regions next to the annotated output
    #[serde(default = "default_write_region_csv")]
    pub write_region_csv: bool,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// Inclusive per-channel bounds in 8-bit HSV space.
///
/// Hue is stored in half-degrees (`0..=179`), saturation and value in `0..=255`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Check whether an HSV triple falls inside the band on all three channels
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3usize).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Parameters for building the inflammation mask and intensity field
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// First purple/magenta band (dense cellular tissue)
    pub primary_range: HsvRange,
    /// Second band, darker and more saturated; kept separate from the first
    pub secondary_range: HsvRange,
    /// Pixels with luminance at or below this value count as dense
    pub dark_threshold: u8,
    /// Side of the square structuring element for closing and opening
    pub morph_kernel_size: u32,
    /// Side of the square Gaussian kernel for the intensity field
    pub blur_kernel_size: u32,
    /// Gaussian sigma; 0.0 derives it from `blur_kernel_size`
    pub blur_sigma: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            primary_range: HsvRange::new([120, 30, 30], [160, 255, 255]),
            secondary_range: HsvRange::new([140, 50, 50], [180, 255, 200]),
            dark_threshold: 180,
            morph_kernel_size: 5,
            blur_kernel_size: 21,
            blur_sigma: 0.0,
        }
    }
}

/// Parameters for region filtering and how many regions get a marker
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    /// Regions must be strictly larger than this many pixels
    pub min_region_area: u32,
    pub max_arrows: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_region_area: 500,
            max_arrows: 5,
        }
    }
}

/// Marker geometry and colors
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Distance from the arrow tail to the region centroid before clamping
    pub arrow_distance: i32,
    /// Arrow tails stay this many pixels inside every image edge
    pub arrow_margin: i32,
    pub circle_radius: f32,
    pub circle_thickness: f32,
    pub arrow_thickness: f32,
    pub arrow_outline_thickness: f32,
    pub head_max_length: f32,
    pub head_length_ratio: f32,
    pub head_half_width: f32,
    pub ring_color_rgb: [u8; 3],
    pub outline_color_rgb: [u8; 3],
    pub arrow_color_rgb: [u8; 3],
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            arrow_distance: 60,
            arrow_margin: 20,
            circle_radius: 25.0,
            circle_thickness: 3.0,
            arrow_thickness: 2.0,
            arrow_outline_thickness: 4.0,
            head_max_length: 20.0,
            head_length_ratio: 0.3,
            head_half_width: 6.0,
            ring_color_rgb: [255, 0, 0],
            outline_color_rgb: [255, 255, 255],
            arrow_color_rgb: [0, 0, 0],
        }
    }
}

fn default_input_path() -> String {
    "./input_images".to_string()
}

fn default_output_base_dir() -> String {
    "./output_images".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_write_region_csv() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            write_region_csv: default_write_region_csv(),
            segmentation: SegmentationConfig::default(),
            ranking: RankingConfig::default(),
            annotation: AnnotationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| AnnotatorError::ConfigRead {
            source,
            path: path.to_path_buf(),
        })?;

        toml::from_str(&content).map_err(|source| AnnotatorError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate every processing parameter.
    ///
    /// Runs before the first image so a bad value cannot silently corrupt a whole batch.
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.annotation.validate()?;
        Ok(())
    }

    /// Check the input path exists and create the output directory
    pub fn prepare_paths(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(AnnotatorError::InvalidPath(input_path));
        }

        fs::create_dir_all(&self.output_base_dir)?;
        Ok(())
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_range("primary_range", &self.primary_range)?;
        validate_range("secondary_range", &self.secondary_range)?;

        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "morph_kernel_size must be a positive odd number, got {}",
                self.morph_kernel_size
            )));
        }
        if self.morph_kernel_size > MAX_MORPH_KERNEL_SIZE {
            return Err(invalid(format!(
                "morph_kernel_size must be <= {}, got {}",
                MAX_MORPH_KERNEL_SIZE, self.morph_kernel_size
            )));
        }

        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "blur_kernel_size must be a positive odd number, got {}",
                self.blur_kernel_size
            )));
        }

        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(invalid(format!(
                "blur_sigma must be >= 0.0, got {}",
                self.blur_sigma
            )));
        }

        Ok(())
    }
}

impl AnnotationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.arrow_distance < 0 {
            return Err(invalid("arrow_distance must be >= 0".to_string()));
        }
        if self.arrow_margin < 0 {
            return Err(invalid("arrow_margin must be >= 0".to_string()));
        }

        let positive = [
            ("circle_radius", self.circle_radius),
            ("circle_thickness", self.circle_thickness),
            ("arrow_thickness", self.arrow_thickness),
            ("arrow_outline_thickness", self.arrow_outline_thickness),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{} must be > 0.0, got {}", name, value)));
            }
        }

        let non_negative = [
            ("head_max_length", self.head_max_length),
            ("head_half_width", self.head_half_width),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be >= 0.0, got {}", name, value)));
            }
        }

        if !(0.0..=1.0).contains(&self.head_length_ratio) {
            return Err(invalid(format!(
                "head_length_ratio must be between 0.0 and 1.0, got {}",
                self.head_length_ratio
            )));
        }

        Ok(())
    }
}

fn validate_range(name: &str, range: &HsvRange) -> Result<()> {
    if range.upper[0] > 180 {
        return Err(invalid(format!(
            "{} hue upper bound must be <= 180 (half-degrees), got {}",
            name, range.upper[0]
        )));
    }
    if (0..3usize).any(|c| range.lower[c] > range.upper[c]) {
        return Err(invalid(format!(
            "{} lower bound {:?} exceeds upper bound {:?}",
            name, range.lower, range.upper
        )));
    }
    Ok(())
}

fn invalid(message: String) -> AnnotatorError {
    AnnotatorError::InvalidConfiguration(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn even_morph_kernel_is_rejected() {
        let mut config = Config::default();
        config.segmentation.morph_kernel_size = 4;
        assert!(matches!(
            config.validate(),
            Err(AnnotatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_sized_kernels_are_rejected() {
        let mut config = Config::default();
        config.segmentation.morph_kernel_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.segmentation.blur_kernel_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = Config::default();
        config.segmentation.secondary_range = HsvRange::new([160, 50, 50], [140, 255, 200]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_geometry_is_rejected() {
        let mut config = Config::default();
        config.annotation.arrow_distance = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.annotation.circle_radius = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn range_contains_is_inclusive() {
        let range = HsvRange::new([120, 30, 30], [160, 255, 255]);
        assert!(range.contains([120, 30, 30]));
        assert!(range.contains([160, 255, 255]));
        assert!(!range.contains([119, 200, 200]));
        assert!(!range.contains([130, 29, 200]));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let text = r#"
            input_path = "slides"

            [ranking]
            min_region_area = 250
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.input_path, "slides");
        assert_eq!(config.ranking.min_region_area, 250);
        assert_eq!(config.ranking.max_arrows, 5);
        assert_eq!(config.segmentation, SegmentationConfig::default());
        assert_eq!(config.output_base_dir, "./output_images");
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ranking = 3").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(AnnotatorError::ConfigLoad { .. })
        ));
    }
}
