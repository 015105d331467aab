use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use tracing::debug;

use crate::blur::{gaussian_blur_mask, IntensityField};
use crate::color_space::{to_gray, to_hsv};
use crate::config::SegmentationConfig;
use crate::errors::Result;

/// Foreground value of every binary mask produced here
pub const MASK_ON: u8 = 255;

/// Binary candidate mask and the smoothed severity landscape derived from it
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: GrayImage,
    pub intensity: IntensityField,
}

/// Build the inflammation mask and intensity field for one image.
///
/// A pixel is a candidate only when its color falls in one of the two purple
/// bands AND it is dark enough to suggest dense cellularity. The combined mask
/// is closed then opened, so gaps inside a real region are bridged before
/// isolated speckle is removed.
///
/// Fails with `InvalidConfiguration` before touching any pixel when a
/// parameter is out of range.
pub fn segment(image: &RgbImage, config: &SegmentationConfig) -> Result<Segmentation> {
    config.validate()?;
    let hsv = to_hsv(image)?;
    let gray = to_gray(image)?;
    let (width, height) = image.dimensions();

    let combined = GrayImage::from_fn(width, height, |x, y| {
        let hsv_pixel = hsv.get_pixel(x, y).0;
        let is_purple = config.primary_range.contains(hsv_pixel)
            || config.secondary_range.contains(hsv_pixel);
        let is_dark = gray.get_pixel(x, y)[0] <= config.dark_threshold;

        Luma([if is_purple && is_dark { MASK_ON } else { 0 }])
    });

    let mask = clean_mask(&combined, config.morph_kernel_size);
    let intensity = gaussian_blur_mask(&mask, config.blur_kernel_size, config.blur_sigma);

    debug!(
        width,
        height,
        raw_pixels = count_foreground(&combined),
        cleaned_pixels = count_foreground(&mask),
        "segmented image"
    );

    Ok(Segmentation { mask, intensity })
}

/// Morphological closing followed by opening with a square structuring element
pub fn clean_mask(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    // A square of side 2k+1 is the chessboard ball of radius k
    let radius = (kernel_size / 2).min(u32::from(u8::MAX)) as u8;
    if radius == 0 {
        return mask.clone();
    }

    let closed = close(mask, Norm::LInf, radius);
    open(&closed, Norm::LInf, radius)
}

/// Number of foreground pixels in a binary mask
pub fn count_foreground(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] == MASK_ON).count()
}
