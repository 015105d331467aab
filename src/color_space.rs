use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::errors::{ensure_non_empty, Result};

/// Three 8-bit channels holding (hue, saturation, value).
///
/// Hue is in half-degrees (`0..=179`) so a full turn fits a byte; saturation
/// and value span `0..=255`.
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Convert an RGB image to 8-bit HSV
pub fn to_hsv(image: &RgbImage) -> Result<HsvImage> {
    let (width, height) = image.dimensions();
    ensure_non_empty(width, height)?;

    Ok(HsvImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        Rgb(rgb_to_hsv(p[0], p[1], p[2]))
    }))
}

/// Convert an RGB image to single-channel luminance
pub fn to_gray(image: &RgbImage) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    ensure_non_empty(width, height)?;

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        Luma([luminance(p[0], p[1], p[2])])
    }))
}

/// Convert one RGB pixel to (hue in half-degrees, saturation, value)
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let value = max;
    let saturation = if max == 0 {
        0
    } else {
        (255.0 * delta / f32::from(max)).round() as u8
    };

    if delta == 0.0 {
        return [0, saturation, value];
    }

    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let mut hue_degrees = if max as f32 == r {
        60.0 * (g - b) / delta
    } else if max as f32 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue_degrees < 0.0 {
        hue_degrees += 360.0;
    }

    // 360 degrees rounds to 180 half-degrees, which is the same hue as 0
    let hue = (hue_degrees / 2.0).round() as u32 % 180;

    [hue as u8, saturation, value]
}

/// Rec. 601 luma, rounded to the nearest integer
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    y.round().min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnnotatorError;

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
    }

    #[test]
    fn purple_lands_in_the_magenta_band() {
        // 300 degrees
        assert_eq!(rgb_to_hsv(128, 0, 128), [150, 255, 128]);
    }

    #[test]
    fn achromatic_pixels_have_zero_hue_and_saturation() {
        assert_eq!(rgb_to_hsv(255, 255, 255), [0, 0, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(90, 90, 90), [0, 0, 90]);
    }

    #[test]
    fn hue_just_below_red_wraps_to_zero() {
        // 359.x degrees rounds up to a full turn
        let [hue, _, _] = rgb_to_hsv(255, 0, 1);
        assert_eq!(hue, 0);
    }

    #[test]
    fn luminance_uses_rec601_weights() {
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
    }

    #[test]
    fn conversions_preserve_dimensions() {
        let image = RgbImage::from_pixel(7, 3, Rgb([10, 20, 30]));
        assert_eq!(to_hsv(&image).unwrap().dimensions(), (7, 3));
        assert_eq!(to_gray(&image).unwrap().dimensions(), (7, 3));
    }

    #[test]
    fn zero_sized_images_are_rejected() {
        let image = RgbImage::new(0, 5);
        assert!(matches!(to_hsv(&image), Err(AnnotatorError::EmptyImage { .. })));
        assert!(matches!(to_gray(&image), Err(AnnotatorError::EmptyImage { .. })));
    }
}
