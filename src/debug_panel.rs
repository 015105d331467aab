use image::imageops::replace;
use image::{GrayImage, Rgb, RgbImage};

use crate::blur::IntensityField;
use crate::pipeline::ImageAnalysis;

/// Side-by-side comparison of every stage for one image.
///
/// Layout is 2x2: original | mask on top, heat-mapped intensity | annotated below.
pub fn render_debug_panel(original: &RgbImage, analysis: &ImageAnalysis) -> RgbImage {
    let (width, height) = original.dimensions();
    let mut panel = RgbImage::new(width * 2, height * 2);

    replace(&mut panel, original, 0, 0);
    replace(&mut panel, &mask_to_rgb(&analysis.mask), i64::from(width), 0);
    replace(&mut panel, &intensity_to_heatmap(&analysis.intensity), 0, i64::from(height));
    replace(&mut panel, &analysis.annotated, i64::from(width), i64::from(height));

    panel
}

fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

/// Map the field through a black-red-yellow-white ramp scaled to its maximum
pub fn intensity_to_heatmap(field: &IntensityField) -> RgbImage {
    let max = field.pixels().map(|p| p[0]).fold(0.0f32, f32::max);

    RgbImage::from_fn(field.width(), field.height(), |x, y| {
        let t = if max > 0.0 { field.get_pixel(x, y)[0] / max } else { 0.0 };
        hot_color(t)
    })
}

// Knots of the classic "hot" colormap: red saturates first, then green, then blue
const HOT_RED_FLOOR: f32 = 0.0416;
const HOT_RED_KNOT: f32 = 0.365_079;
const HOT_GREEN_KNOT: f32 = 0.746_032;

/// Color of the "hot" ramp at `t` in `[0, 1]`
pub fn hot_color(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let red = HOT_RED_FLOOR + (1.0 - HOT_RED_FLOOR) * (t / HOT_RED_KNOT);
    let green = (t - HOT_RED_KNOT) / (HOT_GREEN_KNOT - HOT_RED_KNOT);
    let blue = (t - HOT_GREEN_KNOT) / (1.0 - HOT_GREEN_KNOT);

    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([channel(red), channel(green), channel(blue)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn hot_ramp_endpoints() {
        assert_eq!(hot_color(0.0), Rgb([11, 0, 0]));
        assert_eq!(hot_color(1.0), Rgb([255, 255, 255]));
    }

    #[test]
    fn hot_ramp_switches_channels_at_its_knots() {
        assert_eq!(hot_color(HOT_RED_KNOT), Rgb([255, 0, 0]));
        assert_eq!(hot_color(HOT_GREEN_KNOT), Rgb([255, 255, 0]));

        // Still orange at the midpoint
        let mid = hot_color(0.5);
        assert_eq!(mid[0], 255);
        assert!((85..=95).contains(&mid[1]), "green {}", mid[1]);
        assert_eq!(mid[2], 0);

        let mut previous = hot_color(0.0);
        for i in 1..=100 {
            let current = hot_color(i as f32 / 100.0);
            assert!((0..3).all(|c| current[c] >= previous[c]));
            previous = current;
        }
    }

    #[test]
    fn panel_places_each_stage_in_its_quadrant() {
        let original = RgbImage::from_pixel(10, 8, Rgb([10, 20, 30]));
        let analysis = ImageAnalysis {
            mask: GrayImage::from_pixel(10, 8, Luma([255])),
            intensity: IntensityField::from_pixel(10, 8, Luma([0.0])),
            regions: Vec::new(),
            annotated: RgbImage::from_pixel(10, 8, Rgb([1, 2, 3])),
        };

        let panel = render_debug_panel(&original, &analysis);
        assert_eq!(panel.dimensions(), (20, 16));
        assert_eq!(*panel.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*panel.get_pixel(15, 3), Rgb([255, 255, 255]));
        assert_eq!(*panel.get_pixel(4, 12), hot_color(0.0));
        assert_eq!(*panel.get_pixel(19, 15), Rgb([1, 2, 3]));
    }
}
