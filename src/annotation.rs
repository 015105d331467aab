//! Circle-and-arrow markers composited onto a copy of the source image.
//!
//! Geometry (arrow tail placement, arrowhead corners) is plain arithmetic
//! on pixel coordinates; rasterisation goes through `tiny-skia` so shafts,
//! rings and heads are anti-aliased at any stroke width.

use image::{Rgb, RgbImage};
use tiny_skia::{FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::debug;

use crate::config::AnnotationConfig;
use crate::errors::{ensure_non_empty, AnnotatorError, Result};
use crate::ranking::RankedRegion;

/// Arrowhead proportions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowHead {
    /// Upper bound on head length
    pub max_length: f32,
    /// Head length as a fraction of the whole arrow, before capping
    pub length_ratio: f32,
    /// Distance from the shaft axis to each back corner
    pub half_width: f32,
}

impl ArrowHead {
    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self {
            max_length: config.head_max_length,
            length_ratio: config.head_length_ratio,
            half_width: config.head_half_width,
        }
    }

    /// Head length for an arrow of the given total length
    #[inline]
    pub fn length_for(&self, arrow_length: f32) -> f32 {
        self.max_length.min(self.length_ratio * arrow_length)
    }
}

impl Default for ArrowHead {
    fn default() -> Self {
        Self::from_config(&AnnotationConfig::default())
    }
}

/// Where one marker goes: the ring center and the arrow tail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub center: (i32, i32),
    pub start: (i32, i32),
}

/// Pick the arrow tail for a region centroid.
///
/// Regions in the left third are approached from the left, the right third
/// from the right; otherwise from above when in the top third, else from
/// below. The tail is then clamped to `[margin, dimension - margin]`.
pub fn arrow_start(center: (i32, i32), dimensions: (u32, u32), config: &AnnotationConfig) -> (i32, i32) {
    let (x, y) = center;
    let (w, h) = (dimensions.0 as i32, dimensions.1 as i32);
    let d = config.arrow_distance;

    let (start_x, start_y) = if x < w / 3 {
        (x - d, y)
    } else if x > 2 * w / 3 {
        (x + d, y)
    } else if y < h / 3 {
        (x, y - d)
    } else {
        (x, y + d)
    };

    let m = config.arrow_margin;
    (start_x.min(w - m).max(m), start_y.min(h - m).max(m))
}

/// Markers for the first `max_arrows` regions, never more than there are regions
pub fn plan_markers(
    regions: &[RankedRegion],
    max_arrows: usize,
    dimensions: (u32, u32),
    config: &AnnotationConfig,
) -> Vec<Marker> {
    regions
        .iter()
        .take(max_arrows)
        .map(|region| {
            let center = (region.x as i32, region.y as i32);
            Marker {
                center,
                start: arrow_start(center, dimensions, config),
            }
        })
        .collect()
}

/// Triangle (tip, left corner, right corner) of an arrow pointing from `start` to `end`
pub fn arrow_head_corners(start: (f32, f32), end: (f32, f32), head: &ArrowHead) -> [(f32, f32); 3] {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let angle = dy.atan2(dx);
    let (sin, cos) = angle.sin_cos();

    let length = head.length_for(dx.hypot(dy));
    let back_x = end.0 - length * cos;
    let back_y = end.1 - length * sin;

    let left = (back_x - head.half_width * sin, back_y + head.half_width * cos);
    let right = (back_x + head.half_width * sin, back_y - head.half_width * cos);

    [end, left, right]
}

/// Draw one arrow onto a copy of `image` and return the copy
pub fn draw_arrow(
    image: &RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgb<u8>,
    thickness: f32,
    head: &ArrowHead,
) -> Result<RgbImage> {
    let mut canvas = Canvas::from_rgb(image)?;
    canvas.draw_arrow(start, end, color, thickness, head)?;
    Ok(canvas.into_rgb())
}

/// Composite ring and arrow markers for the top regions onto a copy of `image`.
///
/// With no regions to mark the copy is returned untouched.
pub fn annotate(
    image: &RgbImage,
    regions: &[RankedRegion],
    max_arrows: usize,
    config: &AnnotationConfig,
) -> Result<RgbImage> {
    config.validate()?;
    let markers = plan_markers(regions, max_arrows, image.dimensions(), config);
    if markers.is_empty() {
        return Ok(image.clone());
    }

    let head = ArrowHead::from_config(config);
    let outline = Rgb(config.outline_color_rgb);
    let ring = Rgb(config.ring_color_rgb);
    let arrow = Rgb(config.arrow_color_rgb);

    let mut canvas = Canvas::from_rgb(image)?;
    for marker in &markers {
        let center = (marker.center.0 as f32, marker.center.1 as f32);
        let start = (marker.start.0 as f32, marker.start.1 as f32);

        // White halo first so the red ring reads on any background
        canvas.stroke_ring(center, config.circle_radius + 1.0, outline, config.circle_thickness + 2.0)?;
        canvas.stroke_ring(center, config.circle_radius, ring, config.circle_thickness)?;

        canvas.draw_arrow(start, center, outline, config.arrow_outline_thickness, &head)?;
        canvas.draw_arrow(start, center, arrow, config.arrow_thickness, &head)?;
    }

    debug!(markers = markers.len(), "annotated image");

    Ok(canvas.into_rgb())
}

/// Opaque RGB drawing surface backed by a `tiny-skia` pixmap
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn from_rgb(image: &RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        ensure_non_empty(width, height)?;

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| AnnotatorError::Render(format!("cannot allocate {}x{} canvas", width, height)))?;

        // Fully opaque, so premultiplied and straight alpha coincide
        for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(image.pixels()) {
            dst[0] = src[0];
            dst[1] = src[1];
            dst[2] = src[2];
            dst[3] = 255;
        }

        Ok(Self { pixmap })
    }

    pub fn into_rgb(self) -> RgbImage {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let data = self.pixmap.data();
        RgbImage::from_fn(width, height, |x, y| {
            let off = ((y * width + x) * 4) as usize;
            Rgb([data[off], data[off + 1], data[off + 2]])
        })
    }

    /// Stroke a circle outline centred on `center`
    pub fn stroke_ring(&mut self, center: (f32, f32), radius: f32, color: Rgb<u8>, thickness: f32) -> Result<()> {
        check_finite(center, center)?;

        let Some(path) = PathBuilder::from_circle(center.0, center.1, radius) else {
            return Ok(());
        };
        let stroke = Stroke {
            width: thickness,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
        Ok(())
    }

    /// Shaft plus solid triangular head; the tip lands exactly on `end`
    pub fn draw_arrow(
        &mut self,
        start: (f32, f32),
        end: (f32, f32),
        color: Rgb<u8>,
        thickness: f32,
        head: &ArrowHead,
    ) -> Result<()> {
        check_finite(start, end)?;
        let paint = paint_for(color);

        let mut shaft = PathBuilder::new();
        shaft.move_to(start.0, start.1);
        shaft.line_to(end.0, end.1);
        if let Some(path) = shaft.finish() {
            let stroke = Stroke {
                width: thickness,
                line_cap: LineCap::Round,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        let [tip, left, right] = arrow_head_corners(start, end, head);
        let mut triangle = PathBuilder::new();
        triangle.move_to(tip.0, tip.1);
        triangle.line_to(left.0, left.1);
        triangle.line_to(right.0, right.1);
        triangle.close();
        // A zero-length arrow collapses the head to a line, which has nothing to fill
        if let Some(path) = triangle.finish() {
            self.pixmap
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        Ok(())
    }
}

fn paint_for(color: Rgb<u8>) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], 255);
    paint.anti_alias = true;
    paint
}

fn check_finite(start: (f32, f32), end: (f32, f32)) -> Result<()> {
    let all_finite = [start.0, start.1, end.0, end.1].iter().all(|v| v.is_finite());
    if !all_finite {
        return Err(AnnotatorError::NonFiniteGeometry { start, end });
    }
    Ok(())
}
