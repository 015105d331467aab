//! Separable Gaussian smoothing of a binary mask into a float severity field.
//!
//! The kernel size is explicit (not derived from sigma) so the smoothing
//! footprint is a configuration value. Borders reflect around the edge
//! pixel without repeating it (`dcb|abcd|cba`). `imageproc`'s filters clamp
//! at the edge and size the kernel from sigma, so the two passes run here.

use image::{GrayImage, ImageBuffer, Luma};
use rayon::prelude::*;

/// Single-channel float image of local candidate density, values in `[0, 1]`
pub type IntensityField = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Sigma used when the caller asks for one derived from the kernel size
pub fn sigma_for_kernel_size(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1D Gaussian of exactly `kernel_size` taps.
///
/// A non-positive sigma is replaced by [`sigma_for_kernel_size`].
pub fn gaussian_kernel_1d(kernel_size: u32, sigma: f32) -> Vec<f32> {
    let size = kernel_size.max(1) as usize;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel_size(size as u32)
    };

    let radius = (size / 2) as f32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - radius;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Smooth a 0/255 mask into a `[0, 1]` intensity field
pub fn gaussian_blur_mask(mask: &GrayImage, kernel_size: u32, sigma: f32) -> IntensityField {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return IntensityField::new(width, height);
    }

    let input: Vec<f32> = mask.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
    let kernel = gaussian_kernel_1d(kernel_size, sigma);
    let radius = (kernel.len() / 2) as isize;

    // Horizontal pass
    let mut temp = vec![0.0f32; w * h];
    temp.par_chunks_mut(w).enumerate().for_each(|(y, out_row)| {
        let in_row = &input[y * w..(y + 1) * w];
        for (x, out) in out_row.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = reflect_101(x as isize + k as isize - radius, w);
                    weight * in_row[sx]
                })
                .sum();
        }
    });

    // Vertical pass
    let mut output = vec![0.0f32; w * h];
    output.par_chunks_mut(w).enumerate().for_each(|(y, out_row)| {
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, h);
            let src_row = &temp[sy * w..(sy + 1) * w];
            for (out, src) in out_row.iter_mut().zip(src_row) {
                *out += weight * src;
            }
        }
    });

    // Kernel weights are normalised, so rounding noise is the only way out of range
    for v in &mut output {
        *v = v.clamp(0.0, 1.0);
    }

    IntensityField::from_raw(width, height, output)
        .unwrap_or_else(|| IntensityField::new(width, height))
}

/// Map an out-of-range index back inside `0..len` by mirroring around the edge pixels
#[inline]
fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn derived_sigma_matches_reference_sizes() {
        assert_approx_eq!(sigma_for_kernel_size(21), 3.5, 1e-6);
        assert_approx_eq!(sigma_for_kernel_size(3), 0.8, 1e-6);
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel_1d(21, 0.0);
        assert_eq!(kernel.len(), 21);
        assert_approx_eq!(kernel.iter().sum::<f32>(), 1.0, 1e-5);
        for i in 0..10 {
            assert_approx_eq!(kernel[i], kernel[20 - i], 1e-7);
        }
        assert!(kernel[10] > kernel[9]);
    }

    #[test]
    fn reflect_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-7, 1), 0);
        // Offsets wider than the row bounce more than once
        assert_eq!(reflect_101(-5, 3), 1);
    }

    #[test]
    fn empty_mask_gives_zero_field() {
        let mask = GrayImage::new(30, 20);
        let field = gaussian_blur_mask(&mask, 21, 0.0);
        assert_eq!(field.dimensions(), (30, 20));
        assert!(field.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn full_mask_stays_at_one() {
        let mask = GrayImage::from_pixel(15, 15, Luma([255]));
        let field = gaussian_blur_mask(&mask, 21, 0.0);
        for p in field.pixels() {
            assert_approx_eq!(p[0], 1.0, 1e-5);
        }
    }

    #[test]
    fn isolated_pixel_spreads_and_peaks_at_center() {
        let mut mask = GrayImage::new(41, 41);
        mask.put_pixel(20, 20, Luma([255]));
        let field = gaussian_blur_mask(&mask, 21, 0.0);

        let center = field.get_pixel(20, 20)[0];
        assert!(center > 0.0 && center < 1.0);
        assert!(field.get_pixel(25, 20)[0] > 0.0);
        assert!(field.get_pixel(25, 20)[0] < center);
        // Beyond the kernel radius nothing reaches
        assert_eq!(field.get_pixel(31, 20)[0], 0.0);

        let total: f32 = field.pixels().map(|p| p[0]).sum();
        assert_approx_eq!(total, 1.0, 1e-4);
    }
}
