// THEORY:
// The `SharpnessSampler` turns an image into an importance field. The
// heuristic: a region that is in focus has texture, and texture shows up as
// local variance in luminance; a blurred background is flat and its variance
// collapses toward zero. Sampling that statistic at every pixel would cost a
// full window scan per pixel, so the sampler only visits a sparse grid of
// anchor points and lets the `InterpolatedField` reconstruct everything in
// between.
//
// Key architectural principles:
// 1.  **Derived Geometry**: The anchor spacing (`width / 50`) and window
//     half-width (`width / 30`) scale with the image so the mask has the
//     same character regardless of resolution. A zero spacing means the
//     image is too narrow to sample - that is a configuration error surfaced
//     immediately, never a NaN discovered downstream.
// 2.  **Population Variance**: Each anchor summarizes the luminance window
//     around it with the population variance (mean of squared deviations),
//     windows clipped to the image bounds.
// 3.  **Independent Anchors**: No anchor depends on any other, so the grid
//     is filled in parallel and normalized once at the end.

use crate::core_modules::luminance_map::LuminanceMap;
use crate::core_modules::scalar_field::{InterpolatedField, InterpolationStrategy};
use crate::error::BlendError;
use image::RgbaImage;
use log::debug;
use rayon::prelude::*;

/// Computes sparse sharpness statistics over an image and hands back a
/// normalized, queryable importance field.
pub struct SharpnessSampler {
    /// Image width is divided by this to derive the anchor spacing.
    downsample_divisor: usize,
    /// Image width is divided by this to derive the window half-width.
    radius_divisor: usize,
    /// Strategy given to the fields this sampler produces.
    strategy: InterpolationStrategy,
}

impl SharpnessSampler {
    pub fn new(
        downsample_divisor: usize,
        radius_divisor: usize,
        strategy: InterpolationStrategy,
    ) -> Self {
        Self {
            downsample_divisor,
            radius_divisor,
            strategy,
        }
    }

    /// Builds the normalized sharpness field for one image.
    ///
    /// Fails fast with `BlendError::Configuration` when the derived anchor
    /// spacing is zero (image narrower than the downsample divisor).
    pub fn analyze(&self, image: &RgbaImage) -> Result<InterpolatedField, BlendError> {
        let width = image.width() as usize;
        let height = image.height() as usize;

        let rate = width / self.downsample_divisor;
        let radius = width / self.radius_divisor;
        if rate == 0 {
            return Err(BlendError::Configuration {
                width,
                divisor: self.downsample_divisor,
            });
        }

        let luminance = LuminanceMap::from_image(image);

        let anchors_x = width / rate;
        let anchors_y = height / rate;
        debug!(
            "sampling sharpness: {}x{} anchors, rate {}, radius {}",
            anchors_x, anchors_y, rate, radius
        );

        let variances: Vec<f64> = (0..anchors_y * anchors_x)
            .into_par_iter()
            .map(|index| {
                let cy = index / anchors_x;
                let cx = index % anchors_x;
                window_variance(&luminance, cx * rate, cy * rate, radius)
            })
            .collect();

        let mut field = InterpolatedField::new(width, height, rate, self.strategy);
        for (index, &variance) in variances.iter().enumerate() {
            field.set(index % anchors_x, index / anchors_x, variance);
        }

        field.normalize();
        Ok(field)
    }
}

/// Population variance of the luminance window of half-width `radius`
/// centered at (center_x, center_y), clipped to the map bounds. An empty
/// window contributes no texture and yields 0.0.
fn window_variance(
    luminance: &LuminanceMap,
    center_x: usize,
    center_y: usize,
    radius: usize,
) -> f64 {
    let start_x = center_x.saturating_sub(radius);
    let start_y = center_y.saturating_sub(radius);
    let end_x = (center_x + radius).min(luminance.width());
    let end_y = (center_y + radius).min(luminance.height());

    let count = ((end_x - start_x) * (end_y - start_y)) as f64;
    if count == 0.0 {
        return 0.0;
    }

    let mut sum = 0.0;
    for y in start_y..end_y {
        for x in start_x..end_x {
            sum += luminance.at(x, y);
        }
    }
    let mean = sum / count;

    let mut squared_deviations = 0.0;
    for y in start_y..end_y {
        for x in start_x..end_x {
            squared_deviations += (luminance.at(x, y) - mean).powi(2);
        }
    }
    squared_deviations / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::scalar_field::ScalarField;
    use image::Rgba;

    fn checkerboard_left_flat_right(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if x < width / 2 {
                // High-contrast texture.
                if (x + y) % 2 == 0 {
                    Rgba([255, 255, 255, 255])
                } else {
                    Rgba([0, 0, 0, 255])
                }
            } else {
                // Featureless gray.
                Rgba([128, 128, 128, 255])
            }
        })
    }

    #[test]
    fn too_narrow_image_is_a_configuration_error() {
        let sampler = SharpnessSampler::new(50, 30, InterpolationStrategy::Bilinear);
        let image = RgbaImage::new(49, 49);
        let error = sampler.analyze(&image).unwrap_err();
        assert_eq!(
            error,
            BlendError::Configuration {
                width: 49,
                divisor: 50
            }
        );
    }

    #[test]
    fn textured_regions_dominate_flat_regions() {
        let sampler = SharpnessSampler::new(50, 30, InterpolationStrategy::Bilinear);
        let image = checkerboard_left_flat_right(100, 100);
        let field = sampler.analyze(&image).expect("analysis should succeed");

        let textured = field.at(20, 50);
        let flat = field.at(80, 50);
        assert!(
            textured > 0.8,
            "textured region importance {} unexpectedly low",
            textured
        );
        assert!(flat < 0.05, "flat region importance {} unexpectedly high", flat);
    }

    #[test]
    fn uniform_image_yields_the_constant_half_field() {
        let sampler = SharpnessSampler::new(50, 30, InterpolationStrategy::Bilinear);
        let image = RgbaImage::from_pixel(100, 100, Rgba([90, 90, 90, 255]));
        let field = sampler.analyze(&image).expect("analysis should succeed");

        for &(x, y) in &[(0, 0), (50, 50), (99, 99), (13, 77)] {
            assert_eq!(field.at(x, y), 0.5);
        }
    }

    #[test]
    fn window_variance_of_flat_region_is_zero() {
        let image = RgbaImage::from_pixel(20, 20, Rgba([77, 77, 77, 255]));
        let luminance = LuminanceMap::from_image(&image);
        assert_eq!(window_variance(&luminance, 10, 10, 3), 0.0);
    }

    #[test]
    fn window_variance_clips_to_the_image_bounds() {
        let image = checkerboard_left_flat_right(20, 20);
        let luminance = LuminanceMap::from_image(&image);
        // Centered at the corner: the window would extend off-image on two
        // sides and must clip instead of panicking.
        let variance = window_variance(&luminance, 0, 0, 5);
        assert!(variance > 0.0);
    }

    #[test]
    fn checkerboard_variance_matches_the_closed_form() {
        // A full-frame checkerboard of black and white has luminance values
        // 0 and 1 in equal measure: mean 0.5, population variance 0.25.
        let image = RgbaImage::from_fn(20, 20, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let luminance = LuminanceMap::from_image(&image);
        let variance = window_variance(&luminance, 10, 10, 5);
        assert!((variance - 0.25).abs() < 1e-12);
    }
}
