// THEORY:
// The `Blender` is where the analysis layers pay off: it decides, pixel by
// pixel, how much of each source image survives into the output. Every
// decision reduces to a single blend ratio in [0, 1] - the weight of the
// first image's channels against the second's - and the two policies differ
// only in where that ratio comes from.
//
// Key architectural principles:
// 1.  **Luminance Policy**: A piecewise adjustment around an equal 50/50
//     blend. A very bright first pixel dominates outright; a deep shadow in
//     the second image pulls the ratio toward it; a blown highlight in the
//     second image eases the ratio back the other way. The thresholds are
//     named configuration, not literals.
// 2.  **Mask Policy**: The ratio is read off the two images' importance
//     fields: `(importance1 + (1 - importance2)) / 2`. Where image one is
//     sharp and image two is blurred the first image wins, and vice versa.
// 3.  **Wide-Domain Arithmetic**: Channels combine in the 16-bit color
//     domain and truncate back to bytes with `>> 8`. The alpha channel is
//     `(a1 + a2) >> 8` - a deliberate quirk, not true alpha compositing.
// 4.  **Embarrassing Parallelism**: No output pixel depends on any other, so
//     the combine loop hands each worker its own row span.

use crate::core_modules::pixel::pixel::{Byte, Luminance, Pixel, WideChannel};
use crate::core_modules::scalar_field::ScalarField;
use crate::core_modules::sharpness_sampler::SharpnessSampler;
use crate::error::BlendError;
use crate::pipeline::PipelineConfig;
use image::RgbaImage;
use rayon::prelude::*;

/// The starting point of the luminance policy: an equal blend.
const BASE_RATIO: f64 = 0.5;

/// Which per-pixel policy drives the blend ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Ratio from the two pixels' perceptual brightness.
    Luminance,
    /// Ratio from the two images' sharpness-derived importance fields.
    Mask,
}

/// Thresholds of the luminance blend policy.
#[derive(Debug, Clone)]
pub struct BlendConfig {
    /// First-image luminance above this makes the bright pixel dominate,
    /// using its own luminance as the ratio.
    pub bright_dominance_threshold: f64,
    /// Second-image luminance below this tapers the ratio linearly from 0.5
    /// toward 0 as the pixel darkens to black.
    pub shadow_threshold: f64,
    /// Second-image luminance above this eases the ratio from 0.5 down to
    /// `highlight_floor_ratio` as the pixel brightens to white.
    pub highlight_threshold: f64,
    /// The ratio reached when the second image is fully blown out.
    pub highlight_floor_ratio: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            bright_dominance_threshold: 0.9,
            shadow_threshold: 0.3,
            highlight_threshold: 0.8,
            highlight_floor_ratio: 0.2,
        }
    }
}

/// The luminance-policy blend ratio for a pair of pixel brightnesses.
pub fn luminance_ratio(lum1: Luminance, lum2: Luminance, config: &BlendConfig) -> f64 {
    if lum1 > config.bright_dominance_threshold {
        lum1
    } else if lum2 < config.shadow_threshold {
        // Taper from 0.5 at the threshold down to 0.0 at black.
        (BASE_RATIO / config.shadow_threshold) * lum2
    } else if lum2 > config.highlight_threshold {
        // Line through (threshold, 0.5) and (1.0, floor).
        let slope =
            (config.highlight_floor_ratio - BASE_RATIO) / (1.0 - config.highlight_threshold);
        let intercept = config.highlight_floor_ratio - slope;
        slope * lum2 + intercept
    } else {
        BASE_RATIO
    }
}

/// The mask-policy blend ratio for a pair of importance values in [0, 1].
pub fn mask_ratio(importance1: f64, importance2: f64) -> f64 {
    (importance1 + (1.0 - importance2)) / 2.0
}

/// Combines one wide-domain channel pair at the given ratio, truncating back
/// to a byte.
fn blend_channel(c1: WideChannel, c2: WideChannel, ratio: f64) -> Byte {
    let first = c1 as f64 * ratio;
    let second = c2 as f64 * (1.0 - ratio);
    (((first + second) as i64) >> 8) as Byte
}

/// The alpha quirk: the wide alphas summed and truncated to a byte. Not
/// premultiplied compositing.
fn blend_alpha(a1: WideChannel, a2: WideChannel) -> Byte {
    ((a1 + a2) >> 8) as Byte
}

fn blend_with_ratio(p1: &Pixel, p2: &Pixel, ratio: f64) -> Pixel {
    let [r1, g1, b1, a1] = p1.wide();
    let [r2, g2, b2, a2] = p2.wide();
    Pixel::new(
        blend_channel(r1, r2, ratio),
        blend_channel(g1, g2, ratio),
        blend_channel(b1, b2, ratio),
        blend_alpha(a1, a2),
    )
}

/// Blends two pixels under the luminance policy.
pub fn blend_luminance(p1: &Pixel, p2: &Pixel, config: &BlendConfig) -> Pixel {
    let ratio = luminance_ratio(p1.luminance(), p2.luminance(), config);
    blend_with_ratio(p1, p2, ratio)
}

/// Blends two pixels under the mask policy, given each image's importance at
/// this position.
pub fn blend_mask(p1: &Pixel, p2: &Pixel, importance1: f64, importance2: f64) -> Pixel {
    blend_with_ratio(p1, p2, mask_ratio(importance1, importance2))
}

/// Combines two images of identical dimensions into a new image.
///
/// Mask mode first computes one sharpness field per image; luminance mode
/// needs no analysis pass. Every output pixel is independent and the loop is
/// row-parallel.
pub fn combine(
    image1: &RgbaImage,
    image2: &RgbaImage,
    mode: BlendMode,
    config: &PipelineConfig,
) -> Result<RgbaImage, BlendError> {
    if image1.dimensions() != image2.dimensions() {
        let (width1, height1) = image1.dimensions();
        let (width2, height2) = image2.dimensions();
        return Err(BlendError::DimensionMismatch {
            width1,
            height1,
            width2,
            height2,
        });
    }

    match mode {
        BlendMode::Luminance => Ok(combine_pixels(image1, image2, |p1, p2, _, _| {
            blend_luminance(p1, p2, &config.blend)
        })),
        BlendMode::Mask => {
            let sampler = SharpnessSampler::new(
                config.downsample_divisor,
                config.radius_divisor,
                config.strategy,
            );
            let mask1 = sampler.analyze(image1)?;
            let mask2 = sampler.analyze(image2)?;
            Ok(combine_pixels(image1, image2, |p1, p2, x, y| {
                blend_mask(p1, p2, mask1.at(x, y), mask2.at(x, y))
            }))
        }
    }
}

/// Runs a per-pixel blend over both images, writing each output row from its
/// own worker.
fn combine_pixels<F>(image1: &RgbaImage, image2: &RgbaImage, blend: F) -> RgbaImage
where
    F: Fn(&Pixel, &Pixel, usize, usize) -> Pixel + Sync,
{
    let (width, height) = image1.dimensions();
    let mut output = RgbaImage::new(width, height);
    let row_stride = width as usize * 4;

    output
        .par_chunks_mut(row_stride.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                let p1 = Pixel::from(*image1.get_pixel(x as u32, y as u32));
                let p2 = Pixel::from(*image2.get_pixel(x as u32, y as u32));
                let blended = blend(&p1, &p2, x, y);
                let offset = x * 4;
                row[offset..offset + 4].copy_from_slice(&blended.bytes());
            }
        });

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use image::Rgba;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn ratio_defaults_to_an_equal_blend() {
        let config = BlendConfig::default();
        assert!((luminance_ratio(0.5, 0.5, &config) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn bright_first_pixel_dominates() {
        let config = BlendConfig::default();
        assert!((luminance_ratio(0.95, 0.5, &config) - 0.95).abs() < EPSILON);
    }

    #[test]
    fn second_image_shadows_taper_the_ratio() {
        let config = BlendConfig::default();
        // (0.5 / 0.3) * 0.15 = 0.25
        assert!((luminance_ratio(0.5, 0.15, &config) - 0.25).abs() < EPSILON);
        // Black second pixel removes the first image entirely.
        assert!(luminance_ratio(0.5, 0.0, &config).abs() < EPSILON);
    }

    #[test]
    fn second_image_highlights_ease_the_ratio_down() {
        let config = BlendConfig::default();
        // Line through (0.8, 0.5) and (1.0, 0.2): at 0.9 the ratio is 0.35.
        assert!((luminance_ratio(0.5, 0.9, &config) - 0.35).abs() < EPSILON);
        assert!((luminance_ratio(0.5, 1.0, &config) - 0.2).abs() < EPSILON);
    }

    #[test]
    fn mask_ratio_extremes_pick_one_image() {
        assert!((mask_ratio(1.0, 0.0) - 1.0).abs() < EPSILON);
        assert!(mask_ratio(0.0, 1.0).abs() < EPSILON);
        assert!((mask_ratio(0.5, 0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn blending_a_pixel_with_itself_is_identity() {
        let config = BlendConfig::default();
        let samples = [
            Pixel::new(0, 0, 0, 255),
            Pixel::new(255, 255, 255, 255),
            Pixel::new(1, 128, 254, 255),
            Pixel::new(42, 17, 99, 255),
        ];
        for pixel in &samples {
            assert_eq!(&blend_luminance(pixel, pixel, &config), pixel);
        }
    }

    #[test]
    fn full_importance_extremes_pass_pixels_through() {
        let p1 = Pixel::new(10, 20, 30, 255);
        let p2 = Pixel::new(200, 100, 50, 255);

        let all_first = blend_mask(&p1, &p2, 1.0, 0.0);
        assert_eq!(
            (all_first.red, all_first.green, all_first.blue),
            (p1.red, p1.green, p1.blue)
        );

        let all_second = blend_mask(&p1, &p2, 0.0, 1.0);
        assert_eq!(
            (all_second.red, all_second.green, all_second.blue),
            (p2.red, p2.green, p2.blue)
        );
    }

    #[test]
    fn red_and_blue_meet_in_the_middle() {
        // Solid red against solid blue: both luminances are mid-range, so the
        // ratio stays at 0.5 and each channel lands on the 50/50 mix.
        let config = PipelineConfig::default();
        let red = RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]));

        let output = combine(&red, &blue, BlendMode::Luminance, &config)
            .expect("combine should succeed");
        for pixel in output.pixels() {
            assert_eq!(pixel.0, [127, 0, 127, 255]);
        }
    }

    #[test]
    fn identical_images_survive_luminance_combine_unchanged() {
        let config = PipelineConfig::default();
        let image = RgbaImage::from_fn(60, 40, |x, y| {
            Rgba([(x * 4) as u8, (y * 6) as u8, ((x + y) % 256) as u8, 255])
        });

        let output = combine(&image, &image, BlendMode::Luminance, &config)
            .expect("combine should succeed");
        assert_eq!(output, image);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let config = PipelineConfig::default();
        let image1 = RgbaImage::new(100, 100);
        let image2 = RgbaImage::new(100, 99);
        assert_eq!(
            combine(&image1, &image2, BlendMode::Luminance, &config),
            Err(BlendError::DimensionMismatch {
                width1: 100,
                height1: 100,
                width2: 100,
                height2: 99,
            })
        );
    }

    #[test]
    fn mask_combine_of_two_uniform_images_is_an_equal_blend() {
        // Uniform images have degenerate sharpness fields (constant 0.5), so
        // the mask ratio is (0.5 + 0.5) / 2 = 0.5 everywhere.
        let config = PipelineConfig::default();
        let white = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let black = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));

        let output =
            combine(&white, &black, BlendMode::Mask, &config).expect("combine should succeed");
        for pixel in output.pixels() {
            assert_eq!(pixel.0, [127, 127, 127, 255]);
        }
    }

    #[test]
    fn mask_combine_requires_a_wide_enough_image() {
        let config = PipelineConfig::default();
        let image = RgbaImage::new(40, 40);
        assert!(matches!(
            combine(&image, &image, BlendMode::Mask, &config),
            Err(BlendError::Configuration { .. })
        ));
    }
}
