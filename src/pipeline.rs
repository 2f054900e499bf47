// THEORY:
// The `pipeline` module is the top-level API for the blending engine. It
// encapsulates the analysis and combination stages behind a single,
// easy-to-use interface: callers hand it decoded images and a mode, and get
// back a finished image. All the internal machinery (luminance maps,
// sharpness sampling, field interpolation) stays encapsulated in
// `core_modules`.

use crate::core_modules::blender;
use crate::core_modules::sharpness_sampler::SharpnessSampler;
use image::{GrayImage, RgbaImage};
use log::info;

// Re-export key data structures for the public API.
pub use crate::core_modules::blender::{BlendConfig, BlendMode};
pub use crate::core_modules::scalar_field::{InterpolatedField, InterpolationStrategy, ScalarField};
pub use crate::error::BlendError;

/// Configuration for the BlendPipeline, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Image width is divided by this to derive the sharpness anchor spacing.
    pub downsample_divisor: usize,
    /// Image width is divided by this to derive the variance window
    /// half-width.
    pub radius_divisor: usize,
    /// Strategy used to reconstruct dense fields from the sparse grids.
    pub strategy: InterpolationStrategy,
    /// Thresholds of the luminance blend policy.
    pub blend: BlendConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            downsample_divisor: 50,
            radius_divisor: 30,
            strategy: InterpolationStrategy::default(),
            blend: BlendConfig::default(),
        }
    }
}

/// The main, top-level struct for the blending engine.
pub struct BlendPipeline {
    config: PipelineConfig,
}

impl BlendPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Combines two images of identical dimensions under the given mode.
    pub fn combine(
        &self,
        image1: &RgbaImage,
        image2: &RgbaImage,
        mode: BlendMode,
    ) -> Result<RgbaImage, BlendError> {
        let output = blender::combine(image1, image2, mode, &self.config)?;
        info!("completed combining ({:?} mode)", mode);
        Ok(output)
    }

    /// Runs sharpness analysis on a single image and renders the resulting
    /// importance field as a grayscale diagnostic image.
    pub fn sharpness_mask(&self, image: &RgbaImage) -> Result<GrayImage, BlendError> {
        let sampler = SharpnessSampler::new(
            self.config.downsample_divisor,
            self.config.radius_divisor,
            self.config.strategy,
        );
        let field = sampler.analyze(image)?;
        info!("completed sharpness mask");
        Ok(field.to_grayscale_image())
    }
}
