// THEORY:
// The `LuminanceMap` collapses a color image into the single perceptual
// dimension the analysis layer cares about: brightness. Sharpness sampling
// never looks at color - local contrast in luminance is what distinguishes
// an in-focus subject from a blurred background - so the map is computed
// once per analysis pass and then queried heavily by the sampler's windows.
//
// The grid is a flat row-major buffer addressed by (x, y), mirroring the
// source image exactly. Every cell is independent, so the build is
// row-parallel with each worker writing its own row span.

use crate::core_modules::pixel::pixel::{Luminance, Pixel};
use image::RgbaImage;
use rayon::prelude::*;

/// A dense per-pixel brightness grid in [0, 1], same dimensions as its source.
pub struct LuminanceMap {
    /// Row-major luminance values, `width * height` cells.
    values: Vec<Luminance>,
    /// Width of the source image in pixels.
    width: usize,
    /// Height of the source image in pixels.
    height: usize,
}

impl LuminanceMap {
    /// Computes the luminance of every pixel, preserving (x, y) addressing.
    pub fn from_image(image: &RgbaImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let mut values = vec![0.0; width * height];

        values
            .par_chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = Pixel::from(*image.get_pixel(x as u32, y as u32)).luminance();
                }
            });

        Self {
            values,
            width,
            height,
        }
    }

    /// The luminance at (x, y). Callers must stay within the map's bounds.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> Luminance {
        self.values[y * self.width + x]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}
