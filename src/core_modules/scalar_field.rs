// THEORY:
// The `scalar_field` module is the bridge between the sparse world the
// sampler works in and the dense world the blender needs. Sampling local
// statistics at every pixel would be ruinously expensive, so the sampler
// only visits a coarse grid of anchor points; this module reconstructs a
// continuous full-resolution field from those anchors.
//
// Key architectural principles:
// 1.  **Sparse Storage, Dense Queries**: An `InterpolatedField` owns a small
//     row-major grid (one cell per anchor) plus the downsample rate that maps
//     grid cells back to source-image coordinates. `at(x, y)` is valid for
//     every pixel of the original resolution.
// 2.  **Strategy Selection at Construction**: Interpolation is an
//     `InterpolationStrategy` chosen when the field is built. Bilinear is the
//     default; inverse-distance weighting is the lower-fidelity alternate
//     (O(N) per query over all anchors). Callers only ever see the
//     `ScalarField` lookup capability, so swapping strategies never touches
//     them.
// 3.  **Normalization Before Use**: Blend ratios expect importance in [0, 1],
//     so the grid is min-max rescaled once after population. A perfectly
//     uniform grid has no range to rescale; it becomes the constant 0.5
//     ("no preference either way") instead of dividing by zero.

use crate::core_modules::pixel::pixel::Byte;
use image::GrayImage;
use log::warn;
use rayon::prelude::*;

/// Importance assigned everywhere when the sparse grid is perfectly uniform.
const DEGENERATE_FIELD_VALUE: f64 = 0.5;
/// Exponent on distance in the inverse-distance weighting falloff.
const IDW_POWER: f64 = 1.0;
/// Number of nearest anchors contributing to an inverse-distance estimate.
const IDW_NEIGHBORS: usize = 2;

/// How a field reconstructs values between its anchor points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationStrategy {
    /// Four surrounding anchors, interpolated along x then y. The default.
    #[default]
    Bilinear,
    /// The two nearest anchors weighted by inverse distance. Lower fidelity,
    /// O(grid size) per query; kept as the alternate strategy.
    InverseDistance,
}

/// A continuous scalar lookup over the original image resolution.
pub trait ScalarField {
    /// The field value at pixel (x, y) of the original image.
    fn at(&self, x: usize, y: usize) -> f64;
}

/// A sparse anchor grid plus everything needed to query it densely.
#[derive(Debug)]
pub struct InterpolatedField {
    /// Row-major anchor values, `grid_width * grid_height` cells.
    data: Vec<f64>,
    /// Anchor columns: `original_width / rate + 1`.
    grid_width: usize,
    /// Anchor rows: `original_height / rate + 1`.
    grid_height: usize,
    /// Spacing between adjacent anchors, in source pixels.
    rate: usize,
    /// Width of the source image this field describes.
    original_width: usize,
    /// Height of the source image this field describes.
    original_height: usize,
    /// Reconstruction strategy, fixed at construction.
    strategy: InterpolationStrategy,
}

impl InterpolatedField {
    /// Creates a zero-filled field for an image of the given dimensions.
    /// `rate` is the anchor spacing and must be at least 1; the sampler
    /// validates it before construction.
    pub fn new(
        original_width: usize,
        original_height: usize,
        rate: usize,
        strategy: InterpolationStrategy,
    ) -> Self {
        assert!(rate >= 1, "downsample rate must be at least 1");
        let grid_width = original_width / rate + 1;
        let grid_height = original_height / rate + 1;
        Self {
            data: vec![0.0; grid_width * grid_height],
            grid_width,
            grid_height,
            rate,
            original_width,
            original_height,
            strategy,
        }
    }

    /// Stores an anchor value at grid cell (cx, cy).
    #[inline]
    pub fn set(&mut self, cx: usize, cy: usize, value: f64) {
        self.data[cy * self.grid_width + cx] = value;
    }

    /// The anchor value at grid cell (cx, cy).
    #[inline]
    pub fn get(&self, cx: usize, cy: usize) -> f64 {
        self.data[cy * self.grid_width + cx]
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn original_width(&self) -> usize {
        self.original_width
    }

    pub fn original_height(&self) -> usize {
        self.original_height
    }

    /// Linearly rescales the anchor grid so its minimum maps to 0 and its
    /// maximum to 1. Must run once after population, before any `at` queries
    /// used for blending. Idempotent.
    ///
    /// A grid with no range at all (max == min) would make the rescale
    /// undefined; it is filled with the constant 0.5 instead.
    pub fn normalize(&mut self) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in &self.data {
            min = min.min(value);
            max = max.max(value);
        }

        let range = max - min;
        if range <= f64::EPSILON {
            warn!("uniform sparse grid: normalizing to the constant {DEGENERATE_FIELD_VALUE}");
            self.data.fill(DEGENERATE_FIELD_VALUE);
            return;
        }

        for value in &mut self.data {
            *value = (*value - min) / range;
        }
    }

    /// Renders the field at full resolution as an 8-bit grayscale image,
    /// mapping a value `v` to the channel byte `round(v * 255)`. Used for
    /// the mask-only diagnostic output.
    pub fn to_grayscale_image(&self) -> GrayImage {
        let mut mask = GrayImage::new(self.original_width as u32, self.original_height as u32);
        mask.par_chunks_mut(self.original_width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                for (x, byte) in row.iter_mut().enumerate() {
                    *byte = (self.at(x, y) * 255.0).round() as Byte;
                }
            });
        mask
    }

    /// Bilinear reconstruction.
    ///
    /// The query point maps to continuous grid coordinates, then the four
    /// surrounding anchors form two intermediate values along x which are
    /// interpolated along y:
    ///
    ///   Q_ll ----- P_lo ----- Q_hl      (lo = floor row)
    ///    |           |          |
    ///    |---------- x ---------|
    ///    |           |          |
    ///   Q_lh ----- P_hi ----- Q_hh      (hi = ceil row)
    ///
    /// Indices clamp to the grid bounds, so edge cells repeat rather than
    /// extrapolate. When the two indices on an axis collapse - an exact grid
    /// line, or the clamp at the last row/column - the cell value is used
    /// directly on that axis instead of weighting, which would divide by
    /// zero.
    fn bilinear_at(&self, x: usize, y: usize) -> f64 {
        let rate = self.rate as f64;
        let grid_x = x as f64 / rate;
        let grid_y = y as f64 / rate;

        let x_lo = (grid_x.floor() as usize).min(self.grid_width - 1);
        let x_hi = (grid_x.ceil() as usize).min(self.grid_width - 1);
        let y_lo = (grid_y.floor() as usize).min(self.grid_height - 1);
        let y_hi = (grid_y.ceil() as usize).min(self.grid_height - 1);

        let q_hh = self.get(x_hi, y_hi);
        let q_hl = self.get(x_hi, y_lo);
        let q_lh = self.get(x_lo, y_hi);
        let q_ll = self.get(x_lo, y_lo);

        let (row_hi, row_lo) = if x_hi == x_lo {
            (q_hh, q_ll)
        } else {
            let weight_hi = grid_x - x_lo as f64;
            let weight_lo = x_hi as f64 - grid_x;
            (
                weight_hi * q_hh + weight_lo * q_lh,
                weight_hi * q_hl + weight_lo * q_ll,
            )
        };

        if y_hi == y_lo {
            return row_hi;
        }
        let weight_hi = grid_y - y_lo as f64;
        let weight_lo = y_hi as f64 - grid_y;
        weight_hi * row_hi + weight_lo * row_lo
    }

    /// Inverse-distance-weighted reconstruction over the two nearest anchors.
    /// An exact anchor hit returns the anchor value outright.
    fn inverse_distance_at(&self, x: usize, y: usize) -> f64 {
        let mut samples: Vec<(f64, f64)> = Vec::with_capacity(self.data.len());
        for cy in 0..self.grid_height {
            for cx in 0..self.grid_width {
                let distance = self.anchor_distance(x, y, cx, cy);
                let value = self.get(cx, cy);
                if distance == 0.0 {
                    return value;
                }
                samples.push((distance, value));
            }
        }

        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for &(distance, value) in samples.iter().take(IDW_NEIGHBORS) {
            let falloff = distance.powf(IDW_POWER);
            weighted_sum += value / falloff;
            weight_total += 1.0 / falloff;
        }
        weighted_sum / weight_total
    }

    /// Euclidean distance from the query pixel to an anchor, both measured
    /// in source-image pixels.
    fn anchor_distance(&self, x: usize, y: usize, cx: usize, cy: usize) -> f64 {
        let x_component = x as f64 - (cx * self.rate) as f64;
        let y_component = y as f64 - (cy * self.rate) as f64;
        (x_component * x_component + y_component * y_component).sqrt()
    }
}

impl ScalarField for InterpolatedField {
    fn at(&self, x: usize, y: usize) -> f64 {
        match self.strategy {
            InterpolationStrategy::Bilinear => self.bilinear_at(x, y),
            InterpolationStrategy::InverseDistance => self.inverse_distance_at(x, y),
        }
    }
}
