use thiserror::Error;

/// Failures the blending engine can report. All are fatal to the single
/// operation being performed; nothing is retried and no partial output is
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlendError {
    /// A derived sampling parameter is invalid: the image is too narrow for
    /// the configured downsample divisor, so the anchor spacing would be zero.
    #[error(
        "image width {width} is too small for downsample divisor {divisor}: derived sampling rate is zero"
    )]
    Configuration { width: usize, divisor: usize },

    /// The two images handed to the combiner do not share dimensions.
    #[error("image dimensions differ: {width1}x{height1} vs {width2}x{height2}")]
    DimensionMismatch {
        width1: u32,
        height1: u32,
        width2: u32,
        height2: u32,
    },
}
