// The CLI boundary around the `focal_blend` library: decode the input
// images, run the requested pipeline operation, encode the result as a JPEG.
// All numeric work lives in the library; this file only moves bytes.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

use focal_blend::pipeline::{BlendMode, BlendPipeline, PipelineConfig};

/// JPEG quality of the written output.
const OUTPUT_JPEG_QUALITY: u8 = 100;

#[derive(Parser, Debug)]
#[command(name = "focal_blend")]
#[command(about = "Blend two photographs by luminance or by sharpness-derived subject masks")]
struct Cli {
    /// One or more input images (PNG or JPEG), separated with a comma.
    #[arg(long, value_delimiter = ',', required = true)]
    images: Vec<PathBuf>,

    /// Combine two images by per-pixel luminance.
    #[arg(long, conflicts_with_all = ["combine_subject", "mask"])]
    combine: bool,

    /// Combine two images using 'importance' masks to estimate the subjects
    /// of the images.
    #[arg(long = "combine-subject", conflicts_with = "mask")]
    combine_subject: bool,

    /// Create a mask of the image's important areas.
    #[arg(long)]
    mask: bool,

    /// Where to write the output JPEG.
    #[arg(long, default_value = "outImg.jpeg")]
    output: PathBuf,
}

fn open_image(path: &PathBuf) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut images = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        images.push(open_image(path)?);
    }

    let pipeline = BlendPipeline::new(PipelineConfig::default());

    let output: DynamicImage = if cli.combine || cli.combine_subject {
        if images.len() != 2 {
            bail!("combine: {} images provided, need 2", images.len());
        }
        let mode = if cli.combine_subject {
            BlendMode::Mask
        } else {
            BlendMode::Luminance
        };
        let combined = pipeline.combine(&images[0], &images[1], mode)?;
        DynamicImage::ImageRgba8(combined)
    } else if cli.mask {
        if images.len() != 1 {
            bail!("mask: {} images provided, need 1", images.len());
        }
        DynamicImage::ImageLuma8(pipeline.sharpness_mask(&images[0])?)
    } else {
        bail!("please pick an action: --combine, --combine-subject or --mask");
    };

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), OUTPUT_JPEG_QUALITY);
    // JPEG carries no alpha channel; flatten RGBA output before encoding.
    output
        .to_rgb8()
        .write_with_encoder(encoder)
        .with_context(|| format!("encoding {}", cli.output.display()))?;

    Ok(())
}
