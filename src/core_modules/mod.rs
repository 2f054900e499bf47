pub mod blender;
pub mod luminance_map;
pub mod pixel;
pub mod scalar_field;
pub mod sharpness_sampler;
