// THEORY:
// This file is the main entry point for the `focal_blend` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (like the CLI
// binary).
//
// The primary goal is to export the `BlendPipeline` and its associated data
// structures (`PipelineConfig`, `BlendMode`, `BlendError`) as the clean,
// high-level interface for the entire blending engine. The internal modules
// (`core_modules`) are encapsulated behind it, providing a clean separation
// of concerns.

pub mod core_modules;
pub mod error;
pub mod pipeline;
