//! Conversion and resampling primitives for baking image-based-lighting
//! environment maps: equirectangular↔cubemap projection with adaptive
//! supersampling, box-filtered mip reduction, cross-layout packing,
//! mirroring, and per-texel solid-angle weights.

#[macro_use]
extern crate hexf;
#[macro_use]
extern crate log;

// Re-export.
pub mod cubemap;
pub mod geometry;
pub mod image;
pub mod math;
pub mod ops;
pub mod sampling;
