//! Geometry

#![allow(dead_code)]

mod vector2;
mod vector3;

// Re-export
pub use vector2::*;
pub use vector3::*;
