//! # Composition Engine
//!
//! The compositor merges a base cover image, ordered text overlays and an
//! optional secondary image into one flattened output image.

pub mod engine;
pub mod types;

// Re-exports for convenience
pub use engine::Compositor;
pub use types::{
    Color, Composition, CompositionRequest, ImageOverlaySpec, Offset, Position, TextOverlaySpec,
};
