//! # Cover Generation
//!
//! Talks to the remote generative services: a text-to-image provider that
//! produces cover candidates and an optional vision-language critic that can
//! request a touch-up of each candidate.
//!
//! ## Providers
//!
//! - **Stability**: Stable Image SD3, text-to-image and image-to-image
//! - **Gemini**: `generateContent` with the candidate as inline image data
//!
//! Other services plug in by implementing [`CoverImageProvider`] or
//! [`CritiqueProvider`].

pub mod gemini;
pub mod pipeline;
pub mod prompt;
pub mod stability;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use gemini::GeminiCritic;
pub use pipeline::CoverGenerator;
pub use stability::StabilityProvider;
pub use traits::{CoverImageProvider, CritiqueProvider};
pub use types::{AspectRatio, Candidate, Critique};
