//! # Cover-Compositor
//!
//! Generate AI book cover art and finish it with titles, author lines and
//! logos.
//!
//! This library provides the compositing core (text and image overlays
//! flattened onto a base image), the clients for the remote generation and
//! critique services, and a session state machine that ties them together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cover_compositor::{
//!     composition::{Color, CompositionRequest, Compositor, TextOverlaySpec},
//!     config::Config,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let compositor = Compositor::new(config.compositor);
//!
//! let request = CompositionRequest::new()
//!     .text(TextOverlaySpec::new("The Last Lighthouse").with_size(64).at(60, 80))
//!     .text(
//!         TextOverlaySpec::new("A Novel")
//!             .with_color(Color::rgb(240, 200, 90))
//!             .with_shadow(Color::BLACK, 3, 3)
//!             .at(60, 180),
//!     );
//!
//! let result = compositor.compose("cover.png", &request, "final.jpg")?;
//! for warning in &result.warnings {
//!     eprintln!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`composition`] - Overlay types and the compositing engine
//! - [`text`] - Font resolution and glyph rasterization
//! - [`generation`] - Cover image and critique providers
//! - [`session`] - The describe → select → overlay workflow
//! - [`config`] - Configuration management
//!
//! ## Custom Providers
//!
//! Any text-to-image service can back the generation step by implementing
//! [`CoverImageProvider`](generation::CoverImageProvider):
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use cover_compositor::generation::{AspectRatio, CoverImageProvider};
//! use cover_compositor::Result;
//! use std::path::{Path, PathBuf};
//!
//! struct LocalDiffusion;
//!
//! #[async_trait]
//! impl CoverImageProvider for LocalDiffusion {
//!     fn name(&self) -> &str {
//!         "local"
//!     }
//!
//!     async fn generate(&self, prompt: &str, aspect_ratio: AspectRatio, count: u32) -> Result<Vec<PathBuf>> {
//!         // Call your model here
//!         Ok(Vec::new())
//!     }
//!
//!     async fn refine(&self, image: &Path, instruction: &str) -> Result<PathBuf> {
//!         Ok(image.to_path_buf())
//!     }
//! }
//! ```

pub mod composition;
pub mod config;
pub mod error;
pub mod generation;
pub mod session;
pub mod text;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionRequest, Compositor},
    config::Config,
    error::{CompositorError, FontResolutionWarning, Result},
    generation::{CoverGenerator, CoverImageProvider, CritiqueProvider},
    session::{CoverSession, SessionState},
};
