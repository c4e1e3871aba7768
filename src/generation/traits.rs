use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{
    error::Result,
    generation::types::{AspectRatio, Critique},
};

/// A remote text-to-image service that produces cover candidates
#[async_trait]
pub trait CoverImageProvider: Send + Sync {
    /// Returns the name of this provider, used in logs
    fn name(&self) -> &str;

    /// Generate `count` candidate images for `prompt`
    ///
    /// # Returns
    ///
    /// Paths of the written image files, in generation order. Fails with
    /// [`GenerationError::ContentPolicyViolation`](crate::error::GenerationError::ContentPolicyViolation)
    /// when the service refuses the prompt.
    async fn generate(&self, prompt: &str, aspect_ratio: AspectRatio, count: u32) -> Result<Vec<PathBuf>>;

    /// Regenerate `image` following a touch-up instruction
    async fn refine(&self, image: &Path, instruction: &str) -> Result<PathBuf>;
}

/// A vision-language model that checks a candidate against its prompt
#[async_trait]
pub trait CritiqueProvider: Send + Sync {
    /// Returns the name of this provider, used in logs
    fn name(&self) -> &str;

    /// Judge whether `image` satisfies `prompt`
    ///
    /// This is best-effort: callers treat any error as "no critique".
    async fn evaluate(&self, image: &Path, prompt: &str) -> Result<Critique>;
}
