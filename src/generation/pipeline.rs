use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    generation::{
        prompt,
        traits::{CoverImageProvider, CritiqueProvider},
        types::{AspectRatio, Candidate, Critique},
    },
};

/// Generates cover candidates and runs the optional critique pass
///
/// The pipeline is sequential:
/// 1. Prompt - Wrap the book description in the cover art instructions
/// 2. Generation - Ask the provider for `count` candidates
/// 3. Critique - Check each candidate against the prompt (best-effort)
/// 4. Touch-up - Regenerate candidates the critic asked to change
pub struct CoverGenerator {
    provider: Arc<dyn CoverImageProvider>,
    critic: Option<Arc<dyn CritiqueProvider>>,
}

impl CoverGenerator {
    pub fn new(provider: Arc<dyn CoverImageProvider>) -> Self {
        Self { provider, critic: None }
    }

    /// Enable the critique pass
    pub fn with_critic(mut self, critic: Arc<dyn CritiqueProvider>) -> Self {
        self.critic = Some(critic);
        self
    }

    pub async fn generate(
        &self,
        description: &str,
        aspect_ratio: AspectRatio,
        count: u32,
    ) -> Result<Vec<Candidate>> {
        info!("🖼️  Generating {} candidate(s) with {} ({})", count, self.provider.name(), aspect_ratio);

        let image_prompt = prompt::cover_prompt(description);
        let paths = self.provider.generate(&image_prompt, aspect_ratio, count).await?;

        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            let candidate = match &self.critic {
                Some(critic) => self.critique(critic.as_ref(), Candidate::new(path), &image_prompt).await?,
                None => Candidate::new(path),
            };
            candidates.push(candidate);
        }

        info!("   ✅ {} candidate(s) ready ({} touched up)",
              candidates.len(), candidates.iter().filter(|c| c.touched_up).count());
        Ok(candidates)
    }

    async fn critique(
        &self,
        critic: &dyn CritiqueProvider,
        mut candidate: Candidate,
        image_prompt: &str,
    ) -> Result<Candidate> {
        let verdict = match critic.evaluate(&candidate.path, image_prompt).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Critique by {} unavailable for {:?}: {}", critic.name(), candidate.path, e);
                return Ok(candidate);
            }
        };

        if let Critique::TouchUp(instruction) = &verdict {
            debug!("Touching up {:?}: {}", candidate.path, instruction);
            candidate.path = self.provider.refine(&candidate.path, instruction).await?;
            candidate.touched_up = true;
        }
        candidate.critique = Some(verdict);
        Ok(candidate)
    }
}
