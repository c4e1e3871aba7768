//! # Cover Session
//!
//! The describe → candidates → select → overlay workflow as an explicit state
//! machine. A presentation layer drives it through the transition methods and
//! displays [`CoverSession::current_image`]; it never tracks workflow flags
//! of its own.

use chrono::Local;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    composition::{Compositor, CompositionRequest},
    config::SessionConfig,
    error::{FontResolutionWarning, Result, SessionError},
    generation::{AspectRatio, Candidate, CoverGenerator},
};

/// Where the user is in the workflow
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for a book description
    AwaitingDescription,

    /// Candidates were generated and wait for a selection
    CandidatesReady {
        description: String,
        aspect_ratio: AspectRatio,
        candidates: Vec<Candidate>,
    },

    /// A base image was chosen and overlays can be applied
    OverlayReady {
        base: PathBuf,
        candidates: Vec<Candidate>,
    },

    /// Overlays were applied at least once
    Composed {
        base: PathBuf,
        output: PathBuf,
        warnings: Vec<FontResolutionWarning>,
        candidates: Vec<Candidate>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingDescription => "awaiting a description",
            Self::CandidatesReady { .. } => "choosing a candidate",
            Self::OverlayReady { .. } => "ready for overlays",
            Self::Composed { .. } => "composed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One user's pass through the cover workflow
pub struct CoverSession {
    id: String,
    state: SessionState,
    config: SessionConfig,
    compositions: u32,
}

impl CoverSession {
    pub fn new(config: SessionConfig) -> Self {
        let id = format!(
            "{}_{:06x}",
            Local::now().format("%Y%m%d%H%M%S"),
            rand::thread_rng().gen_range(0..0x100_0000u32)
        );
        debug!("Starting session {}", id);

        Self {
            id,
            state: SessionState::AwaitingDescription,
            config,
            compositions: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Candidates offered in the current state, if any
    pub fn candidates(&self) -> &[Candidate] {
        match &self.state {
            SessionState::AwaitingDescription => &[],
            SessionState::CandidatesReady { candidates, .. }
            | SessionState::OverlayReady { candidates, .. }
            | SessionState::Composed { candidates, .. } => candidates,
        }
    }

    /// The image a presentation layer should show right now
    pub fn current_image(&self) -> Option<&Path> {
        match &self.state {
            SessionState::AwaitingDescription => None,
            SessionState::CandidatesReady { candidates, .. } => candidates.first().map(|c| c.path.as_path()),
            SessionState::OverlayReady { base, .. } => Some(base),
            SessionState::Composed { output, .. } => Some(output),
        }
    }

    /// Generate candidates for `description`
    ///
    /// On failure the session stays in `AwaitingDescription` so the user can
    /// edit the description and retry.
    pub async fn generate(
        &mut self,
        generator: &CoverGenerator,
        description: &str,
        aspect_ratio: AspectRatio,
        count: u32,
    ) -> Result<&[Candidate]> {
        if !matches!(self.state, SessionState::AwaitingDescription) {
            return Err(self.invalid("generate covers"));
        }
        if description.trim().is_empty() {
            return Err(SessionError::EmptyDescription.into());
        }

        let candidates = generator.generate(description, aspect_ratio, count).await?;
        info!("Session {}: {} candidate(s) ready", self.id, candidates.len());

        self.state = SessionState::CandidatesReady {
            description: description.trim().to_string(),
            aspect_ratio,
            candidates,
        };
        Ok(self.candidates())
    }

    /// Discard the candidates and return to the description step
    pub fn regenerate(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::CandidatesReady { .. }) {
            return Err(self.invalid("regenerate"));
        }
        self.state = SessionState::AwaitingDescription;
        Ok(())
    }

    /// Choose candidate `index` (zero-based) as the cover base
    pub fn select(&mut self, index: usize) -> Result<&Path> {
        let available = match &self.state {
            SessionState::CandidatesReady { candidates, .. } => candidates.len(),
            _ => return Err(self.invalid("select a candidate")),
        };
        if index >= available {
            return Err(SessionError::NoSuchCandidate { index, available }.into());
        }

        if let SessionState::CandidatesReady { candidates, .. } = &mut self.state {
            let candidates = std::mem::take(candidates);
            let base = candidates[index].path.clone();
            info!("Session {}: selected {:?}", self.id, base);
            self.state = SessionState::OverlayReady { base, candidates };
        }
        self.base().ok_or_else(|| self.invalid("select a candidate"))
    }

    /// Apply `request` to the selected base
    ///
    /// Each call starts again from the selected candidate, never from a
    /// previous output, and writes to a fresh file in the session's work
    /// directory.
    pub fn compose(&mut self, compositor: &Compositor, request: &CompositionRequest) -> Result<&Path> {
        let Some(base) = self.base().map(Path::to_path_buf) else {
            return Err(self.invalid("apply overlays"));
        };
        if request.is_empty() {
            return Err(SessionError::NothingToApply.into());
        }

        std::fs::create_dir_all(&self.config.work_dir)?;
        let output_path = self.config.work_dir.join(format!(
            "cover_{}_{}.{}",
            self.id,
            self.compositions + 1,
            self.config.output_format
        ));

        let composition = compositor.compose(&base, request, &output_path)?;
        self.compositions += 1;

        let candidates = match &mut self.state {
            SessionState::OverlayReady { candidates, .. } | SessionState::Composed { candidates, .. } => {
                std::mem::take(candidates)
            }
            _ => Vec::new(),
        };
        self.state = SessionState::Composed {
            base,
            output: composition.output_path,
            warnings: composition.warnings,
            candidates,
        };

        self.current_image().ok_or_else(|| self.invalid("apply overlays"))
    }

    /// Font warnings from the latest composition
    pub fn warnings(&self) -> &[FontResolutionWarning] {
        match &self.state {
            SessionState::Composed { warnings, .. } => warnings,
            _ => &[],
        }
    }

    /// Start over from the description step
    pub fn reset(&mut self) {
        debug!("Session {}: reset from {}", self.id, self.state);
        self.state = SessionState::AwaitingDescription;
    }

    fn base(&self) -> Option<&Path> {
        match &self.state {
            SessionState::OverlayReady { base, .. } | SessionState::Composed { base, .. } => Some(base),
            _ => None,
        }
    }

    fn invalid(&self, action: &str) -> crate::error::CompositorError {
        SessionError::InvalidTransition {
            from: self.state.name().to_string(),
            action: action.to_string(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Color, TextOverlaySpec};
    use crate::config::CompositorConfig;
    use crate::error::{CompositorError, GenerationError};
    use crate::generation::pipeline::tests::FakeProvider;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn session(dir: &TempDir) -> CoverSession {
        CoverSession::new(SessionConfig {
            work_dir: dir.path().join("out"),
            output_format: "png".to_string(),
        })
    }

    fn compositor(dir: &TempDir) -> Compositor {
        Compositor::new(CompositorConfig {
            fonts_dir: dir.path().join("fonts"),
            system_fonts: false,
            ..CompositorConfig::default()
        })
    }

    /// A session sitting in `OverlayReady` on a real 32x32 base image
    fn ready_session(dir: &TempDir) -> CoverSession {
        let base = dir.path().join("cover_1.png");
        RgbaImage::from_pixel(32, 32, Rgba([20, 40, 60, 255])).save(&base).unwrap();

        let mut session = session(dir);
        session.state = SessionState::CandidatesReady {
            description: "A fox".to_string(),
            aspect_ratio: AspectRatio::Square,
            candidates: vec![Candidate::new(&base), Candidate::new(dir.path().join("cover_2.png"))],
        };
        session.select(0).unwrap();
        session
    }

    fn title() -> CompositionRequest {
        CompositionRequest::new().text(TextOverlaySpec::new("Hi").with_size(8).at(2, 2).with_color(Color::WHITE))
    }

    #[tokio::test]
    async fn test_generate_moves_to_candidates() {
        let dir = tempdir().unwrap();
        let generator = CoverGenerator::new(Arc::new(FakeProvider::default()));
        let mut session = session(&dir);

        let candidates = session.generate(&generator, "A fox", AspectRatio::Portrait, 2).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(matches!(session.state(), SessionState::CandidatesReady { .. }));
        assert_eq!(session.current_image(), Some(Path::new("cover_1.png")));
    }

    #[tokio::test]
    async fn test_empty_description_is_rejected() {
        let dir = tempdir().unwrap();
        let generator = CoverGenerator::new(Arc::new(FakeProvider::default()));
        let mut session = session(&dir);

        let err = session.generate(&generator, "   ", AspectRatio::Portrait, 2).await.unwrap_err();
        assert!(matches!(err, CompositorError::Session(SessionError::EmptyDescription)));
        assert_eq!(session.state(), &SessionState::AwaitingDescription);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_state() {
        let dir = tempdir().unwrap();
        let provider = FakeProvider { refuse: true, ..FakeProvider::default() };
        let generator = CoverGenerator::new(Arc::new(provider));
        let mut session = session(&dir);

        let err = session.generate(&generator, "A fox", AspectRatio::Portrait, 1).await.unwrap_err();
        assert!(matches!(
            err,
            CompositorError::Generation(GenerationError::ContentPolicyViolation { .. })
        ));
        assert_eq!(session.state(), &SessionState::AwaitingDescription);
        assert_eq!(session.current_image(), None);
    }

    #[tokio::test]
    async fn test_regenerate_and_select() {
        let dir = tempdir().unwrap();
        let generator = CoverGenerator::new(Arc::new(FakeProvider::default()));
        let mut session = session(&dir);

        session.generate(&generator, "A fox", AspectRatio::Portrait, 2).await.unwrap();
        session.regenerate().unwrap();
        assert_eq!(session.state(), &SessionState::AwaitingDescription);

        session.generate(&generator, "A wolf", AspectRatio::Portrait, 2).await.unwrap();
        let err = session.select(5).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::Session(SessionError::NoSuchCandidate { index: 5, available: 2 })
        ));

        let base = session.select(1).unwrap().to_path_buf();
        assert_eq!(base, PathBuf::from("cover_2.png"));
        assert_eq!(session.candidates().len(), 2);
    }

    #[test]
    fn test_invalid_transitions() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);

        let err = session.select(0).unwrap_err();
        assert!(matches!(err, CompositorError::Session(SessionError::InvalidTransition { .. })));
        assert!(session.regenerate().is_err());
        assert!(session.compose(&compositor(&dir), &title()).is_err());

        let mut ready = ready_session(&dir);
        assert!(ready.regenerate().is_err());
        assert!(ready.select(1).is_err());
        let err = ready.invalid("generate covers");
        assert_eq!(err.to_string(), "Session error: Cannot generate covers while ready for overlays");
    }

    #[test]
    fn test_compose_requires_content() {
        let dir = tempdir().unwrap();
        let mut session = ready_session(&dir);

        let blank = CompositionRequest::new().text(TextOverlaySpec::new("  "));
        let err = session.compose(&compositor(&dir), &blank).unwrap_err();
        assert!(matches!(err, CompositorError::Session(SessionError::NothingToApply)));
        assert!(matches!(session.state(), SessionState::OverlayReady { .. }));
    }

    #[test]
    fn test_recompose_starts_from_base() {
        let dir = tempdir().unwrap();
        let compositor = compositor(&dir);
        let mut session = ready_session(&dir);
        let base = session.current_image().unwrap().to_path_buf();

        let first = session.compose(&compositor, &title()).unwrap().to_path_buf();
        let second = session.compose(&compositor, &title()).unwrap().to_path_buf();

        assert_ne!(first, second);
        assert!(first.starts_with(dir.path().join("out")));
        assert_eq!(
            image::open(&first).unwrap().to_rgb8(),
            image::open(&second).unwrap().to_rgb8()
        );
        match session.state() {
            SessionState::Composed { base: composed_base, output, .. } => {
                assert_eq!(composed_base, &base);
                assert_eq!(output, &second);
            }
            other => panic!("unexpected state: {other}"),
        }
        assert!(session.warnings().is_empty());

        session.reset();
        assert_eq!(session.state(), &SessionState::AwaitingDescription);
        assert!(session.candidates().is_empty());
    }
}
