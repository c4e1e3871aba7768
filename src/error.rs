use thiserror::Error;

/// Main error type for the Cover-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Image generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Critique error: {0}")]
    Critique(#[from] CritiqueError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compositor errors. All of them abort the current composition.
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Failed to read base image {path}: {reason}")]
    BaseImageUnreadable { path: String, reason: String },

    #[error("Failed to decode overlay image {path}: {reason}")]
    OverlayImage { path: String, reason: String },

    #[error("Failed to write output image {path}: {reason}")]
    OutputFailed { path: String, reason: String },

    #[error("Unsupported output format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Invalid overlay #{index}: {details}")]
    InvalidOverlay { index: usize, details: String },

    #[error("Invalid composition request {path}: {reason}")]
    InvalidRequest { path: String, reason: String },
}

impl CompositionError {
    /// True for failures reading or writing files (the `IOError` class)
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::BaseImageUnreadable { .. } | Self::OutputFailed { .. }
        )
    }
}

/// A requested font could not be resolved and a default face was used instead.
///
/// This is never returned as an error; it is collected into the
/// [`Composition`](crate::composition::Composition) result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Font '{font}' for overlay #{spec_index} unavailable ({reason}), using default font")]
pub struct FontResolutionWarning {
    pub spec_index: usize,
    pub font: String,
    pub reason: String,
}

/// Errors raised by cover image providers
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation blocked by content policy: {reason}")]
    ContentPolicyViolation { reason: String },

    #[error("Generation request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Generation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing API credentials: environment variable {key} is not set")]
    MissingCredentials { key: String },

    #[error("Invalid response from generation service: {reason}")]
    InvalidResponse { reason: String },
}

/// Errors raised by critique providers. Callers treat these as "no critique".
#[derive(Error, Debug)]
pub enum CritiqueError {
    #[error("Critique request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Critique service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Critique service returned no text")]
    EmptyResponse,

    #[error("Missing API credentials: environment variable {key} is not set")]
    MissingCredentials { key: String },
}

/// Workflow state machine errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Please enter a book description to generate a cover")]
    EmptyDescription,

    #[error("Candidate {index} does not exist ({available} available)")]
    NoSuchCandidate { index: usize, available: usize },

    #[error("Please provide either text or an image to overlay")]
    NothingToApply,
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Generation(GenerationError::RequestFailed { .. }) => true,
            Self::Generation(GenerationError::Api { status, .. }) => *status >= 500,
            Self::Critique(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Generation(GenerationError::ContentPolicyViolation { .. }) => {
                "The prompt violates the content policy. Please modify your description and try again.".to_string()
            }
            Self::Generation(GenerationError::MissingCredentials { key }) => {
                format!("Image generation is not configured. Please set the {} environment variable.", key)
            }
            Self::Generation(_) => {
                "An error occurred while generating the image. Please try again.".to_string()
            }
            Self::Composition(CompositionError::BaseImageUnreadable { path, .. }) => {
                format!("Could not read cover image '{}'. Please generate a new image.", path)
            }
            Self::Composition(CompositionError::OverlayImage { path, .. }) => {
                format!("Could not decode overlay image '{}'. Please upload a PNG or JPEG file.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
