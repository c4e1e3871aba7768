use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Aspect ratios the generation services accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 9:16, the usual book cover shape
    #[default]
    Portrait,
    /// 16:9
    Landscape,
    /// 4:3
    Classic,
    /// 3:4
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Classic => "4:3",
            Self::ClassicPortrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| format!("unsupported aspect ratio '{}' (expected one of 1:1, 9:16, 16:9, 4:3, 3:4)", s))
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.as_str().to_string()
    }
}

/// Verdict of a critique pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Critique {
    /// The image shows everything the prompt asked for
    Approved,

    /// Instruction for an image-to-image touch-up
    TouchUp(String),
}

impl Critique {
    /// Interpret a model answer: exactly `True` approves, anything else is a
    /// touch-up prompt
    pub fn from_answer(answer: &str) -> Option<Self> {
        let answer = answer.trim();
        if answer.is_empty() {
            None
        } else if answer.trim_end_matches('.').eq_ignore_ascii_case("true") {
            Some(Self::Approved)
        } else {
            Some(Self::TouchUp(answer.to_string()))
        }
    }
}

/// A generated cover offered for selection
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,

    /// Result of the critique pass, `None` when it was skipped or failed
    pub critique: Option<Critique>,

    /// True when `path` is a touched-up regeneration
    pub touched_up: bool,
}

impl Candidate {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            critique: None,
            touched_up: false,
        }
    }
}
