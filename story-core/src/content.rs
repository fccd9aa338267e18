//! Core content types: what is requested and what comes back.
//!
//! A [`GenerationRequest`] deliberately has no field for the child's name.
//! Generated templates refer to the child through [`NAME_PLACEHOLDER`] and are
//! only personalized after they leave the cache.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token standing in for the child's name inside cacheable templates.
pub const NAME_PLACEHOLDER: &str = "{{child_name}}";

/// Narrative setting of an adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Dragons,
    Pirates,
    Princesses,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Dragons, Theme::Pirates, Theme::Princesses];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dragons => "dragons",
            Theme::Pirates => "pirates",
            Theme::Princesses => "princesses",
        }
    }
}

/// Educational skill exercised by the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningFocus {
    Math,
    Vocabulary,
    ProblemSolving,
}

impl LearningFocus {
    pub const ALL: [LearningFocus; 3] = [
        LearningFocus::Math,
        LearningFocus::Vocabulary,
        LearningFocus::ProblemSolving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningFocus::Math => "math",
            LearningFocus::Vocabulary => "vocabulary",
            LearningFocus::ProblemSolving => "problem_solving",
        }
    }

    /// Human-readable label used in prompts and parent explanations.
    pub fn label(&self) -> &'static str {
        match self {
            LearningFocus::Math => "math",
            LearningFocus::Vocabulary => "vocabulary",
            LearningFocus::ProblemSolving => "problem solving",
        }
    }
}

/// Difficulty level, linearly ordered from easy to hard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// One level up, or `None` at `Hard`.
    pub fn harder(self) -> Option<Difficulty> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }

    /// One level down, or `None` at `Easy`.
    pub fn easier(self) -> Option<Difficulty> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(Difficulty::Easy),
            Difficulty::Hard => Some(Difficulty::Medium),
        }
    }

    /// Number of steps between two levels.
    pub fn distance(self, other: Difficulty) -> usize {
        (self as isize - other as isize).unsigned_abs()
    }
}

macro_rules! impl_text_enum {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| ConfigError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

impl_text_enum!(Theme, "theme");
impl_text_enum!(LearningFocus, "learning focus");
impl_text_enum!(Difficulty, "difficulty");

/// Everything needed to ask for one story part, minus anything personal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub theme: Theme,
    pub learning_focus: LearningFocus,
    pub difficulty: Difficulty,
    pub part_index: usize,
}

impl GenerationRequest {
    pub fn new(
        theme: Theme,
        learning_focus: LearningFocus,
        difficulty: Difficulty,
        part_index: usize,
    ) -> Self {
        Self {
            theme,
            learning_focus,
            difficulty,
            part_index,
        }
    }
}

/// One generated story part with its question and answer key.
///
/// Straight from the generator (and in the cache) the texts contain
/// [`NAME_PLACEHOLDER`]; the copy held by a session is personalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub story_text: String,
    pub question: String,
    pub correct_answer: String,
    /// Shown to parents to explain the answer and the learning goal.
    pub explanation: String,
}

impl GeneratedContent {
    pub fn new(
        story_text: impl Into<String>,
        question: impl Into<String>,
        correct_answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            story_text: story_text.into(),
            question: question.into(),
            correct_answer: correct_answer.into(),
            explanation: explanation.into(),
        }
    }

    /// Return a copy with every placeholder replaced by `child_name`.
    pub fn personalize(&self, child_name: &str) -> GeneratedContent {
        let fill = |s: &str| s.replace(NAME_PLACEHOLDER, child_name);
        GeneratedContent {
            story_text: fill(&self.story_text),
            question: fill(&self.question),
            correct_answer: fill(&self.correct_answer),
            explanation: fill(&self.explanation),
        }
    }

    /// Whether any field still carries the name placeholder.
    pub fn has_placeholder(&self) -> bool {
        [
            &self.story_text,
            &self.question,
            &self.correct_answer,
            &self.explanation,
        ]
        .iter()
        .any(|s| s.contains(NAME_PLACEHOLDER))
    }

    /// Whether `needle` appears in any field.
    pub fn mentions(&self, needle: &str) -> bool {
        [
            &self.story_text,
            &self.question,
            &self.correct_answer,
            &self.explanation,
        ]
        .iter()
        .any(|s| s.contains(needle))
    }

    /// Parse the generator's raw output.
    ///
    /// Accepts a bare JSON object or the outermost `{...}` block inside
    /// surrounding prose.
    pub fn parse(raw: &str) -> Result<GeneratedContent, ParseError> {
        let trimmed = raw.trim();
        let wire: WireContent = match serde_json::from_str(trimmed) {
            Ok(wire) => wire,
            Err(first) => {
                let (start, end) = match (trimmed.find('{'), trimmed.rfind('}')) {
                    (Some(start), Some(end)) if start < end => (start, end),
                    _ => return Err(ParseError::NoJson),
                };
                serde_json::from_str(&trimmed[start..=end]).map_err(|_| ParseError::Json(first))?
            }
        };
        wire.try_into()
    }
}

/// Why raw generator output could not be turned into [`GeneratedContent`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in output")]
    NoJson,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("correct_answer must be a string or a number")]
    UnsupportedAnswer,
}

#[derive(Deserialize)]
struct WireContent {
    #[serde(alias = "story_text", alias = "story")]
    story_part: String,
    question: String,
    correct_answer: serde_json::Value,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<WireContent> for GeneratedContent {
    type Error = ParseError;

    fn try_from(wire: WireContent) -> Result<Self, Self::Error> {
        let correct_answer = match wire.correct_answer {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => return Err(ParseError::UnsupportedAnswer),
        };

        if wire.story_part.trim().is_empty() {
            return Err(ParseError::MissingField("story_part"));
        }
        if wire.question.trim().is_empty() {
            return Err(ParseError::MissingField("question"));
        }
        if correct_answer.trim().is_empty() {
            return Err(ParseError::MissingField("correct_answer"));
        }

        Ok(GeneratedContent {
            story_text: wire.story_part.trim().to_string(),
            question: wire.question.trim().to_string(),
            correct_answer: correct_answer.trim().to_string(),
            explanation: wire.explanation.trim().to_string(),
        })
    }
}
