//! Prompt construction.
//!
//! Prompts are a pure function of a [`GenerationRequest`] and a closed
//! [`PromptConfig`]: every theme, focus and difficulty has a dedicated field,
//! so there is no lookup that can miss and no map iteration order to leak
//! into the output. Identical requests always produce byte-identical prompts.

use crate::content::{Difficulty, GenerationRequest, LearningFocus, Theme, NAME_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One value per theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerTheme<T> {
    pub dragons: T,
    pub pirates: T,
    pub princesses: T,
}

impl<T> PerTheme<T> {
    pub fn get(&self, theme: Theme) -> &T {
        match theme {
            Theme::Dragons => &self.dragons,
            Theme::Pirates => &self.pirates,
            Theme::Princesses => &self.princesses,
        }
    }
}

/// One value per learning focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerFocus<T> {
    pub math: T,
    pub vocabulary: T,
    pub problem_solving: T,
}

impl<T> PerFocus<T> {
    pub fn get(&self, focus: LearningFocus) -> &T {
        match focus {
            LearningFocus::Math => &self.math,
            LearningFocus::Vocabulary => &self.vocabulary,
            LearningFocus::ProblemSolving => &self.problem_solving,
        }
    }
}

/// One value per difficulty level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerDifficulty<T> {
    pub easy: T,
    pub medium: T,
    pub hard: T,
}

impl<T> PerDifficulty<T> {
    pub fn get(&self, difficulty: Difficulty) -> &T {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

/// Narrative vocabulary for one theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeProfile {
    /// Where the adventure takes place.
    pub setting: String,
    /// Title given to the child hero ("Captain", "Princess", ...). May be empty.
    pub hero_title: String,
    /// Theme words, graded by difficulty.
    pub vocabulary: PerDifficulty<Vec<String>>,
}

/// Challenge pattern for one learning focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusProfile {
    /// What kind of challenge to weave into the story.
    pub challenge: String,
    /// An example question; may use the name placeholder.
    pub example: String,
    /// Numeric or linguistic complexity band per difficulty.
    pub bands: PerDifficulty<String>,
}

/// Everything the prompt builder needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Bump whenever the templates change so stale cache entries stop matching.
    pub template_version: u32,
    /// Audience description, e.g. "a child aged 5-9".
    pub audience: String,
    pub themes: PerTheme<ThemeProfile>,
    pub focus: PerFocus<FocusProfile>,
    /// Non-negotiable content rules included verbatim in every prompt.
    pub safety_constraints: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template_version: 1,
            audience: "a child aged 5-9".to_string(),
            themes: PerTheme {
                dragons: ThemeProfile {
                    setting: "a land of friendly dragons, glittering caves and golden treasure"
                        .to_string(),
                    hero_title: String::new(),
                    vocabulary: PerDifficulty {
                        easy: words(&["fire", "cave", "gold", "dragon"]),
                        medium: words(&["treasure", "castle", "guardian"]),
                        hard: words(&["majestic", "legendary", "magnificent"]),
                    },
                },
                pirates: ThemeProfile {
                    setting: "a sunny sea of tall ships, treasure maps and palm-tree islands"
                        .to_string(),
                    hero_title: "Captain".to_string(),
                    vocabulary: PerDifficulty {
                        easy: words(&["ship", "sea", "gold", "map"]),
                        medium: words(&["treasure", "island", "compass"]),
                        hard: words(&["expedition", "navigation", "cartographer"]),
                    },
                },
                princesses: ThemeProfile {
                    setting: "a kind kingdom of castles, gardens and magical forests".to_string(),
                    hero_title: "Princess".to_string(),
                    vocabulary: PerDifficulty {
                        easy: words(&["crown", "garden", "castle"]),
                        medium: words(&["kingdom", "wisdom", "friendship"]),
                        hard: words(&["diplomacy", "benevolent", "compassion"]),
                    },
                },
            },
            focus: PerFocus {
                math: FocusProfile {
                    challenge: "a counting or arithmetic problem that grows naturally out of the story"
                        .to_string(),
                    example: format!(
                        "The friendly dragon found 3 golden eggs and 2 silver eggs. How many eggs did {NAME_PLACEHOLDER} count in total?"
                    ),
                    bands: PerDifficulty {
                        easy: "Use numbers from 1 to 5 and a single addition.".to_string(),
                        medium: "Use numbers from 1 to 10 with addition or subtraction.".to_string(),
                        hard: "Use numbers from 5 to 20 in a multi-step problem; simple multiplication is allowed."
                            .to_string(),
                    },
                },
                vocabulary: FocusProfile {
                    challenge: "a word whose meaning the child explains, found inside the story"
                        .to_string(),
                    example: format!(
                        "The map had a special word written on it: 'COMPASS'. Can you tell {NAME_PLACEHOLDER} what this word means?"
                    ),
                    bands: PerDifficulty {
                        easy: "Use a simple, common word of 3 to 5 letters.".to_string(),
                        medium: "Use a moderately complex word of 5 to 8 letters that expands vocabulary."
                            .to_string(),
                        hard: "Use an advanced word of 8 to 12 letters that challenges vocabulary."
                            .to_string(),
                    },
                },
                problem_solving: FocusProfile {
                    challenge: "a small problem the child helps solve with a creative idea"
                        .to_string(),
                    example: format!(
                        "The baby dragon is on the other side of the river and the bridge is broken. How can {NAME_PLACEHOLDER} help it get across safely?"
                    ),
                    bands: PerDifficulty {
                        easy: "Make the problem need one step with an obvious, direct solution."
                            .to_string(),
                        medium: "Make the problem need two steps, with two possible solutions."
                            .to_string(),
                        hard: "Make the problem need three steps and a creative solution.".to_string(),
                    },
                },
            },
            safety_constraints: words(&[
                "No violence, fighting, weapons or injuries.",
                "Nothing scary: no monsters that threaten, no danger, no fear.",
                "Use growth-mindset framing: mistakes are part of learning and effort is praised.",
                "Show inclusive, kind characters from many backgrounds.",
                "Keep every sentence age-appropriate for early readers.",
            ]),
        }
    }
}

/// Builds generation prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    config: PromptConfig,
    total_parts: usize,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig, total_parts: usize) -> Self {
        Self {
            config,
            total_parts: total_parts.max(1),
        }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn total_parts(&self) -> usize {
        self.total_parts
    }

    /// Coarse identifier of the prompt templates in use.
    ///
    /// Two builders with the same fingerprint produce the same prompt for the
    /// same request, which is what makes cached content reusable.
    pub fn fingerprint(&self) -> String {
        format!("v{}/parts{}", self.config.template_version, self.total_parts)
    }

    /// Build the prompt for `request`.
    pub fn build(&self, request: &GenerationRequest) -> String {
        let theme = self.config.themes.get(request.theme);
        let focus = self.config.focus.get(request.learning_focus);
        let part_number = request.part_index + 1;

        let hero = if theme.hero_title.is_empty() {
            NAME_PLACEHOLDER.to_string()
        } else {
            format!("{} {}", theme.hero_title, NAME_PLACEHOLDER)
        };

        let mut prompt = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(
            prompt,
            "Write part {part_number} of {} of a short adventure story for {}.",
            self.total_parts, self.config.audience
        );
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Theme: {}. Setting: {}.", request.theme, theme.setting);
        let _ = writeln!(
            prompt,
            "Weave in theme words such as: {}.",
            theme.vocabulary.get(request.difficulty).join(", ")
        );
        let _ = writeln!(
            prompt,
            "The hero is {hero}. Always write the token {NAME_PLACEHOLDER} exactly as shown wherever the child's name belongs; never invent a name."
        );
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "{}", self.position_context(request.part_index));
        let _ = writeln!(prompt);
        let _ = writeln!(
            prompt,
            "Learning focus ({}): include exactly one {}.",
            request.learning_focus.label(),
            focus.challenge
        );
        let _ = writeln!(
            prompt,
            "Difficulty ({}): {}",
            request.difficulty,
            focus.bands.get(request.difficulty)
        );
        let _ = writeln!(prompt, "Example of the kind of question: {}", focus.example);
        if request.learning_focus == LearningFocus::Math {
            let _ = writeln!(prompt, "The correct_answer is the number alone, without units.");
        }
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Safety rules (all mandatory):");
        for rule in &self.config.safety_constraints {
            let _ = writeln!(prompt, "- {rule}");
        }
        let _ = writeln!(prompt);
        let _ = writeln!(
            prompt,
            "Keep the part to one or two short paragraphs and end it with one clear question for {NAME_PLACEHOLDER}."
        );
        let _ = writeln!(prompt, "Return ONLY valid JSON in exactly this format:");
        let _ = write!(
            prompt,
            "{{\"story_part\": \"...\", \"question\": \"...\", \"correct_answer\": \"...\", \"explanation\": \"why the answer is right, for a parent\"}}"
        );
        prompt
    }

    fn position_context(&self, part_index: usize) -> &'static str {
        if part_index == 0 {
            "This is the beginning of the adventure: set up the world and introduce the first challenge."
        } else if part_index + 1 >= self.total_parts {
            "This is the final part: bring the adventure to a happy, satisfying ending."
        } else {
            "This is the middle of the adventure: build on what happened so far and raise the excitement."
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptConfig::default(), 3)
    }
}
